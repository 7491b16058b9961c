use crate::{params::NeuronParams, state_snapshot::NeuronState};

#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    voltage: f64,
    recovery: f64,
    spike_count_in_bin: u32,
}

impl Neuron {
    pub fn new(neuron_params: &NeuronParams) -> Self {
        Self {
            voltage: neuron_params.initial_voltage,
            recovery: neuron_params.initial_recovery,
            spike_count_in_bin: 0,
        }
    }

    pub fn from_state(state: &NeuronState) -> Self {
        Self {
            voltage: state.voltage,
            recovery: state.recovery,
            spike_count_in_bin: state.spike_count_in_bin,
        }
    }

    pub fn get_state(&self) -> NeuronState {
        NeuronState {
            voltage: self.voltage,
            recovery: self.recovery,
            spike_count_in_bin: self.spike_count_in_bin,
        }
    }

    pub fn get_voltage(&self) -> f64 {
        self.voltage
    }

    pub fn get_recovery(&self) -> f64 {
        self.recovery
    }

    pub fn get_spike_count(&self) -> u32 {
        self.spike_count_in_bin
    }

    pub fn apply_psp(&mut self, psp: f64) {
        self.voltage += psp;
    }

    /// One explicit Euler-Maruyama step of unit length. `noise` is a standard normal
    /// sample; both variables are advanced from the pre-step voltage.
    pub fn integrate(&mut self, current: f64, noise: f64, neuron_params: &NeuronParams) {
        let p = neuron_params;
        let v = self.voltage;
        let u = self.recovery;

        let dv =
            (p.k * (v - p.v_rest) * (v - p.v_threshold) - u + current) / (p.capacitance * p.tau);
        let du = p.a * (p.b * (v - p.v_rest) - u) / p.tau;

        self.voltage = v + dv + p.noise_amplitude * (1.0 / p.tau).sqrt() * noise;
        self.recovery = u + du;
    }

    pub fn is_above_threshold(&self, neuron_params: &NeuronParams) -> bool {
        self.voltage > neuron_params.v_peak
    }

    /// Counts the spike and overwrites the voltage, discarding any input received since
    /// the threshold check.
    pub fn reset(&mut self, neuron_params: &NeuronParams) {
        self.voltage = neuron_params.c;
        self.recovery += neuron_params.d;
        self.spike_count_in_bin += 1;
    }

    /// Returns the count accumulated since the last flush and zeroes it.
    pub fn take_spike_count(&mut self) -> u32 {
        std::mem::take(&mut self.spike_count_in_bin)
    }
}
