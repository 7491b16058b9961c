use serde::{Deserialize, Serialize};

use crate::neuron::Neuron;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    pub neuron_states: Vec<NeuronState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronState {
    pub voltage: f64,
    pub recovery: f64,
    pub spike_count_in_bin: u32,
}

/// Deep copy of the network state taken once after construction. Every trial starts
/// from `restore`, so no state leaks from one trial into the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    network_state: NetworkState,
}

impl NetworkState {
    pub fn from_neurons(neurons: &[Neuron]) -> Self {
        Self {
            neuron_states: neurons.iter().map(Neuron::get_state).collect(),
        }
    }

    pub fn nb_neurons(&self) -> usize {
        self.neuron_states.len()
    }
}

impl Checkpoint {
    pub fn take(neurons: &[Neuron]) -> Self {
        Self {
            network_state: NetworkState::from_neurons(neurons),
        }
    }

    /// Rebuilds the neurons with their spike counters zeroed.
    pub fn restore(&self) -> Vec<Neuron> {
        self.network_state
            .neuron_states
            .iter()
            .map(|neuron_state| {
                let mut neuron = Neuron::from_state(neuron_state);
                neuron.take_spike_count();
                neuron
            })
            .collect()
    }

    pub fn network_state(&self) -> &NetworkState {
        &self.network_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::NeuronPreset;

    #[test]
    fn restore_keeps_dynamics_and_zeroes_counts() {
        let neuron_params = NeuronPreset::IntrinsicallyBursting.neuron_params();
        let mut neurons: Vec<Neuron> = (0..3).map(|_| Neuron::new(&neuron_params)).collect();
        neurons[1].integrate(123.4, 0.7, &neuron_params);
        neurons[2].apply_psp(1000.0);
        neurons[2].reset(&neuron_params);

        let checkpoint = Checkpoint::take(&neurons);
        assert_eq!(checkpoint.network_state().neuron_states[2].spike_count_in_bin, 1);

        for neuron in neurons.iter_mut() {
            neuron.integrate(50.0, -1.3, &neuron_params);
        }

        let restored = checkpoint.restore();
        for (neuron, neuron_state) in restored
            .iter()
            .zip(checkpoint.network_state().neuron_states.iter())
        {
            assert_eq!(neuron.get_voltage(), neuron_state.voltage);
            assert_eq!(neuron.get_recovery(), neuron_state.recovery);
            assert_eq!(neuron.get_spike_count(), 0);
        }

        assert_ne!(NetworkState::from_neurons(&neurons), *checkpoint.network_state());
        assert_eq!(checkpoint.restore(), restored);
    }

    #[test]
    fn serde_round_trip_keeps_values() {
        let neuron_params = NeuronPreset::RegularSpiking.neuron_params();
        let neurons = vec![Neuron::new(&neuron_params); 2];
        let network_state = NetworkState::from_neurons(&neurons);

        let json = serde_json::to_string(&network_state).unwrap();
        let parsed: NetworkState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, network_state);
        assert_eq!(parsed.nb_neurons(), 2);
        assert_eq!(parsed.neuron_states[0].voltage, -60.0);
        assert_eq!(parsed.neuron_states[0].recovery, 120.0);
    }
}
