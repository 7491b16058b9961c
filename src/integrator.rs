use log::debug;
use rand::{prelude::Distribution, rngs::StdRng};
use simple_error::{try_with, SimpleResult};
use statrs::distribution::Normal;

use crate::{
    neuron::Neuron, params::NeuronParams, stimulus::StimVariant, synapse::SynapseTable,
};

/// Receives the output of one trial while it is being integrated.
pub trait SpikeRecorder {
    fn on_spike(&mut self, _nid: usize, _t: usize) {}

    fn on_bin_flush(&mut self, _bin_idx: usize, _observation: Vec<u32>) {}
}

/// Collects one observation vector per bin, in bin order.
#[derive(Debug, Default)]
pub struct BinRecorder {
    observations: Vec<Vec<u32>>,
}

/// Collects every spike as `(nid, t)`.
#[derive(Debug, Default)]
pub struct RasterRecorder {
    events: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct IntegratorParams {
    pub duration: usize,
    pub bin_size: usize,
    pub stimulus_max: u32,
    pub stim_on: bool,
    pub bin_aggregation: bool,
}

pub struct Integrator<'a> {
    params: IntegratorParams,
    neuron_params: &'a NeuronParams,
    synapses: &'a SynapseTable,
    variant: StimVariant,
}

impl BinRecorder {
    pub fn into_observations(self) -> Vec<Vec<u32>> {
        self.observations
    }
}

impl SpikeRecorder for BinRecorder {
    fn on_bin_flush(&mut self, bin_idx: usize, observation: Vec<u32>) {
        debug_assert_eq!(bin_idx, self.observations.len());
        self.observations.push(observation);
    }
}

impl RasterRecorder {
    pub fn into_events(self) -> Vec<(usize, usize)> {
        self.events
    }
}

impl SpikeRecorder for RasterRecorder {
    fn on_spike(&mut self, nid: usize, t: usize) {
        self.events.push((nid, t));
    }
}

impl<'a> Integrator<'a> {
    pub fn new(
        params: IntegratorParams,
        neuron_params: &'a NeuronParams,
        synapses: &'a SynapseTable,
        variant: StimVariant,
    ) -> Self {
        Self {
            params,
            neuron_params,
            synapses,
            variant,
        }
    }

    fn stimulus_level(&self, t: usize) -> u32 {
        if self.params.stim_on {
            self.variant
                .level(t, self.params.duration, self.params.stimulus_max)
        } else {
            0
        }
    }

    /// Runs ticks `0..=duration` on `neurons`. Spikes detected on tick `t` are delivered
    /// before the resets of the same tick, so a neuron that spiked itself loses that input
    /// while every other target carries it into tick `t + 1`.
    pub fn run<R: SpikeRecorder>(
        &self,
        neurons: &mut [Neuron],
        rng: &mut StdRng,
        recorder: &mut R,
    ) -> SimpleResult<()> {
        let normal = try_with!(Normal::new(0.0, 1.0), "failed to create noise distribution");
        let draw_noise = self.neuron_params.noise_amplitude > 0.0;
        let mut spiked_nids = Vec::new();

        for t in 0..=self.params.duration {
            let current = self.stimulus_level(t) as f64;

            for (nid, neuron) in neurons.iter_mut().enumerate() {
                let noise = if draw_noise { normal.sample(rng) } else { 0.0 };
                let input = if nid == 0 { current } else { 0.0 };
                neuron.integrate(input, noise, self.neuron_params);
            }

            for (nid, neuron) in neurons.iter().enumerate() {
                if neuron.is_above_threshold(self.neuron_params) {
                    spiked_nids.push(nid);
                    recorder.on_spike(nid, t);
                }
            }

            self.synapses.transmit(&spiked_nids, neurons);

            for &nid in spiked_nids.iter() {
                neurons[nid].reset(self.neuron_params);
            }
            spiked_nids.clear();

            if self.params.bin_aggregation && t > 0 && t % self.params.bin_size == 0 {
                let bin_idx = t / self.params.bin_size - 1;
                let observation = self.flush(t, neurons);
                debug!("bin {} flushed: {:?}", bin_idx, observation);
                recorder.on_bin_flush(bin_idx, observation);
            }
        }

        Ok(())
    }

    fn flush(&self, t: usize, neurons: &mut [Neuron]) -> Vec<u32> {
        let mut observation = Vec::with_capacity(neurons.len() + 1);

        if self.params.stim_on {
            observation.push(self.stimulus_level(t - 1));
        }

        observation.extend(neurons.iter_mut().map(Neuron::take_spike_count));
        observation
    }
}
