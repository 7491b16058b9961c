use std::sync::mpsc::channel as mpsc_channel;
use std::sync::Arc;
use std::thread;

use core_affinity::CoreId;
use itertools::Itertools;
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use simple_error::{try_with, SimpleError, SimpleResult};

use crate::{
    connectivity::Connections,
    integrator::{BinRecorder, Integrator, IntegratorParams, RasterRecorder, SpikeRecorder},
    neuron::Neuron,
    observation::{ObservationKey, ObservationTensor, SpikeRaster},
    params::{self, NeuronParams, SimulationParams},
    state_snapshot::{Checkpoint, NetworkState},
    stimulus::StimVariant,
    synapse::SynapseTable,
    util,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Running,
    BinFlush,
    TrialComplete,
    SweepComplete,
}

pub struct Simulation {
    params: SimulationParams,
    neuron_params: Arc<NeuronParams>,
    synapses: Arc<SynapseTable>,
    checkpoint: Option<Arc<Checkpoint>>,
    phase: Phase,
    num_threads: usize,
    base_seed: u64,
}

/// Everything a worker needs to run trials, shared read-only between threads.
#[derive(Clone)]
struct TrialContext {
    integrator_params: IntegratorParams,
    neuron_params: Arc<NeuronParams>,
    synapses: Arc<SynapseTable>,
    checkpoint: Arc<Checkpoint>,
    base_seed: u64,
    nb_bins: usize,
}

/// Forwards to the wrapped recorder and tracks where the trial is in its lifecycle.
struct PhaseTracker<'a, R: SpikeRecorder> {
    inner: &'a mut R,
    phase: Phase,
    nb_flushed: usize,
}

pub fn create_simulation(
    params: SimulationParams,
    connections: Connections,
) -> Result<Simulation, SimpleError> {
    try_with!(
        params::validate_simulation_params(&params),
        "invalid simulation parameters"
    );

    try_with!(
        connections.validate(params.nb_neurons),
        "invalid connections"
    );

    let neuron_params = params.neuron_params();
    let synapses = SynapseTable::new(params.nb_neurons, &connections, params.synapse_weight);
    let neurons = vec![Neuron::new(&neuron_params); params.nb_neurons];
    let checkpoint = Checkpoint::take(&neurons);

    let num_threads = params
        .technical_params
        .num_threads
        .unwrap_or_else(num_cpus::get);
    let base_seed = params.technical_params.seed_override.unwrap_or(0);

    info!(
        "created simulation {}: {} neurons, {} synapses, {} bins of {} ticks",
        params.name,
        params.nb_neurons,
        synapses.num_synapses(),
        params.nb_bins(),
        params.bin_size
    );

    Ok(Simulation {
        params,
        neuron_params: Arc::new(neuron_params),
        synapses: Arc::new(synapses),
        checkpoint: Some(Arc::new(checkpoint)),
        phase: Phase::Initialized,
        num_threads,
        base_seed,
    })
}

impl Simulation {
    pub fn get_params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn get_phase(&self) -> Phase {
        self.phase
    }

    pub fn get_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_deref()
    }

    /// Replaces the state every trial starts from.
    pub fn set_initial_state(&mut self, network_state: NetworkState) -> SimpleResult<()> {
        if network_state.nb_neurons() != self.params.nb_neurons {
            return Err(SimpleError::new(format!(
                "initial state has {} neurons, expected {}",
                network_state.nb_neurons(),
                self.params.nb_neurons
            )));
        }

        let neurons: Vec<Neuron> = network_state
            .neuron_states
            .iter()
            .map(Neuron::from_state)
            .collect();
        self.checkpoint = Some(Arc::new(Checkpoint::take(&neurons)));
        self.phase = Phase::Initialized;
        Ok(())
    }

    pub fn release_checkpoint(&mut self) -> Option<Checkpoint> {
        self.checkpoint
            .take()
            .map(|checkpoint| Arc::try_unwrap(checkpoint).unwrap_or_else(|arc| (*arc).clone()))
    }

    /// Runs `n_trials` trials with the variant implied by the stimulus mode.
    pub fn simulate(&mut self, n_trials: usize) -> SimpleResult<ObservationTensor> {
        let variant = self.default_variant();
        self.simulate_with_variant(variant, n_trials)
    }

    pub fn simulate_with_variant(
        &mut self,
        variant: StimVariant,
        n_trials: usize,
    ) -> SimpleResult<ObservationTensor> {
        if n_trials == 0 {
            return Err(SimpleError::new("n_trials must be strictly positive"));
        }

        let context = self.trial_context(variant, true)?;

        self.phase = Phase::Running;
        let result = self.run_trials(context, variant, n_trials);

        self.phase = match &result {
            Ok(_) => {
                info!("simulation {} complete", self.params.name);
                Phase::SweepComplete
            }
            Err(_) => Phase::Initialized,
        };

        result
    }

    fn run_trials(
        &self,
        context: TrialContext,
        variant: StimVariant,
        n_trials: usize,
    ) -> SimpleResult<ObservationTensor> {
        let num_threads = self.num_threads.min(n_trials);
        let pin_threads = self.params.technical_params.pin_threads;

        info!(
            "simulating {}: {} trials, stimulus {}, {} threads",
            self.params.name, n_trials, variant, num_threads
        );

        let (trial_result_tx, trial_result_rx) = mpsc_channel();
        let mut join_handles = Vec::new();

        for thread_id in 0..num_threads {
            let trial_result_tx = trial_result_tx.clone();
            let context = context.clone();

            join_handles.push(thread::spawn(move || {
                if pin_threads {
                    core_affinity::set_for_current(CoreId { id: thread_id });
                }

                let trial_range = util::get_partition_range(num_threads, thread_id, n_trials);
                debug!("thread {} running trials {:?}", thread_id, trial_range);

                for trial_idx in trial_range {
                    let mut recorder = BinRecorder::default();
                    let result = context
                        .run_trial(trial_idx, variant, &mut recorder)
                        .map(|_| recorder.into_observations());

                    if trial_result_tx.send((trial_idx, result)).is_err() {
                        break;
                    }
                }
            }));
        }

        drop(trial_result_tx);
        let trial_results: Vec<_> = trial_result_rx.iter().collect();

        for join_handle in join_handles {
            if join_handle.join().is_err() {
                return Err(SimpleError::new("trial worker panicked"));
            }
        }

        if trial_results.len() != n_trials {
            return Err(SimpleError::new(format!(
                "received {} of {} trials",
                trial_results.len(),
                n_trials
            )));
        }

        let mut tensor = ObservationTensor::new(
            ObservationKey::from_params(&self.params),
            self.params.nb_bins(),
            self.params.observation_width(),
        );

        for (trial_idx, result) in trial_results
            .into_iter()
            .sorted_by_key(|(trial_idx, _)| *trial_idx)
        {
            let observations = try_with!(result, "trial {} failed", trial_idx);
            tensor.append_trial(observations)?;
        }

        Ok(tensor)
    }

    /// Runs a single trial and returns its per-bin vectors.
    pub fn run_trial(
        &self,
        variant: StimVariant,
        trial_idx: usize,
    ) -> SimpleResult<Vec<Vec<u32>>> {
        let context = self.trial_context(variant, true)?;
        let mut recorder = BinRecorder::default();
        context.run_trial(trial_idx, variant, &mut recorder)?;
        Ok(recorder.into_observations())
    }

    /// Runs trial 0 with bin aggregation disabled and records every spike.
    pub fn run_raster(&self) -> SimpleResult<SpikeRaster> {
        let variant = self.default_variant();
        let context = self.trial_context(variant, false)?;
        let mut recorder = RasterRecorder::default();
        context.run_trial(0, variant, &mut recorder)?;

        Ok(SpikeRaster {
            key: ObservationKey::from_params(&self.params),
            duration: self.params.duration,
            events: recorder.into_events(),
        })
    }

    fn default_variant(&self) -> StimVariant {
        if self.params.stim_mode.is_on() {
            StimVariant::On
        } else {
            StimVariant::Off
        }
    }

    fn trial_context(
        &self,
        variant: StimVariant,
        bin_aggregation: bool,
    ) -> SimpleResult<TrialContext> {
        if !self.params.stim_mode.is_on() && variant != StimVariant::Off {
            return Err(SimpleError::new(format!(
                "stimulus variant {} requires stim_mode on",
                variant
            )));
        }

        let checkpoint = self
            .checkpoint
            .clone()
            .ok_or_else(|| SimpleError::new("no checkpoint stored"))?;

        Ok(TrialContext {
            integrator_params: IntegratorParams {
                duration: self.params.duration,
                bin_size: self.params.bin_size,
                stimulus_max: self.params.stimulus_max,
                stim_on: self.params.stim_mode.is_on(),
                bin_aggregation,
            },
            neuron_params: self.neuron_params.clone(),
            synapses: self.synapses.clone(),
            checkpoint,
            base_seed: self.base_seed,
            nb_bins: self.params.nb_bins(),
        })
    }
}

impl TrialContext {
    fn run_trial<R: SpikeRecorder>(
        &self,
        trial_idx: usize,
        variant: StimVariant,
        recorder: &mut R,
    ) -> SimpleResult<()> {
        let mut neurons = self.checkpoint.restore();
        let mut rng = StdRng::seed_from_u64(util::trial_seed(self.base_seed, trial_idx));
        let integrator = Integrator::new(
            self.integrator_params.clone(),
            &self.neuron_params,
            &self.synapses,
            variant,
        );

        let mut tracker = PhaseTracker::new(recorder);
        tracker.phase = Phase::Running;
        integrator.run(&mut neurons, &mut rng, &mut tracker)?;

        let expected_bins = if self.integrator_params.bin_aggregation {
            self.nb_bins
        } else {
            0
        };
        tracker.complete(expected_bins)
    }
}

impl<'a, R: SpikeRecorder> PhaseTracker<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            phase: Phase::Initialized,
            nb_flushed: 0,
        }
    }

    fn complete(&mut self, expected_bins: usize) -> SimpleResult<()> {
        if self.phase != Phase::Running || self.nb_flushed != expected_bins {
            return Err(SimpleError::new(format!(
                "trial ended in phase {:?} after {} of {} bins",
                self.phase, self.nb_flushed, expected_bins
            )));
        }

        self.phase = Phase::TrialComplete;
        Ok(())
    }
}

impl<'a, R: SpikeRecorder> SpikeRecorder for PhaseTracker<'a, R> {
    fn on_spike(&mut self, nid: usize, t: usize) {
        self.inner.on_spike(nid, t);
    }

    fn on_bin_flush(&mut self, bin_idx: usize, observation: Vec<u32>) {
        self.phase = Phase::BinFlush;
        self.inner.on_bin_flush(bin_idx, observation);
        self.nb_flushed += 1;
        self.phase = Phase::Running;
    }
}
