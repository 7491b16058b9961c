use serde::{Deserialize, Serialize};
use simple_error::{SimpleError, SimpleResult};

use crate::{
    params::{SimulationParams, StimMode},
    types::HashMap,
};

/// Identifies the configuration an archive was produced by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationKey {
    pub name: String,
    pub nb_neurons: usize,
    pub synapse_weight: f64,
    pub bin_size: usize,
    pub stim_mode: StimMode,
}

/// Spike count vectors indexed by (bin, trial). Every vector has `width` entries: the
/// stimulus sample first when the stimulus is on, then one count per neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTensor {
    pub key: ObservationKey,
    pub nb_bins: usize,
    pub n_trials: usize,
    pub width: usize,
    pub bins: Vec<Vec<Vec<u32>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeRaster {
    pub key: ObservationKey,
    pub duration: usize,
    pub events: Vec<(usize, usize)>,
}

impl ObservationKey {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            name: params.name.clone(),
            nb_neurons: params.nb_neurons,
            synapse_weight: params.synapse_weight,
            bin_size: params.bin_size,
            stim_mode: params.stim_mode,
        }
    }

    pub fn file_stem(&self) -> String {
        format!(
            "{}_nb_neur_{}_sw_{}_tbs_{}_stim_{}",
            self.name, self.nb_neurons, self.synapse_weight, self.bin_size, self.stim_mode
        )
    }
}

impl ObservationTensor {
    pub fn new(key: ObservationKey, nb_bins: usize, width: usize) -> Self {
        Self {
            key,
            nb_bins,
            n_trials: 0,
            width,
            bins: vec![Vec::new(); nb_bins],
        }
    }

    /// Appends the per-bin vectors of one more trial.
    pub fn append_trial(&mut self, observations: Vec<Vec<u32>>) -> SimpleResult<()> {
        if observations.len() != self.nb_bins {
            return Err(SimpleError::new(format!(
                "trial has {} bins, expected {}",
                observations.len(),
                self.nb_bins
            )));
        }

        if let Some(observation) = observations.iter().find(|obs| obs.len() != self.width) {
            return Err(SimpleError::new(format!(
                "observation width {} does not match {}",
                observation.len(),
                self.width
            )));
        }

        for (bin, observation) in self.bins.iter_mut().zip(observations) {
            bin.push(observation);
        }

        self.n_trials += 1;
        Ok(())
    }

    pub fn bin(&self, bin_idx: usize) -> &[Vec<u32>] {
        &self.bins[bin_idx]
    }

    pub fn get(&self, bin_idx: usize, trial_idx: usize) -> Option<&[u32]> {
        self.bins
            .get(bin_idx)
            .and_then(|bin| bin.get(trial_idx))
            .map(Vec::as_slice)
    }

    /// How often each distinct vector occurred in one bin across all trials.
    pub fn outcome_counts(&self, bin_idx: usize) -> HashMap<Vec<u32>, usize> {
        let mut counts = HashMap::default();

        for observation in self.bin(bin_idx) {
            *counts.entry(observation.clone()).or_insert(0) += 1;
        }

        counts
    }

    pub fn validate(&self) -> SimpleResult<()> {
        if self.bins.len() != self.nb_bins {
            return Err(SimpleError::new(format!(
                "archive has {} bins, header says {}",
                self.bins.len(),
                self.nb_bins
            )));
        }

        for bin in self.bins.iter() {
            if bin.len() != self.n_trials {
                return Err(SimpleError::new(format!(
                    "archive bin has {} trials, header says {}",
                    bin.len(),
                    self.n_trials
                )));
            }

            if bin.iter().any(|observation| observation.len() != self.width) {
                return Err(SimpleError::new(format!(
                    "archive vector width differs from header width {}",
                    self.width
                )));
            }
        }

        Ok(())
    }
}

impl SpikeRaster {
    pub fn validate(&self) -> SimpleResult<()> {
        for &(nid, t) in self.events.iter() {
            if nid >= self.key.nb_neurons || t > self.duration {
                return Err(SimpleError::new(format!(
                    "spike ({}, {}) out of range for {} neurons and duration {}",
                    nid, t, self.key.nb_neurons, self.duration
                )));
            }
        }

        Ok(())
    }
}
