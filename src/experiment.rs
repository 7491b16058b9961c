//! Experiment families and parameter sweeps that publish one archive per configuration.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use simple_error::{try_with, SimpleError, SimpleResult};

use crate::{
    connectivity::{Connections, Topology},
    observation::ObservationKey,
    params::SimulationParams,
    simulation, store,
};

/// The fifteen connected three-neuron motifs, as (pre, post) lists.
const THREE_NEURON_MOTIFS: [(&[usize], &[usize]); 15] = [
    (&[0], &[1]),
    (&[0, 1], &[1, 0]),
    (&[0, 1], &[1, 2]),
    (&[0, 2], &[1, 1]),
    (&[1, 1], &[0, 2]),
    (&[0, 1, 1], &[1, 0, 2]),
    (&[0, 1, 2], &[1, 0, 1]),
    (&[0, 0, 1], &[1, 2, 2]),
    (&[0, 1, 2], &[1, 2, 0]),
    (&[0, 1, 1, 2], &[1, 0, 2, 1]),
    (&[0, 1, 1, 2], &[1, 0, 2, 0]),
    (&[0, 0, 1, 1], &[1, 2, 0, 2]),
    (&[0, 1, 2, 2], &[1, 0, 0, 1]),
    (&[0, 1, 1, 2, 2], &[1, 0, 2, 0, 1]),
    (&[0, 0, 1, 1, 2, 2], &[1, 2, 0, 2, 0, 1]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub nb_neurons: usize,
    pub connections: Connections,
    /// Directory below the sweep output directory the archives go to.
    pub subdir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentParams {
    Network {
        name: String,
        topology: Topology,
        nb_neurons: usize,
    },
    ParentsOneChild {
        parent_topology: Topology,
        nb_parents: Vec<usize>,
    },
    ParentsTwoChildren {
        parent_topology: Topology,
        children_topologies: Vec<Topology>,
        nb_parents: Vec<usize>,
    },
    ThreeNeuronMotifs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepParams {
    pub output_dir: PathBuf,
    pub n_trials: usize,
    pub bin_sizes: Vec<usize>,
    pub synapse_weights: Vec<f64>,
    pub write_rasters: bool,
    pub simulation_template: SimulationParams,
    pub experiments: Vec<ExperimentParams>,
}

/// One fully specified simulation of a sweep.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub params: SimulationParams,
    pub connections: Connections,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub completed: Vec<ObservationKey>,
    pub written: Vec<PathBuf>,
    pub nb_configurations: usize,
    pub cancelled: bool,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("observations"),
            n_trials: 500,
            bin_sizes: vec![50],
            synapse_weights: vec![10.0],
            write_rasters: true,
            simulation_template: SimulationParams::default(),
            experiments: Vec::new(),
        }
    }
}

/// `nb_parents` parents (indices 1..=nb_parents) all projecting onto child 0, and
/// connected among themselves by `parent_topology`.
pub fn parents_one_child(nb_parents: usize, parent_topology: Topology) -> SimpleResult<Experiment> {
    let mut connections = Connections::default();

    for parent in 1..=nb_parents {
        connections.push(parent, 0);
    }

    let parent_connections = try_with!(
        parent_topology.connections(nb_parents),
        "cannot connect {} parents",
        nb_parents
    );
    connections.extend_shifted(&parent_connections, 1);

    Ok(Experiment {
        name: format!("parents_{}_child_1", nb_parents),
        nb_neurons: nb_parents + 1,
        connections,
        subdir: Path::new("parents_one_child").join(parent_topology.as_str()),
    })
}

/// Children 0 and 1 each receive from every parent (indices 2..nb_parents + 2). The
/// parents are connected by `parent_topology`, the two children by `children_topology`.
pub fn parents_two_children(
    nb_parents: usize,
    parent_topology: Topology,
    children_topology: Topology,
) -> SimpleResult<Experiment> {
    let mut connections = Connections::default();

    for child in 0..2 {
        for parent in 2..(nb_parents + 2) {
            connections.push(parent, child);
        }
    }

    let parent_connections = try_with!(
        parent_topology.connections(nb_parents),
        "cannot connect {} parents",
        nb_parents
    );
    connections.extend_shifted(&parent_connections, 2);

    let children_connections = try_with!(
        children_topology.connections(2),
        "cannot connect children"
    );
    connections.extend_shifted(&children_connections, 0);

    Ok(Experiment {
        name: format!("parents_{}_child_2", nb_parents),
        nb_neurons: nb_parents + 2,
        connections,
        subdir: Path::new("parents_two_children")
            .join(format!("{}_parents", parent_topology.as_str()))
            .join(format!("{}_children", children_topology.as_str())),
    })
}

pub fn three_neuron_motifs() -> Vec<Experiment> {
    THREE_NEURON_MOTIFS
        .iter()
        .enumerate()
        .map(|(graph_type, (pre, post))| Experiment {
            name: format!("graph_type_{}", graph_type),
            nb_neurons: 3,
            connections: Connections {
                pre: pre.to_vec(),
                post: post.to_vec(),
            },
            subdir: PathBuf::from("three_neuron_motifs"),
        })
        .collect()
}

impl ExperimentParams {
    pub fn build(&self) -> SimpleResult<Vec<Experiment>> {
        match self {
            ExperimentParams::Network {
                name,
                topology,
                nb_neurons,
            } => Ok(vec![Experiment {
                name: name.clone(),
                nb_neurons: *nb_neurons,
                connections: topology.connections(*nb_neurons)?,
                subdir: Path::new("network").join(topology.as_str()),
            }]),
            ExperimentParams::ParentsOneChild {
                parent_topology,
                nb_parents,
            } => nb_parents
                .iter()
                .map(|nb_parents| parents_one_child(*nb_parents, *parent_topology))
                .collect(),
            ExperimentParams::ParentsTwoChildren {
                parent_topology,
                children_topologies,
                nb_parents,
            } => {
                let mut experiments = Vec::new();

                for nb_parents in nb_parents {
                    for children_topology in children_topologies {
                        experiments.push(parents_two_children(
                            *nb_parents,
                            *parent_topology,
                            *children_topology,
                        )?);
                    }
                }

                Ok(experiments)
            }
            ExperimentParams::ThreeNeuronMotifs => Ok(three_neuron_motifs()),
        }
    }
}

pub fn validate_sweep_params(params: &SweepParams) -> Result<(), SimpleError> {
    if params.n_trials == 0 {
        return Err(SimpleError::new("n_trials must be strictly positive"));
    }

    if params.bin_sizes.is_empty() {
        return Err(SimpleError::new("bin_sizes must not be empty"));
    }

    if params.synapse_weights.is_empty() {
        return Err(SimpleError::new("synapse_weights must not be empty"));
    }

    if params.experiments.is_empty() {
        return Err(SimpleError::new("experiments must not be empty"));
    }

    Ok(())
}

/// Every (experiment, bin size, synapse weight) combination of the sweep.
pub fn expand(params: &SweepParams) -> SimpleResult<Vec<Configuration>> {
    let mut configurations = Vec::new();

    for experiment_params in params.experiments.iter() {
        let experiments = try_with!(experiment_params.build(), "invalid experiment");

        for &bin_size in params.bin_sizes.iter() {
            for &synapse_weight in params.synapse_weights.iter() {
                for experiment in experiments.iter() {
                    let mut simulation_params = params.simulation_template.clone();
                    simulation_params.name = experiment.name.clone();
                    simulation_params.nb_neurons = experiment.nb_neurons;
                    simulation_params.bin_size = bin_size;
                    simulation_params.synapse_weight = synapse_weight;

                    configurations.push(Configuration {
                        params: simulation_params,
                        connections: experiment.connections.clone(),
                        output_dir: params.output_dir.join(&experiment.subdir),
                    });
                }
            }
        }
    }

    Ok(configurations)
}

/// Runs every configuration and publishes its archive. `cancel` is checked before each
/// configuration; archives already written stay in place.
pub fn run_sweep(params: &SweepParams, cancel: &AtomicBool) -> SimpleResult<SweepSummary> {
    try_with!(validate_sweep_params(params), "invalid sweep parameters");

    let configurations = expand(params)?;
    let mut summary = SweepSummary {
        nb_configurations: configurations.len(),
        ..Default::default()
    };

    info!(
        "sweep over {} configurations, {} trials each",
        configurations.len(),
        params.n_trials
    );

    for configuration in configurations {
        if cancel.load(Ordering::SeqCst) {
            warn!(
                "sweep cancelled after {} of {} configurations",
                summary.completed.len(),
                summary.nb_configurations
            );
            summary.cancelled = true;
            break;
        }

        let mut simulation =
            simulation::create_simulation(configuration.params, configuration.connections)?;
        let tensor = simulation.simulate(params.n_trials)?;
        summary
            .written
            .push(store::write_observations(&configuration.output_dir, &tensor)?);

        if params.write_rasters {
            let raster = simulation.run_raster()?;
            summary.written.push(store::write_raster(
                &configuration.output_dir.join("raster"),
                &raster,
            )?);
        }

        summary.completed.push(tensor.key);
    }

    Ok(summary)
}
