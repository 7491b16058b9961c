use std::time::Instant;

use spiketally::{
    connectivity::Topology,
    experiment,
    simulation::{self, Simulation},
};

#[path = "../scenario_params.rs"]
mod scenario_params;

const NB_PARENTS: usize = 19;
const N_TRIALS: usize = 200;

fn main() {
    let sweep_params = scenario_params::get_scenario_params();
    let experiment =
        experiment::parents_two_children(NB_PARENTS, Topology::FullNoLoops, Topology::Disconnected)
            .unwrap();

    let mut params = sweep_params.simulation_template.clone();
    params.name = experiment.name.clone();
    params.nb_neurons = experiment.nb_neurons;
    params.bin_size = sweep_params.bin_sizes[0];
    params.synapse_weight = sweep_params.synapse_weights[0];

    let mut simulation: Simulation =
        simulation::create_simulation(params.clone(), experiment.connections).unwrap();

    let wall_start = Instant::now();
    let tensor = simulation.simulate(N_TRIALS).unwrap();
    let wall_time = wall_start.elapsed();

    let mut spike_count = 0u64;
    let mut checksum = 0u64;

    for (bin_idx, bin) in tensor.bins.iter().enumerate() {
        for observation in bin {
            for (nid, count) in observation.iter().enumerate() {
                spike_count += *count as u64;
                checksum += (bin_idx * nid) as u64 * *count as u64;
            }
        }
    }

    let neuron_ticks = (N_TRIALS * params.nb_neurons * (params.duration + 1)) as f64;

    eprintln!("Spikes per trial: {}", spike_count as f64 / N_TRIALS as f64);
    eprintln!(
        "Trial throughput: {:.3} trials/s ({:.3} ns per neuron tick)",
        N_TRIALS as f64 / wall_time.as_secs_f64(),
        1e9 * wall_time.as_secs_f64() / neuron_ticks
    );
    eprintln!("Checksum: {}", checksum);
}
