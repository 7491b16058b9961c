use spiketally::experiment::SweepParams;

pub fn get_scenario_params() -> SweepParams {
    let params_yaml_str = r#"
output_dir: observations
n_trials: 500
bin_sizes: [50]
synapse_weights: [10.0]
write_rasters: true
simulation_template:
  duration: 1000
  neuron_preset: regular_spiking
  stim_mode: "off"
  stimulus_max: 500
  technical_params:
    num_threads: null
    pin_threads: false
    seed_override: 0
experiments:
- !parents_one_child
  parent_topology: disconnected
  nb_parents: [1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 37, 39]
- !parents_two_children
  parent_topology: disconnected
  children_topologies: [disconnected]
  nb_parents: [1, 3, 5, 7, 9, 11, 13, 15, 17, 19]
- three_neuron_motifs
"#;

    serde_yaml::from_str(params_yaml_str).unwrap()
}
