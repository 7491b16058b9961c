pub mod connectivity;
pub mod experiment;
pub mod integrator;
pub mod neuron;
pub mod observation;
pub mod params;
pub mod simulation;
pub mod state_snapshot;
pub mod stimulus;
pub mod store;
pub mod synapse;

mod types;
mod util;
