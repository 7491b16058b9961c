use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::info;
use spiketally::experiment::{self, SweepParams};

#[path = "../scenario_params.rs"]
mod scenario_params;

#[derive(Parser, Debug)]
#[command(name = "spiketally-sweep", version, long_about = None)]
struct Args {
    /// Sweep configuration (YAML). Runs the built-in experiment families when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory, overrides the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Trials per configuration, overrides the configuration
    #[arg(short, long)]
    n_trials: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn load_params(args: &Args) -> Result<SweepParams, Box<dyn std::error::Error>> {
    let mut params = match &args.config {
        Some(path) => {
            info!("Loading sweep configuration from: {}", path.display());
            serde_yaml::from_str(&fs::read_to_string(path)?)?
        }
        None => scenario_params::get_scenario_params(),
    };

    if let Some(output_dir) = &args.output_dir {
        params.output_dir = output_dir.clone();
    }

    if let Some(n_trials) = args.n_trials {
        params.n_trials = n_trials;
    }

    let technical_params = &mut params.simulation_template.technical_params;

    if args.threads.is_some() {
        technical_params.num_threads = args.threads;
    }

    if args.seed.is_some() {
        technical_params.seed_override = args.seed;
    }

    Ok(params)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let params = load_params(&args)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let c = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping after the current configuration...");
        c.store(true, Ordering::SeqCst);
    })?;

    let summary = experiment::run_sweep(&params, &cancel)?;

    info!(
        "{} of {} configurations completed, {} files written to {}",
        summary.completed.len(),
        summary.nb_configurations,
        summary.written.len(),
        params.output_dir.display()
    );

    if summary.cancelled {
        std::process::exit(130);
    }

    Ok(())
}
