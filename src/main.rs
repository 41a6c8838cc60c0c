use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

use spermsim_common::SimulationConfig;
use spermsim_engine::sink::{persist_run, FileSink, PersistenceSink};
use spermsim_engine::SpermSimulation;

/// Command-line arguments for the simulation runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (built-in defaults when omitted)
    config: Option<PathBuf>,

    /// Container shape: cube, drop or spot
    #[arg(long)]
    shape: Option<String>,

    /// Number of sperm
    #[arg(long)]
    num: Option<u32>,

    /// Steps per sperm, including the initial position
    #[arg(long)]
    steps: Option<u32>,

    /// Number of independent runs
    #[arg(long)]
    repeat: Option<u32>,

    /// Base RNG seed; run k uses seed + k
    #[arg(long)]
    seed: Option<u64>,

    /// Advance particles of each step in parallel
    #[arg(long)]
    parallel: bool,

    /// Directory for run metadata, contacts and trajectories
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting sperm random-walk simulation...");

    // --- Load Configuration ---
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(shape) = args.shape {
        config.container.shape = shape;
    }
    if let Some(num) = args.num {
        config.motion.number_of_sperm = num;
    }
    if let Some(steps) = args.steps {
        config.motion.n_simulation = steps;
    }
    if let Some(repeat) = args.repeat {
        config.run.repeat = repeat;
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }
    if args.parallel {
        config.run.parallel = true;
    }
    if let Some(dir) = args.output_dir {
        config.output.directory = dir.display().to_string();
    }
    config.validate()?;
    let output_format = config.output_format()?;
    debug!("Configuration: {:#?}", config);

    if config.run.parallel {
        info!("Using {} Rayon threads.", rayon::current_num_threads());
    }

    let mut sink = FileSink::new(&config.output.directory, &config.output.base_filename)?;

    for r in 0..config.run.repeat {
        let mut run_config = config.clone();
        run_config.run.seed = config.run.seed.map(|s| s.wrapping_add(r as u64));

        let start_time = Instant::now();
        let mut sim = SpermSimulation::new(&run_config)?;
        let run = sim.run()?;
        // Record the seed actually drawn so the run can be replayed
        run_config.run.seed = Some(run.seed);

        let first: Vec<[f64; 3]> = run
            .trajectory
            .particle(0)
            .iter()
            .take(5)
            .map(|p| p.to_array())
            .collect();
        info!(
            "Run {}/{}: trajectory shape {:?} | contacts: {} | seed: {} | {:.3} s",
            r + 1,
            config.run.repeat,
            run.trajectory.shape(),
            run.contacts.len(),
            run.seed,
            start_time.elapsed().as_secs_f64()
        );
        info!("Run {}: first 5 coords of sperm 0 = {:?}", r + 1, first);

        // --- Save Recorded Data ---
        let run_id = if config.output.save_contacts {
            persist_run(&mut sink, &run_config, &run)?
        } else {
            let id = sink.save_run_meta(&run_config, run.seed)?;
            sink.save_summary(&id, run.contacts.len())?;
            id
        };
        if config.output.save_trajectory {
            sink.save_trajectory(&run_id, &run.trajectory, output_format)?;
        } else {
            info!("Skipping trajectory dump as per config.");
        }
    }

    info!("Simulation Complete.");
    Ok(())
}
