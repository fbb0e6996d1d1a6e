//! Cycle Simulator - Entry point
//!
//! CLI Usage:
//!   cargo run                                  # 120 days with default settings
//!   cargo run -- --days 60 --seed 7 --csv out  # Custom run with CSV export
//!   cargo run -- --calibration                 # Raw growth law, no lifecycle rules

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use cycle_simulator::{
    config::{ParameterSet, SimulationConfig},
    export::{export_trajectory_json, CsvExporter},
    simulate, EvaluationMode,
};

/// Simulate follicle growth and hormone feedback over several cycles
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Simulation config (JSON); defaults are used if missing
    #[arg(short, long, default_value = "config/simulation.json")]
    config: PathBuf,

    /// Parameter file (flat JSON array); built-in defaults if omitted
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Override the horizon (days)
    #[arg(short, long)]
    days: Option<f64>,

    /// Override the recruitment seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Evaluate the raw growth law without lifecycle overrides
    #[arg(long)]
    calibration: bool,

    /// Write a hormone CSV into this directory
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Spacing of CSV rows (days)
    #[arg(long, default_value_t = 0.1)]
    csv_interval: f64,

    /// Write the full trajectory as JSON into this directory
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Cycle Simulator starting...");

    let params = match &args.params {
        Some(path) => ParameterSet::load(path)?,
        None => ParameterSet::default(),
    };

    let mut config = SimulationConfig::load_or_default(&args.config);
    if let Some(days) = args.days {
        config.horizon_days = config.start_day + days;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.calibration {
        config.mode = EvaluationMode::Calibration;
    }

    let started = Instant::now();
    let trajectory = simulate(params.clone(), config).context("simulation failed")?;
    let summary = trajectory.summary();

    println!("=== Cycle Simulator ===\n");
    println!("Simulated days:     {:.1} - {:.1}", summary.start_day, summary.end_day);
    println!("Accepted steps:     {}", summary.steps);
    println!("Follicles created:  {}", summary.follicles_created);
    println!("Max active:         {}", summary.max_active);
    println!("Ovulations:         {}", summary.ovulation_times.len());
    for (i, t) in summary.ovulation_times.iter().enumerate() {
        println!("  #{:<3} day {:.2}", i + 1, t);
    }
    match summary.mean_cycle_length() {
        Some(mean) => println!("Mean cycle length:  {:.1} days", mean),
        None => println!("Mean cycle length:  n/a"),
    }
    println!("Wall time:          {:.2?}", started.elapsed());

    if let Some(dir) = &args.csv {
        let mut exporter = CsvExporter::new(dir, args.csv_interval)?;
        exporter.record_all(&trajectory)?;
        let path = exporter.finish()?;
        println!("CSV:  {}", path.display());
    }
    if let Some(dir) = &args.json {
        let path = export_trajectory_json(&trajectory, &params, dir)?;
        println!("JSON: {}", path.display());
    }

    Ok(())
}
