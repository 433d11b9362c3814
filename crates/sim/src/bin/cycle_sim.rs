//! Fixed-rate robot simulation.
//!
//! Usage:
//!   cargo run -p robocycle_sim --bin cycle_sim -- [OPTIONS]
//!
//! Runs in lockstep (as fast as possible, deterministic) unless `--realtime`
//! is given, in which case cycles are paced by wall time until the cycle
//! count is reached or Ctrl-C is pressed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use robocycle_core::Diagnostics;
use robocycle_sim::{init_tracing, SimConfig, SimError, SimSummary, Simulation};

#[derive(Parser, Debug)]
#[command(name = "cycle_sim")]
#[command(version, about = "Fixed-rate robot control loop simulation", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cycles to run (overrides the configuration)
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Pace cycles by wall time instead of lockstep
    #[arg(long)]
    realtime: bool,

    /// Log level (overrides the configuration)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn load(args: &Args) -> Result<SimConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(cycles) = args.cycles {
        config.cycles = cycles;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
        config.validate()?;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<SimSummary, SimError> {
    let config = load(&args)?;
    let level = config.level_filter()?;
    init_tracing(level)?;

    let diag = Diagnostics::log_facade(level);
    tracing::info!(
        period_ms = config.period_ms,
        cycles = config.cycles,
        realtime = args.realtime,
        "Starting simulation"
    );

    let summary = if args.realtime {
        let mut sim = Simulation::realtime(&config, &diag)?;
        sim.run_realtime(config.cycles).await
    } else {
        let mut sim = Simulation::lockstep(&config, &diag)?;
        sim.run_lockstep(config.cycles)
    };
    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
