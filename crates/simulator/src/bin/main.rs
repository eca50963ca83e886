//! Drive-my-car simulator CLI
//!
//! Runs the drive-my-car scenario in virtual time and prints a summary.
//!
//! # Example
//!
//! ```bash
//! # The classic 40-second drive
//! tickwork-sim
//!
//! # Brake from 60 kph instead of cruising, with gusty wind
//! tickwork-sim --brake --wind --seed 7 -d 20
//! ```

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tickwork_simulator::{scenario, ScenarioConfig, WindConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Drive-my-car deterministic simulator
///
/// Given the same arguments, produces identical results every run.
#[derive(Parser, Debug)]
#[command(name = "tickwork-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Simulation duration in seconds
    #[arg(short = 'd', long, default_value = "40")]
    duration: u64,

    /// Random seed for the wind
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Use the brake drivetrain instead of the gearbox
    #[arg(long)]
    brake: bool,

    /// Enable seeded wind gusts
    #[arg(long)]
    wind: bool,

    /// Explicit base tick in milliseconds (must divide every period)
    #[arg(long)]
    resolution_ms: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tickwork_simulator=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ScenarioConfig::new()
        .with_seed(args.seed)
        .with_brake(args.brake);
    if args.wind {
        config = config.with_wind(WindConfig::default());
    }
    if let Some(ms) = args.resolution_ms {
        config = config.with_resolution(Duration::from_millis(ms));
    }

    info!(
        duration_secs = args.duration,
        seed = args.seed,
        brake = args.brake,
        wind = args.wind,
        "Starting simulation"
    );

    let report = match scenario::run(&config, Duration::from_secs(args.duration)) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("\n=== Simulation Complete ===");
    println!("Virtual time:   {:.1}s", report.end_time.as_secs_f64());
    println!("Final velocity: {:.2} kph", report.final_velocity);
    println!("Peak velocity:  {:.2} kph", report.peak_velocity);
    println!("Mean velocity:  {:.2} kph", report.mean_velocity);
    println!("Gear:           {}", report.gear);
    println!("Drive mode:     {}", report.drive_mode);
    println!("Turn signal:    {} ({} blinks)", report.turn_signal, report.blinks);

    let stats = &report.stats;
    println!("\n=== Kernel ===");
    println!("Ticks:          {}", stats.ticks);
    println!("Updates:        {}", stats.updates);
    println!("Events:         {}", stats.events_dispatched);
    println!("Deliveries:     {}", stats.deliveries);
    println!("Match rate:     {:.2}%", stats.match_rate() * 100.0);

    ExitCode::SUCCESS
}
