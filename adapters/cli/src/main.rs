#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Endless Waves session.

mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use endless_waves_core::SchedulerConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use self::simulation::SessionOptions;

/// Runs endless waves against a simulated host whose units die after a random lifetime.
#[derive(Debug, Parser)]
#[command(name = "endless-waves", version)]
struct Args {
    /// TOML file with scheduler settings; defaults apply to missing keys.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop once this many waves have been cleared.
    #[arg(long, default_value_t = 3)]
    waves: u64,
    /// Seed for unit lifetimes.
    #[arg(long, default_value_t = 0x5eed_cafe)]
    seed: u64,
    /// Simulation step in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Shortest unit lifetime in milliseconds.
    #[arg(long, default_value_t = 500)]
    min_lifetime_ms: u64,
    /// Longest unit lifetime in milliseconds.
    #[arg(long, default_value_t = 1_700)]
    max_lifetime_ms: u64,
    /// Pace the session to the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Print the final scheduler status and the event log as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Endless Waves command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("failed to load scheduler config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };

    if config.min_spawn_interval() > config.base_spawn_interval() {
        warn!(
            min = ?config.min_spawn_interval(),
            base = ?config.base_spawn_interval(),
            "minimum spawn interval exceeds the base interval; every wave uses the minimum"
        );
    }
    if args.min_lifetime_ms > args.max_lifetime_ms {
        bail!(
            "--min-lifetime-ms ({}) must not exceed --max-lifetime-ms ({})",
            args.min_lifetime_ms,
            args.max_lifetime_ms
        );
    }

    let options = SessionOptions {
        waves: args.waves,
        seed: args.seed,
        tick: Duration::from_millis(args.tick_ms),
        lifetime_ms: args.min_lifetime_ms..=args.max_lifetime_ms,
        realtime: args.realtime,
    };

    info!(waves = options.waves, seed = options.seed, "session starting");
    let report = simulation::run(config, &options);

    if args.json {
        let summary =
            serde_json::to_string_pretty(&report).context("failed to encode session summary")?;
        println!("{summary}");
    } else {
        info!(
            wave = %report.status.wave,
            elapsed_secs = report.status.elapsed.as_secs_f64(),
            events = report.events.len(),
            "session finished"
        );
    }

    Ok(())
}
