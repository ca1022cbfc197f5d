/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use nrf_sync::clock::CYCLES_PER_US;
use nrf_sync::config::SyncConfig;
use nrf_sync::orchestrator::Seed;
use nrf_sync::sim::{rise_skew, Action, Pulse, Simulation, Target};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Boots a transmitter/receiver pair and runs them on a shared cycle counter.
///
/// Example:
///   nrf-sync --config sync.yaml --run-us 10000 --press-at-us 5 --trace pulses.yaml
#[derive(Debug, Parser)]
#[command(
    name = "nrf-sync",
    about = "Two-node pulse synchronisation over a radio beacon",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML pair configuration.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// How long to run, in µs.
    #[arg(short = 'r', long = "run-us", default_value_t = 10_000)]
    run_us: u64,

    /// When to press the seed button, in µs.
    #[arg(short = 'p', long = "press-at-us", default_value_t = 1)]
    press_at_us: u64,

    /// Boot only the transmitter.
    #[arg(short = 't', long = "transmitter-only", default_value_t = false)]
    transmitter_only: bool,

    /// Write every pin edge to this YAML file.
    #[arg(long = "trace")]
    trace: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config           = ?cli.config,
        run_us           = cli.run_us,
        press_at_us      = cli.press_at_us,
        transmitter_only = cli.transmitter_only,
        trace            = ?cli.trace,
        "nrf-sync starting up"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => match SyncConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load sync configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using firmware defaults");
            SyncConfig::default()
        }
    };

    // ── Boot ──────────────────────────────────────────────────────────────────
    let mut sim = match Simulation::from_config(&config, cli.transmitter_only) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Boot failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&mut sim, &cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(sim: &mut Simulation, cli: &Cli) -> Result<()> {
    let press_at = us_to_cycles(cli.press_at_us, "--press-at-us")?;
    let run_until = us_to_cycles(cli.run_us, "--run-us")?;
    if let Seed::Button { index, .. } = sim.transmitter().seed() {
        sim.schedule(press_at.max(1), Target::Transmitter, Action::Press(index));
    }
    sim.run_until(run_until)
        .context("simulation stimulus failed")?;

    let tx = sim.transmitter_pulses();
    report("transmitter", &tx);
    if let Some(rx) = sim.receiver() {
        let rx_pulses = sim.receiver_pulses();
        report("receiver", &rx_pulses);
        let stats = rx.stats();
        info!(
            verified = stats.verified,
            dropped = stats.dropped,
            last_payload = rx.last_payload(),
            "link"
        );
        for (k, skew) in rise_skew(&tx, &rx_pulses).into_iter().enumerate() {
            info!(pulse = k, skew_cycles = skew, "rise-to-rise skew");
        }
    }

    if let Some(path) = &cli.trace {
        let yaml = serde_yaml::to_string(sim.trace()).context("Failed to serialise trace")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Cannot write trace file: {}", path.display()))?;
        info!("Pulse trace written to {}", path.display());
    }
    Ok(())
}

fn us_to_cycles(us: u64, flag: &str) -> Result<u64> {
    us.checked_mul(CYCLES_PER_US)
        .with_context(|| format!("{flag} {us} does not fit the cycle counter"))
}

fn report(node: &str, pulses: &[Pulse]) {
    info!("{} pulse(s) on the {}:", pulses.len(), node);
    for p in pulses {
        let us = |c: u64| c as f64 / CYCLES_PER_US as f64;
        match p.fall {
            Some(fall) => info!("  ↑ {:>10.3}µs  ↓ {:>10.3}µs", us(p.rise), us(fall)),
            None => info!("  ↑ {:>10.3}µs  (still high)", us(p.rise)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microseconds_convert_to_cycles() {
        assert_eq!(us_to_cycles(10_000, "--run-us").unwrap(), 160_000);
    }

    #[test]
    fn oversized_duration_is_an_error() {
        let err = us_to_cycles(u64::MAX, "--run-us").unwrap_err();
        assert!(err.to_string().starts_with("--run-us"));
    }
}
