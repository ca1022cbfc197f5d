/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runs the pair over a faulty air medium and lists which receiver pulses
//! went missing.  Manual tool, not part of production.

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use nrf_sync::clock::CYCLES_PER_US;
use nrf_sync::config::SyncConfig;
use nrf_sync::orchestrator::Seed;
use nrf_sync::radio::FaultPlan;
use nrf_sync::sim::{rise_skew, Action, Simulation, Target};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Fault {
    /// Flip a payload bit in every Nth beacon.
    CorruptEvery,
    /// Flip a payload bit in the first N beacons.
    CorruptNext,
    /// Lose every Nth beacon.
    DropEvery,
}

#[derive(Debug, Parser)]
#[command(name = "lossy-link", about = "nrf-sync over a faulty link", long_about = None)]
struct Cli {
    /// Path to the YAML pair configuration.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[arg(short = 'f', long = "fault", value_enum, default_value_t = Fault::DropEvery)]
    fault: Fault,

    /// N for the chosen fault.
    #[arg(short = 'n', long = "every", default_value_t = 3)]
    every: u64,

    /// Number of transmitter periods to run.
    #[arg(long = "periods", default_value_t = 20)]
    periods: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.every == 0 {
        bail!("--every must be at least 1");
    }

    let config = match &cli.config {
        Some(path) => SyncConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using firmware defaults");
            SyncConfig::default()
        }
    };
    let pulse = config.pulse_settings()?;
    let period_cycles = u64::from(pulse.timing.period()) << pulse.prescaler;

    let mut sim = Simulation::from_config(&config, false)?;
    sim.set_faults(match cli.fault {
        Fault::CorruptEvery => FaultPlan::CorruptEvery(cli.every),
        Fault::CorruptNext => FaultPlan::CorruptNext(cli.every),
        Fault::DropEvery => FaultPlan::DropEvery(cli.every),
    });
    if let Seed::Button { index, .. } = sim.transmitter().seed() {
        sim.schedule(1, Target::Transmitter, Action::Press(index));
    }

    let run_cycles = run_cycles(period_cycles, cli.periods)?;

    info!(fault = ?cli.fault, every = cli.every, periods = cli.periods, "running");
    sim.run_for(run_cycles)
        .context("simulation stimulus failed")?;

    let tx = sim.transmitter_pulses();
    let rx = sim.receiver_pulses();
    let latency = config.radio.beacon_latency_cycles();

    // Transmitter pulse k+1 starts the period whose beacon drives receiver
    // pulse k; a beacon sent at cycle b lands at b + latency.
    let offset_cycles = u64::from(pulse.timing.offset()) << pulse.prescaler;
    let mut missing = Vec::new();
    for (k, t) in tx.iter().enumerate().skip(1) {
        let beacon_at = t.rise - offset_cycles;
        let expected = beacon_at + latency;
        if expected > sim.now() {
            break;
        }
        if !rx.iter().any(|r| r.rise == expected) {
            missing.push(k);
        }
    }

    let ether = sim.ether();
    info!(
        emitted = ether.emitted(),
        corrupted = ether.corrupted(),
        dropped_on_air = ether.dropped(),
        receiver_pulses = rx.len(),
        "link summary"
    );
    if let Some(r) = sim.receiver() {
        let s = r.stats();
        info!(verified = s.verified, crc_failures = s.dropped, "receiver");
    }
    if missing.is_empty() {
        info!("no receiver pulse missing");
    } else {
        info!(periods = ?missing, "receiver pulses missing");
    }

    let skew = rise_skew(&tx, &rx);
    if let Some(worst) = skew.iter().map(|d| d.unsigned_abs()).max() {
        info!(
            worst_cycles = worst,
            worst_us = worst as f64 / CYCLES_PER_US as f64,
            "worst rise-to-rise skew"
        );
    }
    Ok(())
}

fn run_cycles(period_cycles: u64, periods: u64) -> Result<u64> {
    period_cycles
        .checked_mul(periods)
        .with_context(|| format!("{periods} periods do not fit the cycle counter"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_length_is_whole_periods() {
        assert_eq!(run_cycles(16_000, 20).unwrap(), 320_000);
    }

    #[test]
    fn oversized_period_count_is_an_error() {
        let err = run_cycles(16_000, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("do not fit"));
    }
}
