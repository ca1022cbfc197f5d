/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timebase source: the high-accuracy (HF) and low-power (LF) crystals.
//!
//! Everything else needs the HF crystal running first.  Starting it is the
//! only place the crate busy-waits: [`Clock::start_hf_blocking`] spins in
//! [`await_condition`] until the oscillator reports started, then returns a
//! [`Timebase`] token.  Timers and the radio refuse to be configured without
//! that token, so the "clock first" ordering is checked by the compiler; a
//! token minted by another node's clock is rejected when configuring.
//!
//! The LF crystal is started without blocking; its started event is
//! fabric-visible and can seed the transmitter's first cycle.

use thiserror::Error;
use tracing::{debug, info};

use crate::handle::{Event, EventHandle, NodeId};

// ── Constants ─────────────────────────────────────────────────────────────────

/// HF clock frequency.  One simulation step is one HF cycle.
pub const HFCLK_HZ: u64 = 16_000_000;

/// HF cycles per microsecond.
pub const CYCLES_PER_US: u64 = HFCLK_HZ / 1_000_000;

/// Upper bound on the boot-time wait for the HF crystal (10 ms).
pub const HF_START_TIMEOUT_CYCLES: u64 = 10_000 * CYCLES_PER_US;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Which oscillator a [`ClockError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    Hf,
    Lf,
}

impl std::fmt::Display for Oscillator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Oscillator::Hf => write!(f, "HFXO"),
            Oscillator::Lf => write!(f, "LFXO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("{oscillator} did not report started within {waited_cycles} cycles")]
    StartTimeout {
        oscillator: Oscillator,
        waited_cycles: u64,
    },
}

/// Returned by [`await_condition`] when the condition never became true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwaitTimeout {
    pub limit: u64,
}

// ── Boot-time wait primitive ──────────────────────────────────────────────────

/// Poll `ready` until it returns `true`, at most `limit + 1` times.
///
/// Returns the number of polls that returned `false` before success.  Only
/// used during boot; nothing on the pulse path ever waits.
pub fn await_condition<F>(limit: u64, mut ready: F) -> Result<u64, AwaitTimeout>
where
    F: FnMut() -> bool,
{
    for waited in 0..=limit {
        if ready() {
            return Ok(waited);
        }
    }
    Err(AwaitTimeout { limit })
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Crystal start-up behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockConfig {
    /// HF crystal start-up time in µs.
    pub hf_startup_us: u32,
    /// LF crystal start-up time in µs.
    pub lf_startup_us: u32,
    /// `false` models a board without the HF crystal populated.
    pub hf_crystal_fitted: bool,
    /// `false` models a board without the 32.768 kHz crystal populated.
    pub lf_crystal_fitted: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hf_startup_us: 256,
            lf_startup_us: 250_000,
            hf_crystal_fitted: true,
            lf_crystal_fitted: true,
        }
    }
}

// ── Oscillator state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OscState {
    Stopped,
    Starting { remaining: u64 },
    Running,
}

impl OscState {
    fn starting(startup_us: u32) -> Self {
        // A zero start-up still takes one cycle to report.
        let remaining = (u64::from(startup_us) * CYCLES_PER_US).max(1);
        OscState::Starting { remaining }
    }

    /// Advance one cycle.  Returns `true` on the cycle the oscillator starts.
    fn advance(&mut self, fitted: bool) -> bool {
        match self {
            OscState::Starting { remaining } if fitted => {
                *remaining -= 1;
                if *remaining == 0 {
                    *self = OscState::Running;
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

/// Proof that the HF crystal is running.
///
/// Only [`Clock::start_hf_blocking`] creates one.
#[derive(Debug, Clone, Copy)]
pub struct Timebase {
    node: NodeId,
}

impl Timebase {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

// ── Clock peripheral ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Clock {
    node: NodeId,
    config: ClockConfig,
    hf: OscState,
    lf: OscState,
}

impl Clock {
    pub(crate) fn new(node: NodeId, config: ClockConfig) -> Self {
        Self {
            node,
            config,
            hf: OscState::Stopped,
            lf: OscState::Stopped,
        }
    }

    /// Start the HF crystal and wait for it.
    ///
    /// Calling this again once running just returns a fresh token.
    ///
    /// # Errors
    /// [`ClockError::StartTimeout`] if the crystal never reports started.
    pub fn start_hf_blocking(&mut self) -> Result<Timebase, ClockError> {
        if self.hf != OscState::Running {
            self.hf = OscState::starting(self.config.hf_startup_us);
            let fitted = self.config.hf_crystal_fitted;
            let hf = &mut self.hf;

            let waited = await_condition(HF_START_TIMEOUT_CYCLES, || {
                *hf == OscState::Running || hf.advance(fitted)
            })
            .map_err(|t| ClockError::StartTimeout {
                oscillator: Oscillator::Hf,
                waited_cycles: t.limit,
            })?;

            info!(node = %self.node, waited_cycles = waited, "HFXO started");
        }
        Ok(Timebase { node: self.node })
    }

    /// Start the LF crystal without waiting.
    ///
    /// The started event fires from [`lf_started_event`](Self::lf_started_event)
    /// once the start-up time has elapsed.
    pub fn start_lf(&mut self) {
        if self.lf == OscState::Stopped {
            debug!(node = %self.node, startup_us = self.config.lf_startup_us, "LFXO starting");
            self.lf = OscState::starting(self.config.lf_startup_us);
        }
    }

    pub fn lf_started_event(&self) -> EventHandle {
        EventHandle::new(self.node, Event::LfClockStarted)
    }

    pub fn is_hf_running(&self) -> bool {
        self.hf == OscState::Running
    }

    pub fn is_lf_running(&self) -> bool {
        self.lf == OscState::Running
    }

    pub(crate) fn tick(&mut self, events: &mut Vec<Event>) {
        if self.lf.advance(self.config.lf_crystal_fitted) {
            debug!(node = %self.node, "LFXO started");
            events.push(Event::LfClockStarted);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
