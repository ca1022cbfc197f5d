/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Role-specific composition of the peripherals.
//!
//! Each orchestrator takes a node's [`Peripherals`](crate::node::Peripherals),
//! configures them in the only safe order
//!
//! ```text
//! HF clock ─► GPIOTE / radio / timers ─► fabric build + enable ─► initial trigger
//! ```
//!
//! and then owns the resulting [`Node`](crate::node::Node).  After boot the
//! orchestrator's `step` only does bookkeeping (payload, indications); the
//! pulse itself is produced entirely by the fabric.
//!
//! | role          | pulse reference                    | timers used          |
//! |---------------|------------------------------------|----------------------|
//! | transmitter   | seed event, then its own period    | TIMER0 + TIMER1      |
//! | receiver      | each verified beacon               | TIMER0               |

pub mod receiver;
pub mod transmitter;

pub use receiver::{Receiver, ReceiverSettings, ReceiverState};
pub use transmitter::{Seed, Transmitter, TransmitterSettings, TransmitterState};

use tracing::info;

use crate::handle::NodeId;
use crate::radio::RadioConfig;
use crate::timer::BitWidth;
use crate::timing::{PulseTiming, TimingError};

// ── Shared pulse settings ─────────────────────────────────────────────────────

/// Counter setup and pulse shape, identical on both nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSettings {
    pub prescaler: u8,
    pub bit_width: BitWidth,
    pub timing: PulseTiming,
}

impl PulseSettings {
    /// Checks that need the counter and link setup on top of the triple
    /// itself.
    pub fn validate(&self, radio: &RadioConfig) -> Result<(), TimingError> {
        self.timing.check_width(self.bit_width)?;
        self.timing
            .check_beacon(self.prescaler, radio.beacon_latency_cycles())
    }
}

// ── Indication sink ───────────────────────────────────────────────────────────

/// Human-visible status reported by the bookkeeping loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    /// Booted, nothing sent or received yet.
    Idle,
    Sent { payload: u8 },
    Received { payload: u8 },
}

/// Where indications go.  Implementations must not block.
pub trait Indicator {
    fn indicate(&mut self, node: NodeId, indication: Indication);
}

/// Default sink: one `info!` line per indication.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn indicate(&mut self, node: NodeId, indication: Indication) {
        match indication {
            Indication::Idle => info!(%node, "ready"),
            Indication::Sent { payload } => info!(%node, payload, "beacon sent"),
            Indication::Received { payload } => info!(%node, payload, "beacon received"),
        }
    }
}

/// Keeps every indication, for inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingIndicator {
    pub seen: Vec<(NodeId, Indication)>,
}

impl Indicator for RecordingIndicator {
    fn indicate(&mut self, node: NodeId, indication: Indication) {
        self.seen.push((node, indication));
    }
}

// ── CPU ───────────────────────────────────────────────────────────────────────

/// Whether the application loop runs.  Peripherals ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cpu {
    #[default]
    Awake,
    Asleep,
}
