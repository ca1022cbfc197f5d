/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Two-node simulation on one shared HF cycle counter.
//!
//! Each cycle: due stimuli are applied, the transmitter steps, the receiver
//! steps, then finished frames are cleared from the air.  Both nodes run
//! from the same counter, so a pin edge's `cycle` is directly comparable
//! across nodes.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::handle::NodeId;
use crate::node::PinEdge;
use crate::orchestrator::{Receiver, Transmitter};
use crate::radio::{Ether, FaultPlan};

pub const TRANSMITTER_ID: NodeId = NodeId(0);
pub const RECEIVER_ID: NodeId = NodeId(1);

// ── Stimuli ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Transmitter,
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(u8),
    Release(u8),
    SleepCpu,
    WakeCpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stimulus {
    pub cycle: u64,
    pub target: Target,
    pub action: Action,
}

// ── Results ───────────────────────────────────────────────────────────────────

/// One high phase on an output pin.  `fall` is `None` while still high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pulse {
    pub rise: u64,
    pub fall: Option<u64>,
}

impl Pulse {
    pub fn width(&self) -> Option<u64> {
        self.fall.map(|f| f - self.rise)
    }
}

/// Pair up rising and falling edges.
pub fn pulses(edges: &[PinEdge]) -> Vec<Pulse> {
    let mut out: Vec<Pulse> = Vec::new();
    for edge in edges {
        if edge.level.is_high() {
            out.push(Pulse {
                rise: edge.cycle,
                fall: None,
            });
        } else if let Some(open) = out.last_mut().filter(|p| p.fall.is_none()) {
            open.fall = Some(edge.cycle);
        }
    }
    out
}

/// For every receiver pulse, its rise minus the nearest transmitter rise.
pub fn rise_skew(transmitter: &[Pulse], receiver: &[Pulse]) -> Vec<i64> {
    receiver
        .iter()
        .filter_map(|r| {
            transmitter
                .iter()
                .map(|t| r.rise as i64 - t.rise as i64)
                .min_by_key(|d| d.unsigned_abs())
        })
        .collect()
}

/// Every recorded pin edge, per node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    pub transmitter: Vec<PinEdge>,
    pub receiver: Vec<PinEdge>,
}

// ── Simulation ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Simulation {
    transmitter: Transmitter,
    receiver: Option<Receiver>,
    ether: Ether,
    now: u64,
    /// Sorted by cycle.
    pending: Vec<Stimulus>,
    trace: Trace,
}

impl Simulation {
    pub fn new(transmitter: Transmitter, receiver: Option<Receiver>) -> Self {
        Self {
            transmitter,
            receiver,
            ether: Ether::new(),
            now: 0,
            pending: Vec::new(),
            trace: Trace::default(),
        }
    }

    /// Boot both nodes from `config`.
    pub fn from_config(config: &SyncConfig, transmitter_only: bool) -> Result<Self, SyncError> {
        let transmitter = Transmitter::boot(
            TRANSMITTER_ID,
            config.transmitter_settings()?,
            Default::default(),
        )?;
        let receiver = if transmitter_only {
            None
        } else {
            Some(Receiver::boot(
                RECEIVER_ID,
                config.receiver_settings()?,
                Default::default(),
            )?)
        };
        Ok(Self::new(transmitter, receiver))
    }

    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.ether.set_faults(faults);
    }

    /// Queue `action` for the start of `cycle`.
    pub fn schedule(&mut self, cycle: u64, target: Target, action: Action) {
        let at = self.pending.partition_point(|s| s.cycle <= cycle);
        self.pending.insert(
            at,
            Stimulus {
                cycle,
                target,
                action,
            },
        );
    }

    /// Run up to and including `cycle`.
    ///
    /// # Errors
    /// A stimulus that names a button the target does not have.
    pub fn run_until(&mut self, cycle: u64) -> Result<(), SyncError> {
        while self.now < cycle {
            self.now += 1;
            let now = self.now;

            let due = self.pending.partition_point(|s| s.cycle <= now);
            for stimulus in self.pending.drain(..due).collect::<Vec<_>>() {
                self.apply(stimulus)?;
            }

            self.transmitter.step(now, &mut self.ether);
            self.trace
                .transmitter
                .extend(self.transmitter.node_mut().take_edges());

            if let Some(rx) = &mut self.receiver {
                rx.step(now, &mut self.ether);
                self.trace.receiver.extend(rx.node_mut().take_edges());
            }

            self.ether.prune(now);
        }
        Ok(())
    }

    pub fn run_for(&mut self, cycles: u64) -> Result<(), SyncError> {
        self.run_until(self.now.saturating_add(cycles))
    }

    fn apply(&mut self, stimulus: Stimulus) -> Result<(), SyncError> {
        debug!(cycle = self.now, ?stimulus, "stimulus");
        match (stimulus.target, stimulus.action) {
            (Target::Transmitter, Action::Press(i)) => self.transmitter.press(i)?,
            (Target::Transmitter, Action::Release(i)) => self.transmitter.release(i)?,
            (Target::Transmitter, Action::SleepCpu) => self.transmitter.sleep(),
            (Target::Transmitter, Action::WakeCpu) => self.transmitter.wake(),
            (Target::Receiver, action) => match &mut self.receiver {
                None => warn!(?action, "no receiver in this run, stimulus ignored"),
                Some(rx) => match action {
                    Action::SleepCpu => rx.sleep(),
                    Action::WakeCpu => rx.wake(),
                    Action::Press(_) | Action::Release(_) => {
                        warn!(?action, "receiver has no buttons, stimulus ignored")
                    }
                },
            },
        }
        Ok(())
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn transmitter(&self) -> &Transmitter {
        &self.transmitter
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub fn ether(&self) -> &Ether {
        &self.ether
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn transmitter_pulses(&self) -> Vec<Pulse> {
        pulses(&self.trace.transmitter)
    }

    pub fn receiver_pulses(&self) -> Vec<Pulse> {
        pulses(&self.trace.receiver)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
