/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! One board: its peripherals and the cycle-by-cycle hardware behaviour that
//! ties them together through the fabric.
//!
//! # Ownership model
//! [`Peripherals::take`] hands out every peripheral of a node as an owned
//! value.  The orchestrator configures them by `&mut`, builds a [`Fabric`]
//! against them, then moves both into a [`Node`].  From that point the node
//! is the only thing that advances them; the CPU side can still read them
//! and write the payload buffer through [`Node::peripherals_mut`].
//!
//! # Per-cycle order
//! ```text
//! clock ─┐
//! timers ├─► events ──fabric──► tasks ──► applied on the same cycle
//! radio  │
//! buttons┘
//! ```

use serde::Serialize;
use tracing::trace;

use crate::board::Pin;
use crate::clock::{Clock, ClockConfig};
use crate::fabric::{Fabric, FabricError, Unresolved};
use crate::gpio::{Buttons, Gpiote, Level};
use crate::handle::{Event, NodeId, Task};
use crate::radio::{Ether, Radio, Role};
use crate::timer::{Timer, TIMER_COUNT};

// ── Peripherals ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Peripherals {
    node: NodeId,
    pub clock: Clock,
    pub timers: [Timer; TIMER_COUNT],
    pub gpiote: Gpiote,
    pub buttons: Buttons,
    pub radio: Radio,
}

impl Peripherals {
    /// All peripherals of `node`, unconfigured.
    pub fn take(node: NodeId, clock: ClockConfig) -> Self {
        Self {
            node,
            clock: Clock::new(node, clock),
            timers: std::array::from_fn(|i| Timer::new(node, i as u8)),
            gpiote: Gpiote::new(node),
            buttons: Buttons::new(node),
            radio: Radio::new(node),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn resolve_event(&self, event: Event) -> Result<(), Unresolved> {
        match event {
            Event::LfClockStarted => Ok(()),
            Event::Compare { timer, channel } => {
                let t = self
                    .timers
                    .get(timer as usize)
                    .ok_or(Unresolved::NoSuchResource)?;
                if !t.is_configured() {
                    Err(Unresolved::NotConfigured)
                } else if !t.has_rung(channel) {
                    Err(Unresolved::NoSuchResource)
                } else {
                    Ok(())
                }
            }
            Event::RadioCrcOk => self.resolve_radio(Role::Receiver),
            Event::ButtonPressed(i) => {
                if self.buttons.is_configured(i) {
                    Ok(())
                } else {
                    Err(Unresolved::NoSuchResource)
                }
            }
        }
    }

    pub(crate) fn resolve_task(&self, task: Task) -> Result<(), Unresolved> {
        match task {
            Task::TimerStart(i) | Task::TimerStop(i) | Task::TimerClear(i) => {
                match self.timers.get(i as usize) {
                    None => Err(Unresolved::NoSuchResource),
                    Some(t) if !t.is_configured() => Err(Unresolved::NotConfigured),
                    Some(_) => Ok(()),
                }
            }
            Task::GpioteToggle(ch) => {
                if self.gpiote.is_configured(ch) {
                    Ok(())
                } else {
                    Err(Unresolved::NoSuchResource)
                }
            }
            Task::RadioTransmit => self.resolve_radio(Role::Transmitter),
            // resolved by the fabric against its own table
            Task::SlotDisable(_) => Ok(()),
        }
    }

    fn resolve_radio(&self, needed: Role) -> Result<(), Unresolved> {
        match self.radio.role() {
            None => Err(Unresolved::NotConfigured),
            Some(role) if role != needed => Err(Unresolved::WrongRole),
            Some(_) => Ok(()),
        }
    }
}

// ── Pin trace ─────────────────────────────────────────────────────────────────

/// A level change on an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinEdge {
    pub cycle: u64,
    pub pin: Pin,
    pub level: Level,
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Node {
    peripherals: Peripherals,
    fabric: Fabric,
    /// Events raised on the last stepped cycle.
    events: Vec<Event>,
    tasks: Vec<Task>,
    edges: Vec<PinEdge>,
    last_cycle: u64,
}

impl Node {
    /// Put configured peripherals and their fabric together.
    pub fn new(peripherals: Peripherals, fabric: Fabric) -> Result<Self, FabricError> {
        if fabric.node() != peripherals.node() {
            return Err(FabricError::NodeMismatch {
                fabric: fabric.node(),
                node: peripherals.node(),
            });
        }
        Ok(Self {
            peripherals,
            fabric,
            events: Vec::new(),
            tasks: Vec::new(),
            edges: Vec::new(),
            last_cycle: 0,
        })
    }

    pub fn id(&self) -> NodeId {
        self.peripherals.node()
    }

    pub fn peripherals(&self) -> &Peripherals {
        &self.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals {
        &mut self.peripherals
    }

    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    pub fn fabric_mut(&mut self) -> &mut Fabric {
        &mut self.fabric
    }

    /// Last cycle passed to [`step`](Self::step).
    pub fn last_cycle(&self) -> u64 {
        self.last_cycle
    }

    /// Pin edges recorded since the last call.
    pub fn take_edges(&mut self) -> Vec<PinEdge> {
        std::mem::take(&mut self.edges)
    }

    pub fn edges(&self) -> &[PinEdge] {
        &self.edges
    }

    /// `true` if `event` was raised on the last stepped cycle.
    pub(crate) fn raised(&self, event: Event) -> bool {
        self.events.contains(&event)
    }

    /// Run one HF cycle.
    pub fn step(&mut self, now: u64, ether: &mut Ether) {
        self.last_cycle = now;
        self.events.clear();

        let p = &mut self.peripherals;
        p.clock.tick(&mut self.events);
        for timer in p.timers.iter_mut() {
            timer.tick(&mut self.events);
        }
        p.radio.step(now, ether, &mut self.events);
        p.buttons.tick(&mut self.events);

        if self.events.is_empty() {
            return;
        }

        self.tasks.clear();
        for &event in &self.events {
            self.fabric.route(event, &mut self.tasks);
        }

        let tasks = std::mem::take(&mut self.tasks);
        for &task in &tasks {
            self.apply(task, now);
        }
        self.tasks = tasks;
    }

    fn apply(&mut self, task: Task, now: u64) {
        trace!(node = %self.id(), cycle = now, %task, "task");
        let p = &mut self.peripherals;
        match task {
            Task::TimerStart(i) => p.timers[i as usize].trigger_start(),
            Task::TimerStop(i) => p.timers[i as usize].stop(),
            Task::TimerClear(i) => p.timers[i as usize].trigger_clear(),
            Task::GpioteToggle(ch) => {
                if let Some((pin, level)) = p.gpiote.toggle(ch) {
                    self.edges.push(PinEdge {
                        cycle: now,
                        pin,
                        level,
                    });
                }
            }
            Task::RadioTransmit => p.radio.begin_transmit(),
            Task::SlotDisable(slot) => self.fabric.disable_index(slot),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
