/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Event → task interconnect fabric.
//!
//! A fixed table of bindings, each routing one event source to one task sink
//! plus an optional "fork" sink.  When an enabled binding's event occurs,
//! both sinks are triggered on the same cycle without executing a single CPU
//! instruction, so routing latency is constant whatever the CPU is doing,
//! including sleeping.
//!
//! # Configuration flow
//! ```text
//! FabricBuilder::bind(..) ×N ──build(&peripherals)──► Fabric ──enable(slot)──► live
//!                                  │
//!                                  └─ every handle checked here
//! ```
//! [`FabricBuilder::build`] is the only way to obtain a [`Fabric`], so
//! [`Fabric::enable`] is never reachable with a dangling handle.  An event
//! that occurs while its slot is still disabled is lost, never queued.
//!
//! The fabric also exposes one task of its own, [`FabricBuilder::disable_task`],
//! which lets a binding switch a slot off without the CPU.  A one-shot seed is
//! built this way: its fork disables its own slot.

pub mod error;

pub use error::{FabricError, Unresolved};

use std::fmt;

use tracing::{debug, info};

use crate::handle::{Event, EventHandle, NodeId, Task, TaskHandle};
use crate::node::Peripherals;

/// Number of programmable bindings.
pub const FABRIC_SLOTS: usize = 20;

// ── Slot & binding ────────────────────────────────────────────────────────────

/// Index of a binding in the fabric table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH[{}]", self.0)
    }
}

/// One fabric entry: source → sink (+ fork).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub source: EventHandle,
    pub sink: TaskHandle,
    pub fork: Option<TaskHandle>,
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FabricBuilder {
    node: NodeId,
    bindings: Vec<Binding>,
}

impl FabricBuilder {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            bindings: Vec::with_capacity(FABRIC_SLOTS),
        }
    }

    /// Reserve the next slot for `source → sink (+ fork)`.
    ///
    /// # Errors
    /// [`FabricError::SlotsExhausted`] once all slots are taken.
    pub fn bind(
        &mut self,
        source: EventHandle,
        sink: TaskHandle,
        fork: Option<TaskHandle>,
    ) -> Result<Slot, FabricError> {
        if self.bindings.len() >= FABRIC_SLOTS {
            return Err(FabricError::SlotsExhausted);
        }
        let slot = Slot(self.bindings.len() as u8);
        self.bindings.push(Binding { source, sink, fork });
        Ok(slot)
    }

    /// Slot the next [`bind`](Self::bind) will return.
    pub fn next_slot(&self) -> Slot {
        Slot(self.bindings.len() as u8)
    }

    /// Task that disables `slot` when triggered.  The slot must have been
    /// bound by the time [`build`](Self::build) runs.
    pub fn disable_task(&self, slot: Slot) -> TaskHandle {
        TaskHandle::new(self.node, Task::SlotDisable(slot.0))
    }

    /// Check every handle against `peripherals` and produce the fabric with
    /// all slots disabled.
    ///
    /// # Errors
    /// The first binding whose event or task does not resolve.
    pub fn build(self, peripherals: &Peripherals) -> Result<Fabric, FabricError> {
        if peripherals.node() != self.node {
            return Err(FabricError::NodeMismatch {
                fabric: self.node,
                node: peripherals.node(),
            });
        }

        for (i, b) in self.bindings.iter().enumerate() {
            let slot = Slot(i as u8);

            self.check_node(b.source.node)
                .and_then(|()| peripherals.resolve_event(b.source.event))
                .map_err(|reason| FabricError::UnresolvedEvent {
                    slot,
                    handle: b.source,
                    reason,
                })?;

            for task in std::iter::once(b.sink).chain(b.fork) {
                self.check_node(task.node)
                    .and_then(|()| match task.task {
                        Task::SlotDisable(target) => self.resolve_slot(target),
                        other => peripherals.resolve_task(other),
                    })
                    .map_err(|reason| FabricError::UnresolvedTask {
                        slot,
                        handle: task,
                        reason,
                    })?;
            }

            debug!(
                %slot,
                source = %b.source.event,
                sink = %b.sink.task,
                fork = ?b.fork.map(|f| f.task.to_string()),
                "binding validated"
            );
        }

        info!(node = %self.node, bindings = self.bindings.len(), "fabric built");
        Ok(Fabric {
            node: self.node,
            bindings: self.bindings,
            enabled: 0,
        })
    }

    fn resolve_slot(&self, slot: u8) -> Result<(), Unresolved> {
        if usize::from(slot) < self.bindings.len() {
            Ok(())
        } else {
            Err(Unresolved::NoSuchResource)
        }
    }

    fn check_node(&self, node: NodeId) -> Result<(), Unresolved> {
        if node == self.node {
            Ok(())
        } else {
            Err(Unresolved::ForeignNode { expected: self.node })
        }
    }
}

// ── Fabric ────────────────────────────────────────────────────────────────────

/// A validated binding table.  Bindings are immutable; only their enable
/// state can change.
#[derive(Debug)]
pub struct Fabric {
    node: NodeId,
    bindings: Vec<Binding>,
    /// Bit `n` set = slot `n` enabled.
    enabled: u32,
}

impl Fabric {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn enable(&mut self, slot: Slot) -> Result<(), FabricError> {
        if slot.index() >= self.bindings.len() {
            return Err(FabricError::UnknownSlot(slot));
        }
        self.enabled |= 1 << slot.0;
        debug!(node = %self.node, %slot, "slot enabled");
        Ok(())
    }

    pub fn enable_all(&mut self) {
        for i in 0..self.bindings.len() {
            self.enabled |= 1 << i;
        }
        debug!(node = %self.node, slots = self.bindings.len(), "all slots enabled");
    }

    /// Stop routing through `slot`.  Its binding stays in the table.
    pub fn disable(&mut self, slot: Slot) -> Result<(), FabricError> {
        if slot.index() >= self.bindings.len() {
            return Err(FabricError::UnknownSlot(slot));
        }
        self.enabled &= !(1 << slot.0);
        debug!(node = %self.node, %slot, "slot disabled");
        Ok(())
    }

    pub fn is_enabled(&self, slot: Slot) -> bool {
        self.enabled & (1 << slot.0) != 0
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Hardware side of [`Task::SlotDisable`].
    pub(crate) fn disable_index(&mut self, slot: u8) {
        if usize::from(slot) < self.bindings.len() {
            self.enabled &= !(1 << slot);
        }
    }

    /// Append the tasks `event` triggers through enabled slots.
    pub(crate) fn route(&self, event: Event, out: &mut Vec<Task>) {
        for (i, b) in self.bindings.iter().enumerate() {
            if self.enabled & (1 << i) == 0 || b.source.event != event {
                continue;
            }
            out.push(b.sink.task);
            if let Some(fork) = b.fork {
                out.push(fork.task);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
