/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Opaque event and task handles.
//!
//! Every peripheral hands out [`EventHandle`]s for the conditions it can
//! raise and [`TaskHandle`]s for the actions it can perform.  The fabric only
//! ever binds these handles; there are no raw register addresses anywhere in
//! the crate, so "route event X to task Y" cannot point into the void.
//!
//! A handle remembers which node produced it.  Binding a handle that belongs
//! to another node is rejected when the fabric is built.

use std::fmt;

// ── Node identity ─────────────────────────────────────────────────────────────

/// Identifies one physical board (one set of peripherals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u8);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

// ── Internal event / task vocabulary ──────────────────────────────────────────

/// Hardware conditions that can be routed through the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Event {
    LfClockStarted,
    Compare { timer: u8, channel: u8 },
    RadioCrcOk,
    ButtonPressed(u8),
}

/// Hardware actions that can be triggered through the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Task {
    TimerStart(u8),
    TimerStop(u8),
    TimerClear(u8),
    GpioteToggle(u8),
    RadioTransmit,
    /// Disable a fabric slot (channel-group disable).
    SlotDisable(u8),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::LfClockStarted => write!(f, "CLOCK.LFCLKSTARTED"),
            Event::Compare { timer, channel } => write!(f, "TIMER{timer}.COMPARE[{channel}]"),
            Event::RadioCrcOk => write!(f, "RADIO.CRCOK"),
            Event::ButtonPressed(i) => write!(f, "BUTTON{i}.PRESSED"),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::TimerStart(i) => write!(f, "TIMER{i}.START"),
            Task::TimerStop(i) => write!(f, "TIMER{i}.STOP"),
            Task::TimerClear(i) => write!(f, "TIMER{i}.CLEAR"),
            Task::GpioteToggle(ch) => write!(f, "GPIOTE.OUT[{ch}]"),
            Task::RadioTransmit => write!(f, "RADIO.TXEN"),
            Task::SlotDisable(slot) => write!(f, "FABRIC.DIS[{slot}]"),
        }
    }
}

// ── Public handles ────────────────────────────────────────────────────────────

/// An event source on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub(crate) node: NodeId,
    pub(crate) event: Event,
}

impl EventHandle {
    pub(crate) fn new(node: NodeId, event: Event) -> Self {
        Self { node, event }
    }

    /// Node whose peripheral raises this event.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.event)
    }
}

/// A task sink on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) node: NodeId,
    pub(crate) task: Task,
}

impl TaskHandle {
    pub(crate) fn new(node: NodeId, task: Task) -> Self {
        Self { node, task }
    }

    /// Node whose peripheral performs this task.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.task)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_display_register_style_names() {
        let ev = EventHandle::new(NodeId(1), Event::Compare { timer: 1, channel: 2 });
        assert_eq!(ev.to_string(), "node1:TIMER1.COMPARE[2]");

        let task = TaskHandle::new(NodeId(0), Task::GpioteToggle(3));
        assert_eq!(task.to_string(), "node0:GPIOTE.OUT[3]");
    }

    #[test]
    fn handles_from_different_nodes_are_distinct() {
        let a = TaskHandle::new(NodeId(0), Task::RadioTransmit);
        let b = TaskHandle::new(NodeId(1), Task::RadioTransmit);
        assert_ne!(a, b);
        assert_eq!(a.node(), NodeId(0));
    }
}
