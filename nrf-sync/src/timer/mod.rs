/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Compare-channel timer engine.
//!
//! A [`Timer`] is a counter with a handful of compare "rungs".  Every rung is
//! checked on every counter tick and fires on its own when
//! `count == target_count`, so the firing order is the ascending order of the
//! targets, not the order they were configured in.  A firing rung may also
//! clear the counter (free-running period) and/or stop it (one-shot delay).
//!
//! The counter advances once every `2^prescaler` HF cycles after it was
//! started; a prescaler of 4 gives a 1 MHz tick.
//!
//! # Standard pattern
//! "High at T1, low at T2, period end at T3" is three rungs on one counter,
//! with `auto_clear` on the T3 rung (plus `auto_stop` when the restart is
//! driven from outside rather than self-looping).

pub mod error;

pub use error::TimerError;

use serde::Deserialize;
use tracing::debug;

use crate::clock::Timebase;
use crate::handle::{Event, EventHandle, NodeId, Task, TaskHandle};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of counters on a node (TIMER0..TIMER4).
pub const TIMER_COUNT: usize = 5;

/// Largest accepted prescaler (tick = 2^9 HF cycles = 32 µs).
pub const MAX_PRESCALER: u8 = 9;

/// Compare channels available on counter `index`.
///
/// TIMER0–2 have four channels, TIMER3–4 have six.
pub fn channel_count(index: u8) -> usize {
    if index < 3 {
        4
    } else {
        6
    }
}

// ── Bit width ─────────────────────────────────────────────────────────────────

/// Counter width.  The count wraps to zero after its maximum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BitWidth {
    #[serde(rename = "8")]
    B8,
    #[serde(rename = "16")]
    B16,
    #[serde(rename = "24")]
    B24,
    #[default]
    #[serde(rename = "32")]
    B32,
}

impl BitWidth {
    pub fn bits(self) -> u32 {
        match self {
            BitWidth::B8 => 8,
            BitWidth::B16 => 16,
            BitWidth::B24 => 24,
            BitWidth::B32 => 32,
        }
    }

    /// Largest representable count.
    pub fn max_count(self) -> u32 {
        match self {
            BitWidth::B32 => u32::MAX,
            other => (1u32 << other.bits()) - 1,
        }
    }
}

// ── Rungs ─────────────────────────────────────────────────────────────────────

/// One compare channel's target plus its shortcut behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareRung {
    pub channel: u8,
    pub target_count: u32,
    pub auto_clear: bool,
    pub auto_stop: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    target: Option<u32>,
    auto_clear: bool,
    auto_stop: bool,
}

#[derive(Debug, Clone, Copy)]
struct Setup {
    bit_width: BitWidth,
    prescaler: u8,
}

// ── Timer ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Timer {
    node: NodeId,
    index: u8,
    setup: Option<Setup>,
    channels: Vec<Channel>,
    running: bool,
    count: u32,
    /// HF cycles since the last counter increment.
    phase: u32,
}

impl Timer {
    pub(crate) fn new(node: NodeId, index: u8) -> Self {
        Self {
            node,
            index,
            setup: None,
            channels: vec![Channel::default(); channel_count(index)],
            running: false,
            count: 0,
            phase: 0,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Set width and prescaler.  Resets the count and every rung.
    ///
    /// # Errors
    /// * [`TimerError::ForeignTimebase`] – `timebase` was started on another node.
    /// * [`TimerError::Running`] – the counter must be stopped first.
    /// * [`TimerError::PrescalerOutOfRange`]
    pub fn configure(
        &mut self,
        timebase: &Timebase,
        bit_width: BitWidth,
        prescaler: u8,
    ) -> Result<(), TimerError> {
        if timebase.node() != self.node {
            return Err(TimerError::ForeignTimebase {
                timer: self.index,
                node: self.node,
                clock: timebase.node(),
            });
        }
        if self.running {
            return Err(TimerError::Running { timer: self.index });
        }
        if prescaler > MAX_PRESCALER {
            return Err(TimerError::PrescalerOutOfRange {
                timer: self.index,
                prescaler,
            });
        }

        self.setup = Some(Setup {
            bit_width,
            prescaler,
        });
        self.channels.fill(Channel::default());
        self.count = 0;
        self.phase = 0;

        debug!(
            node = %self.node,
            timer = self.index,
            bits = bit_width.bits(),
            prescaler,
            "timer configured"
        );
        Ok(())
    }

    /// Set the compare target of `channel`.
    pub fn set_rung(&mut self, channel: u8, target_count: u32) -> Result<(), TimerError> {
        let setup = self.setup.ok_or(TimerError::NotConfigured { timer: self.index })?;
        if target_count > setup.bit_width.max_count() {
            return Err(TimerError::TargetTooWide {
                timer: self.index,
                channel,
                target: target_count,
                bits: setup.bit_width.bits(),
            });
        }
        self.channel_mut(channel)?.target = Some(target_count);
        Ok(())
    }

    /// Set what happens to the counter when `channel` fires.
    pub fn set_shortcut(&mut self, channel: u8, auto_clear: bool, auto_stop: bool) -> Result<(), TimerError> {
        if self.setup.is_none() {
            return Err(TimerError::NotConfigured { timer: self.index });
        }
        let ch = self.channel_mut(channel)?;
        ch.auto_clear = auto_clear;
        ch.auto_stop = auto_stop;
        Ok(())
    }

    /// Start counting from the current value.  No-op while running.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.setup.is_none() {
            return Err(TimerError::NotConfigured { timer: self.index });
        }
        self.trigger_start();
        Ok(())
    }

    /// Halt the counter, keeping its value.
    ///
    /// Only safe while nothing bound in the fabric can start it again.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Configured rungs in ascending target order.
    pub fn rungs(&self) -> Vec<CompareRung> {
        let mut rungs: Vec<CompareRung> = self
            .channels
            .iter()
            .enumerate()
            .filter_map(|(i, ch)| {
                ch.target.map(|target_count| CompareRung {
                    channel: i as u8,
                    target_count,
                    auto_clear: ch.auto_clear,
                    auto_stop: ch.auto_stop,
                })
            })
            .collect();
        rungs.sort_by_key(|r| (r.target_count, r.channel));
        rungs
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_configured(&self) -> bool {
        self.setup.is_some()
    }

    /// HF cycles per counter tick, or `None` before [`configure`](Self::configure).
    pub fn cycles_per_tick(&self) -> Option<u64> {
        self.setup.map(|s| 1u64 << s.prescaler)
    }

    // ── Handles ───────────────────────────────────────────────────────────────

    pub fn compare_event(&self, channel: u8) -> EventHandle {
        EventHandle::new(
            self.node,
            Event::Compare {
                timer: self.index,
                channel,
            },
        )
    }

    pub fn start_task(&self) -> TaskHandle {
        TaskHandle::new(self.node, Task::TimerStart(self.index))
    }

    pub fn stop_task(&self) -> TaskHandle {
        TaskHandle::new(self.node, Task::TimerStop(self.index))
    }

    pub fn clear_task(&self) -> TaskHandle {
        TaskHandle::new(self.node, Task::TimerClear(self.index))
    }

    /// `true` when `channel` exists and has a target.
    pub(crate) fn has_rung(&self, channel: u8) -> bool {
        self.channels
            .get(channel as usize)
            .is_some_and(|ch| ch.target.is_some())
    }

    // ── Hardware side ─────────────────────────────────────────────────────────

    pub(crate) fn trigger_start(&mut self) {
        if !self.running && self.setup.is_some() {
            self.running = true;
            self.phase = 0;
        }
    }

    pub(crate) fn trigger_clear(&mut self) {
        self.count = 0;
    }

    /// Advance one HF cycle and raise compare events.
    pub(crate) fn tick(&mut self, events: &mut Vec<Event>) {
        let Some(setup) = self.setup else { return };
        if !self.running {
            return;
        }

        self.phase += 1;
        if self.phase < (1u32 << setup.prescaler) {
            return;
        }
        self.phase = 0;
        self.count = if self.count >= setup.bit_width.max_count() {
            0
        } else {
            self.count + 1
        };

        let mut clear = false;
        let mut stop = false;
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.target == Some(self.count) {
                events.push(Event::Compare {
                    timer: self.index,
                    channel: i as u8,
                });
                clear |= ch.auto_clear;
                stop |= ch.auto_stop;
            }
        }
        if clear {
            self.count = 0;
        }
        if stop {
            self.running = false;
        }
    }

    fn channel_mut(&mut self, channel: u8) -> Result<&mut Channel, TimerError> {
        let timer = self.index;
        let available = self.channels.len();
        self.channels
            .get_mut(channel as usize)
            .ok_or(TimerError::NoSuchChannel {
                timer,
                channel,
                available,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ClockConfig};

    fn timebase() -> Timebase {
        Clock::new(NodeId(0), ClockConfig::default())
            .start_hf_blocking()
            .unwrap()
    }

    fn timer(prescaler: u8) -> Timer {
        let mut t = Timer::new(NodeId(0), 0);
        t.configure(&timebase(), BitWidth::B32, prescaler).unwrap();
        t
    }

    /// Run `cycles` HF cycles and return (cycle, event) pairs, 1-based.
    fn run(t: &mut Timer, cycles: u64) -> Vec<(u64, Event)> {
        let mut out = Vec::new();
        let mut events = Vec::new();
        for c in 1..=cycles {
            t.tick(&mut events);
            out.extend(events.drain(..).map(|e| (c, e)));
        }
        out
    }

    fn cmp(channel: u8) -> Event {
        Event::Compare { timer: 0, channel }
    }

    // ── configuration ─────────────────────────────────────────────────────────

    #[test]
    fn channel_counts_per_instance() {
        assert_eq!(channel_count(0), 4);
        assert_eq!(channel_count(2), 4);
        assert_eq!(channel_count(3), 6);
        assert_eq!(Timer::new(NodeId(0), 4).channels.len(), 6);
    }

    #[test]
    fn rung_requires_configure() {
        let mut t = Timer::new(NodeId(0), 1);
        assert_eq!(t.set_rung(0, 10), Err(TimerError::NotConfigured { timer: 1 }));
        assert_eq!(t.start(), Err(TimerError::NotConfigured { timer: 1 }));
    }

    #[test]
    fn target_must_fit_bit_width() {
        let mut t = Timer::new(NodeId(0), 0);
        t.configure(&timebase(), BitWidth::B16, 0).unwrap();
        assert!(t.set_rung(0, 65_535).is_ok());
        assert!(matches!(
            t.set_rung(0, 65_536),
            Err(TimerError::TargetTooWide { bits: 16, .. })
        ));
    }

    #[test]
    fn unknown_channel_rejected() {
        let mut t = timer(0);
        assert!(matches!(
            t.set_rung(4, 1),
            Err(TimerError::NoSuchChannel { channel: 4, available: 4, .. })
        ));
    }

    #[test]
    fn prescaler_range() {
        let mut t = Timer::new(NodeId(0), 0);
        assert!(t.configure(&timebase(), BitWidth::B32, 10).is_err());
        assert!(t.configure(&timebase(), BitWidth::B32, 9).is_ok());
    }

    #[test]
    fn timebase_from_another_node_rejected() {
        let other = Clock::new(NodeId(1), ClockConfig::default())
            .start_hf_blocking()
            .unwrap();
        let mut t = Timer::new(NodeId(0), 2);
        assert_eq!(
            t.configure(&other, BitWidth::B32, 0),
            Err(TimerError::ForeignTimebase {
                timer: 2,
                node: NodeId(0),
                clock: NodeId(1),
            })
        );
        assert_eq!(t.start(), Err(TimerError::NotConfigured { timer: 2 }));
    }

    #[test]
    fn reconfigure_while_running_rejected() {
        let mut t = timer(0);
        t.start().unwrap();
        assert_eq!(
            t.configure(&timebase(), BitWidth::B32, 0),
            Err(TimerError::Running { timer: 0 })
        );
    }

    // ── counting ──────────────────────────────────────────────────────────────

    #[test]
    fn rungs_fire_in_target_order_not_channel_order() {
        let mut t = timer(0);
        t.set_rung(0, 30).unwrap();
        t.set_rung(1, 10).unwrap();
        t.set_rung(2, 20).unwrap();
        t.start().unwrap();

        let fired = run(&mut t, 30);
        assert_eq!(fired, vec![(10, cmp(1)), (20, cmp(2)), (30, cmp(0))]);

        let order: Vec<u8> = t.rungs().iter().map(|r| r.channel).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn auto_clear_gives_free_running_period() {
        let mut t = timer(0);
        t.set_rung(0, 5).unwrap();
        t.set_shortcut(0, true, false).unwrap();
        t.start().unwrap();

        let cycles: Vec<u64> = run(&mut t, 20).into_iter().map(|(c, _)| c).collect();
        assert_eq!(cycles, vec![5, 10, 15, 20]);
        assert!(t.is_running());
    }

    #[test]
    fn auto_stop_is_one_shot() {
        let mut t = timer(0);
        t.set_rung(0, 3).unwrap();
        t.set_shortcut(0, true, true).unwrap();
        t.start().unwrap();

        assert_eq!(run(&mut t, 10), vec![(3, cmp(0))]);
        assert!(!t.is_running());
        assert_eq!(t.count(), 0);

        // re-armed from outside
        t.trigger_start();
        assert_eq!(run(&mut t, 10), vec![(3, cmp(0))]);
    }

    #[test]
    fn prescaler_divides_ticks() {
        let mut t = timer(4);
        t.set_rung(0, 2).unwrap();
        t.start().unwrap();
        assert_eq!(run(&mut t, 40), vec![(32, cmp(0))]);
        assert_eq!(t.cycles_per_tick(), Some(16));
    }

    #[test]
    fn equal_targets_fire_same_tick() {
        let mut t = timer(0);
        t.set_rung(0, 4).unwrap();
        t.set_rung(1, 4).unwrap();
        t.set_shortcut(1, true, true).unwrap();
        t.start().unwrap();
        assert_eq!(run(&mut t, 8), vec![(4, cmp(0)), (4, cmp(1))]);
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut t = timer(1);
        t.start().unwrap();
        let mut events = Vec::new();
        t.tick(&mut events); // phase 1 of 2
        t.trigger_start(); // must not reset the phase
        t.tick(&mut events);
        assert_eq!(t.count(), 1);
    }

    #[test]
    fn counter_wraps_at_width() {
        let mut t = Timer::new(NodeId(0), 0);
        t.configure(&timebase(), BitWidth::B8, 0).unwrap();
        t.set_rung(0, 0).unwrap();
        t.start().unwrap();
        assert_eq!(run(&mut t, 256), vec![(256, cmp(0))]);
    }

    #[test]
    fn stop_and_clear_tasks() {
        let mut t = timer(0);
        t.start().unwrap();
        run(&mut t, 7);
        t.stop();
        run(&mut t, 7);
        assert_eq!(t.count(), 7);
        t.trigger_clear();
        assert_eq!(t.count(), 0);
    }
}
