/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Beacon receiver: one pulse per verified beacon.
//!
//! ```text
//!  RADIO.CRCOK ──────► LED toggle ↑   fork T0.START
//!  T0.CMP0 (duration) ► LED toggle ↓   (T0 clears and stops)
//! ```
//!
//! The radio listens continuously from boot; a frame that fails its CRC
//! raises nothing, so that cycle's pulse is simply skipped.

use tracing::{debug, info};

use super::{Cpu, Indication, Indicator, LogIndicator, PulseSettings};
use crate::board::Pin;
use crate::clock::ClockConfig;
use crate::error::SyncError;
use crate::fabric::FabricBuilder;
use crate::gpio::Level;
use crate::handle::{Event, NodeId};
use crate::node::{Node, Peripherals};
use crate::radio::{Ether, LinkStats, RadioConfig, Role};

const DURATION_TIMER: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSettings {
    pub clock: ClockConfig,
    pub pulse: PulseSettings,
    /// Link settings; the role is forced to receiver.
    pub radio: RadioConfig,
    pub led: Pin,
    pub gpiote_channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Listening,
    PulseHigh,
    /// The cycle the pin went low.
    PulseLow,
}

#[derive(Debug)]
pub struct Receiver<I: Indicator = LogIndicator> {
    node: Node,
    gpiote_channel: u8,
    indicator: I,
    cpu: Cpu,
    dropped_seen: u64,
}

impl<I: Indicator> Receiver<I> {
    pub fn boot(id: NodeId, settings: ReceiverSettings, mut indicator: I) -> Result<Self, SyncError> {
        let radio = settings.radio.with_role(Role::Receiver);
        settings.pulse.validate(&radio)?;
        let timing = settings.pulse.timing;

        let mut p = Peripherals::take(id, settings.clock.clone());
        let tb = p.clock.start_hf_blocking()?;

        p.gpiote
            .configure_toggle(settings.gpiote_channel, settings.led, Level::Low)?;
        p.radio.configure(&tb, radio)?;

        let t0 = &mut p.timers[DURATION_TIMER];
        t0.configure(&tb, settings.pulse.bit_width, settings.pulse.prescaler)?;
        t0.set_rung(0, timing.duration())?;
        t0.set_shortcut(0, true, true)?;

        let led = p.gpiote.toggle_task(settings.gpiote_channel);
        let t0 = &p.timers[DURATION_TIMER];

        let mut fb = FabricBuilder::new(id);
        fb.bind(p.radio.crc_ok_event(), led, Some(t0.start_task()))?;
        fb.bind(t0.compare_event(0), led, None)?;
        let mut fabric = fb.build(&p)?;
        fabric.enable_all();

        // initial trigger, only once every slot is live
        p.radio.arm_receive()?;

        info!(
            node = %id,
            duration = timing.duration(),
            prescaler = settings.pulse.prescaler,
            led = %settings.led,
            "receiver booted"
        );
        indicator.indicate(id, Indication::Idle);

        Ok(Self {
            node: Node::new(p, fabric)?,
            gpiote_channel: settings.gpiote_channel,
            indicator,
            cpu: Cpu::Awake,
            dropped_seen: 0,
        })
    }

    pub fn step(&mut self, now: u64, ether: &mut Ether) {
        self.node.step(now, ether);

        if self.cpu == Cpu::Asleep {
            return;
        }

        let radio = &self.node.peripherals().radio;
        if self.node.raised(Event::RadioCrcOk) {
            let payload = radio.payload();
            self.indicator
                .indicate(self.node.id(), Indication::Received { payload });
        }

        let dropped = radio.stats().dropped;
        if dropped > self.dropped_seen {
            self.dropped_seen = dropped;
            debug!(node = %self.node.id(), cycle = now, dropped, "beacon failed CRC");
        }
    }

    /// Re-enter listening.  A no-op while the link is already listening.
    pub fn arm_receive(&mut self) -> Result<(), SyncError> {
        self.node.peripherals_mut().radio.arm_receive()?;
        Ok(())
    }

    pub fn sleep(&mut self) {
        self.cpu = Cpu::Asleep;
    }

    pub fn wake(&mut self) {
        self.cpu = Cpu::Awake;
        self.dropped_seen = self.node.peripherals().radio.stats().dropped;
    }

    pub fn cpu(&self) -> Cpu {
        self.cpu
    }

    pub fn state(&self) -> ReceiverState {
        if self.led_level().is_high() {
            ReceiverState::PulseHigh
        } else if self.node.raised(Event::Compare {
            timer: DURATION_TIMER as u8,
            channel: 0,
        }) {
            ReceiverState::PulseLow
        } else {
            ReceiverState::Listening
        }
    }

    pub fn led_level(&self) -> Level {
        self.node
            .peripherals()
            .gpiote
            .level(self.gpiote_channel)
            .unwrap_or_default()
    }

    /// Payload of the last verified beacon (0 before the first).
    pub fn last_payload(&self) -> u8 {
        self.node.peripherals().radio.payload()
    }

    pub fn is_listening(&self) -> bool {
        self.node.peripherals().radio.is_listening()
    }

    pub fn stats(&self) -> LinkStats {
        self.node.peripherals().radio.stats()
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::RecordingIndicator;
    use crate::timer::BitWidth;
    use crate::timing::PulseTiming;

    fn settings() -> ReceiverSettings {
        ReceiverSettings {
            clock: ClockConfig::default(),
            pulse: PulseSettings {
                prescaler: 4,
                bit_width: BitWidth::B32,
                timing: PulseTiming::new(1000, 212, 10).unwrap(),
            },
            radio: RadioConfig::new(Role::Transmitter),
            led: Pin::new(0, 13).unwrap(),
            gpiote_channel: 0,
        }
    }

    fn boot() -> Receiver<RecordingIndicator> {
        Receiver::boot(NodeId(1), settings(), RecordingIndicator::default()).unwrap()
    }

    #[test]
    fn role_is_forced_and_link_listens_after_ramp_up() {
        let mut rx = boot();
        assert_eq!(
            rx.node().peripherals().radio.role(),
            Some(Role::Receiver)
        );
        assert!(!rx.is_listening());

        let mut ether = Ether::new();
        for now in 1..=140 * 16 {
            rx.step(now, &mut ether);
        }
        assert!(rx.is_listening());
        assert_eq!(rx.state(), ReceiverState::Listening);
    }

    #[test]
    fn arm_receive_is_idempotent() {
        let mut rx = boot();
        let mut ether = Ether::new();
        for now in 1..=3000 {
            rx.step(now, &mut ether);
        }
        rx.arm_receive().unwrap();
        rx.arm_receive().unwrap();
        assert!(rx.is_listening());
        assert_eq!(rx.stats(), LinkStats::default());
    }

    #[test]
    fn boot_indicates_idle() {
        let rx = boot();
        assert_eq!(rx.indicator().seen, vec![(NodeId(1), Indication::Idle)]);
        assert_eq!(rx.led_level(), Level::Low);
    }

    #[test]
    fn duration_must_fit_counter() {
        let mut s = settings();
        s.pulse.bit_width = BitWidth::B8;
        assert!(matches!(
            Receiver::boot(NodeId(1), s, RecordingIndicator::default()),
            Err(SyncError::Timing(_))
        ));
    }
}
