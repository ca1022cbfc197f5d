/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Beacon transmitter: a free-running pulse train plus one beacon per period.
//!
//! # Wiring
//! ```text
//!  seed ──────────────► T0.START                       (+ disable own slot)
//!  T0.CMP0 (offset) ──► LED toggle ↑   fork T1.START
//!  T1.CMP0 (duration) ► LED toggle ↓
//!  T1.CMP1 (P - O) ───► T0.START       fork RADIO.TXEN
//! ```
//! T0 clears and stops on its only rung, T1 clears and stops on the period
//! rung.  T1 counts from the rising edge, so its period rung sits at
//! `period - offset`; T0 therefore restarts exactly `period` ticks after it
//! last started, together with the beacon.
//!
//! # States (derived, never polled to drive transitions)
//! ```text
//! Idle ─seed─► OffsetWait ─T0.CMP0─► PulseHigh ─T1.CMP0─► PulseLowWait ─T1.CMP1─┐
//!                  ▲                                                            │
//!                  └────────────────────────────────────────────────────────────┘
//! ```

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

const OFFSET_TIMER: usize = 0;
const DURATION_TIMER: usize = 1;

/// Event that starts the first cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    Button { index: u8, pin: Pin },
    LfClockStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitterSettings {
    pub clock: ClockConfig,
    pub pulse: PulseSettings,
    /// Link settings; the role is forced to transmitter.
    pub radio: RadioConfig,
    pub led: Pin,
    pub gpiote_channel: u8,
    pub seed: Seed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitterState {
    Idle,
    OffsetWait,
    PulseHigh,
    PulseLowWait,
}

#[derive(Debug)]
pub struct Transmitter<I: Indicator = LogIndicator> {
    node: Node,
    gpiote_channel: u8,
    seed: Seed,
    seed_event: Event,
    seeded_at: Option<u64>,
    indicator: I,
    cpu: Cpu,
    sent_seen: u64,
}

impl<I: Indicator> Transmitter<I> {
    /// Configure every peripheral, bind and enable the fabric, then arm the
    /// seed.  Nothing runs until [`step`](Self::step) is called.
    pub fn boot(id: NodeId, settings: TransmitterSettings, mut indicator: I) -> Result<Self, SyncError> {
        let radio = settings.radio.with_role(Role::Transmitter);
        settings.pulse.validate(&radio)?;
        let timing = settings.pulse.timing;

        let mut p = Peripherals::take(id, settings.clock.clone());
        let tb = p.clock.start_hf_blocking()?;

        p.gpiote
            .configure_toggle(settings.gpiote_channel, settings.led, Level::Low)?;
        p.radio.configure(&tb, radio)?;

        let offset = &mut p.timers[OFFSET_TIMER];
        offset.configure(&tb, settings.pulse.bit_width, settings.pulse.prescaler)?;
        offset.set_rung(0, timing.offset())?;
        offset.set_shortcut(0, true, true)?;

        let duration = &mut p.timers[DURATION_TIMER];
        duration.configure(&tb, settings.pulse.bit_width, settings.pulse.prescaler)?;
        duration.set_rung(0, timing.duration())?;
        duration.set_rung(1, timing.period_end_rung())?;
        duration.set_shortcut(1, true, true)?;

        let seed_handle = match settings.seed {
            Seed::Button { index, pin } => {
                p.buttons.configure(index, pin)?;
                p.buttons.pressed_event(index)
            }
            Seed::LfClockStarted => p.clock.lf_started_event(),
        };

        let led = p.gpiote.toggle_task(settings.gpiote_channel);
        let t0 = &p.timers[OFFSET_TIMER];
        let t1 = &p.timers[DURATION_TIMER];

        let mut fb = FabricBuilder::new(id);
        let seed_slot = fb.next_slot();
        fb.bind(seed_handle, t0.start_task(), Some(fb.disable_task(seed_slot)))?;
        fb.bind(t0.compare_event(0), led, Some(t1.start_task()))?;
        fb.bind(t1.compare_event(0), led, None)?;
        fb.bind(t1.compare_event(1), t0.start_task(), Some(p.radio.transmit_task()))?;
        let mut fabric = fb.build(&p)?;
        fabric.enable_all();

        if settings.seed == Seed::LfClockStarted {
            p.clock.start_lf();
        }

        info!(
            node = %id,
            period = timing.period(),
            offset = timing.offset(),
            duration = timing.duration(),
            prescaler = settings.pulse.prescaler,
            seed = ?settings.seed,
            led = %settings.led,
            "transmitter booted"
        );
        indicator.indicate(id, Indication::Idle);

        Ok(Self {
            node: Node::new(p, fabric)?,
            gpiote_channel: settings.gpiote_channel,
            seed: settings.seed,
            seed_event: seed_handle.event,
            seeded_at: None,
            indicator,
            cpu: Cpu::Awake,
            sent_seen: 0,
        })
    }

    /// Advance one HF cycle, then run the bookkeeping loop if the CPU is
    /// awake.
    pub fn step(&mut self, now: u64, ether: &mut Ether) {
        self.node.step(now, ether);

        if self.seeded_at.is_none() && self.node.raised(self.seed_event) {
            self.seeded_at = Some(now);
            debug!(node = %self.node.id(), cycle = now, "pulse train seeded");
        }

        if self.cpu == Cpu::Asleep {
            return;
        }

        let buttons_pressed = (0..crate::gpio::BUTTON_COUNT as u8)
            .any(|i| self.node.raised(Event::ButtonPressed(i)));
        if buttons_pressed {
            let p = self.node.peripherals_mut();
            let mask = p.buttons.state_mask();
            p.radio.set_payload(mask);
            debug!(node = %self.node.id(), payload = mask, "payload updated");
        }

        let sent = self.node.peripherals().radio.stats().sent;
        if sent > self.sent_seen {
            self.sent_seen = sent;
            let payload = self.node.peripherals().radio.payload();
            self.indicator
                .indicate(self.node.id(), Indication::Sent { payload });
        }
    }

    /// Debounced press of button `index`.
    pub fn press(&mut self, index: u8) -> Result<(), SyncError> {
        self.node.peripherals_mut().buttons.press(index)?;
        Ok(())
    }

    pub fn release(&mut self, index: u8) -> Result<(), SyncError> {
        self.node.peripherals_mut().buttons.release(index)?;
        Ok(())
    }

    /// Suspend the bookkeeping loop.  Pulses and beacons carry on.
    pub fn sleep(&mut self) {
        self.cpu = Cpu::Asleep;
    }

    /// Resume bookkeeping.  Beacons sent while asleep are not indicated.
    pub fn wake(&mut self) {
        self.cpu = Cpu::Awake;
        self.sent_seen = self.node.peripherals().radio.stats().sent;
    }

    pub fn cpu(&self) -> Cpu {
        self.cpu
    }

    pub fn state(&self) -> TransmitterState {
        let p = self.node.peripherals();
        if p.timers[OFFSET_TIMER].is_running() {
            TransmitterState::OffsetWait
        } else if p.timers[DURATION_TIMER].is_running() {
            if self.led_level().is_high() {
                TransmitterState::PulseHigh
            } else {
                TransmitterState::PulseLowWait
            }
        } else {
            TransmitterState::Idle
        }
    }

    pub fn led_level(&self) -> Level {
        self.node
            .peripherals()
            .gpiote
            .level(self.gpiote_channel)
            .unwrap_or_default()
    }

    /// Cycle on which the seed event fired, once it has.
    pub fn seeded_at(&self) -> Option<u64> {
        self.seeded_at
    }

    pub fn seed(&self) -> Seed {
        self.seed
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

    const TICK: u64 = 16;

    fn settings(period: u32, offset: u32, duration: u32, seed: Seed) -> TransmitterSettings {
        TransmitterSettings {
            clock: ClockConfig::default(),
            pulse: PulseSettings {
                prescaler: 4,
                bit_width: BitWidth::B32,
                timing: PulseTiming::new(period, offset, duration).unwrap(),
            },
            radio: RadioConfig::new(Role::Transmitter),
            led: Pin::new(0, 13).unwrap(),
            gpiote_channel: 0,
            seed,
        }
    }

    fn button_seed() -> Seed {
        Seed::Button {
            index: 0,
            pin: Pin::new(0, 11).unwrap(),
        }
    }

    fn boot(period: u32, offset: u32, duration: u32) -> Transmitter<RecordingIndicator> {
        Transmitter::boot(
            NodeId(0),
            settings(period, offset, duration, button_seed()),
            RecordingIndicator::default(),
        )
        .unwrap()
    }

    fn run(tx: &mut Transmitter<RecordingIndicator>, ether: &mut Ether, from: u64, to: u64) {
        for now in from..=to {
            tx.step(now, ether);
        }
    }

    #[test]
    fn boots_idle_and_indicates_it() {
        let tx = boot(1000, 10, 10);
        assert_eq!(tx.state(), TransmitterState::Idle);
        assert_eq!(tx.led_level(), Level::Low);
        assert_eq!(tx.indicator().seen, vec![(NodeId(0), Indication::Idle)]);
    }

    #[test]
    fn walks_through_every_state() {
        let mut tx = boot(1000, 10, 10);
        let mut ether = Ether::new();
        tx.press(0).unwrap();

        run(&mut tx, &mut ether, 1, 1);
        assert_eq!(tx.state(), TransmitterState::OffsetWait);
        assert_eq!(tx.seeded_at(), Some(1));

        run(&mut tx, &mut ether, 2, 1 + 10 * TICK);
        assert_eq!(tx.state(), TransmitterState::PulseHigh);

        run(&mut tx, &mut ether, 2 + 10 * TICK, 1 + 20 * TICK);
        assert_eq!(tx.state(), TransmitterState::PulseLowWait);

        run(&mut tx, &mut ether, 2 + 20 * TICK, 1 + 1000 * TICK);
        assert_eq!(tx.state(), TransmitterState::OffsetWait);
    }

    #[test]
    fn beacon_goes_out_once_per_period() {
        let mut tx = boot(1000, 10, 10);
        let mut ether = Ether::new();
        tx.press(0).unwrap();

        run(&mut tx, &mut ether, 1, 1 + 3000 * TICK + 4000);
        assert_eq!(ether.emitted(), 3);
        assert_eq!(tx.stats().sent, 3);
        assert_eq!(tx.stats().ignored_triggers, 0);
    }

    #[test]
    fn later_presses_do_not_restart_the_cycle() {
        let mut tx = boot(1000, 10, 10);
        let mut ether = Ether::new();
        tx.press(0).unwrap();
        run(&mut tx, &mut ether, 1, 15 * TICK);
        tx.release(0).unwrap();

        // pressed again while T0 is stopped and the pin is high
        tx.press(0).unwrap();
        run(&mut tx, &mut ether, 15 * TICK + 1, 2100 * TICK);

        let rises: Vec<u64> = tx
            .node()
            .edges()
            .iter()
            .filter(|e| e.level.is_high())
            .map(|e| e.cycle)
            .collect();
        assert_eq!(rises, vec![1 + 10 * TICK, 1 + 1010 * TICK, 1 + 2010 * TICK]);
    }

    #[test]
    fn press_sets_payload_to_button_mask_and_sent_is_indicated() {
        let mut tx = boot(1000, 10, 10);
        let mut ether = Ether::new();
        tx.press(0).unwrap();
        run(&mut tx, &mut ether, 1, 1 + 1000 * TICK + 4000);

        assert_eq!(tx.node().peripherals().radio.payload(), 0b0001);
        assert!(tx
            .indicator()
            .seen
            .contains(&(NodeId(0), Indication::Sent { payload: 1 })));
    }

    #[test]
    fn sleeping_cpu_keeps_the_pulse_and_skips_indications() {
        let mut tx = boot(1000, 10, 10);
        let mut ether = Ether::new();
        tx.press(0).unwrap();
        tx.sleep();
        run(&mut tx, &mut ether, 1, 1 + 2000 * TICK + 4000);

        assert_eq!(tx.stats().sent, 2);
        assert_eq!(tx.indicator().seen.len(), 1, "only the boot indication");
        assert_eq!(tx.node().edges().len(), 6);

        tx.wake();
        assert_eq!(tx.cpu(), Cpu::Awake);
    }

    #[test]
    fn lf_clock_seed_starts_without_a_press() {
        let mut s = settings(1000, 10, 10, Seed::LfClockStarted);
        s.clock.lf_startup_us = 100;
        let mut tx = Transmitter::boot(NodeId(0), s, RecordingIndicator::default()).unwrap();
        let mut ether = Ether::new();

        let lf = 100 * TICK;
        run(&mut tx, &mut ether, 1, lf + 20 * TICK + 2);
        let seeded = tx.seeded_at().unwrap();
        assert_eq!(seeded, lf);
        assert_eq!(tx.node().edges()[0].cycle, seeded + 10 * TICK);
        assert!(tx.press(0).is_err(), "no button configured");
    }

    #[test]
    fn malformed_timing_fails_boot() {
        let mut s = settings(1000, 10, 10, button_seed());
        s.pulse.timing = PulseTiming::new(100, 10, 10).unwrap();
        assert!(matches!(
            Transmitter::boot(NodeId(0), s, RecordingIndicator::default()),
            Err(SyncError::Timing(_))
        ));

        let mut s = settings(1000, 10, 10, button_seed());
        s.pulse.bit_width = BitWidth::B8;
        assert!(matches!(
            Transmitter::boot(NodeId(0), s, RecordingIndicator::default()),
            Err(SyncError::Timing(_))
        ));
    }

    #[test]
    fn missing_crystal_fails_boot() {
        let mut s = settings(1000, 10, 10, button_seed());
        s.clock.hf_crystal_fitted = false;
        assert!(matches!(
            Transmitter::boot(NodeId(0), s, RecordingIndicator::default()),
            Err(SyncError::Clock(_))
        ));
    }
}
