/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Radio beacon link.
//!
//! Half-duplex and role-asymmetric: a transmitter only sends, a receiver only
//! listens.  The link carries one byte per frame and exists purely to give
//! the receiver a timing edge.
//!
//! # Shortcuts
//! The radio chains its own states so the CPU never touches it after boot:
//!
//! | Role | Shortcuts | Effect |
//! |---|---|---|
//! | Transmitter | READY→START, END→DISABLE | one trigger = exactly one frame, then idle |
//! | Receiver | READY→START, END→START | listens forever, good frame or not |
//!
//! # Fabric visibility
//! Only one event leaves the radio: "frame verified good" ([`Radio::crc_ok_event`]).
//! A frame whose CRC does not match is counted and forgotten: no event, no
//! payload update.

pub mod ether;
pub mod packet;

pub use ether::{Ether, FaultPlan, Transmission};
pub use packet::{AddressTable, BeaconPacket, CrcConfig, Frame};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::clock::{Timebase, CYCLES_PER_US};
use crate::handle::{Event, EventHandle, NodeId, Task, TaskHandle};
use packet::{CrcEngine, ADDRESS_LEN, CRC_LEN, LOGICAL_ADDRESSES, PAYLOAD_LEN};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Highest frequency channel (2400 + 100 MHz).
pub const MAX_FREQUENCY: u8 = 100;

/// TXEN/RXEN → READY in the default ramp-up mode.
pub const RAMP_UP_US: u64 = 140;

/// TXEN/RXEN → READY in fast ramp-up mode.
pub const FAST_RAMP_UP_US: u64 = 40;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    #[error("frequency channel {0} is out of range (0..={MAX_FREQUENCY})")]
    FrequencyOutOfRange(u8),

    #[error("logical address {0} does not exist (0..{LOGICAL_ADDRESSES})")]
    NoSuchLogicalAddress(u8),

    #[error("CRC polynomial {0:#x} is not a valid 16-bit generator")]
    InvalidCrcPolynomial(u32),

    #[error("radio on {node} cannot use the HF clock of {clock}")]
    ForeignTimebase { node: NodeId, clock: NodeId },

    #[error("radio is not configured")]
    NotConfigured,

    #[error("radio must be disabled to {operation}")]
    NotDisabled { operation: &'static str },

    #[error("cannot {operation} on a radio configured as {role}")]
    WrongRole { operation: &'static str, role: Role },
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Which side of the link this radio is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Transmitter,
    Receiver,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Transmitter => write!(f, "transmitter"),
            Role::Receiver => write!(f, "receiver"),
        }
    }
}

/// On-air data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioMode {
    #[default]
    #[serde(rename = "nrf_1mbit")]
    Nrf1Mbit,
    #[serde(rename = "nrf_2mbit")]
    Nrf2Mbit,
}

impl RadioMode {
    fn bits_per_us(self) -> u64 {
        match self {
            RadioMode::Nrf1Mbit => 1,
            RadioMode::Nrf2Mbit => 2,
        }
    }

    fn preamble_bytes(self) -> u64 {
        match self {
            RadioMode::Nrf1Mbit => 1,
            RadioMode::Nrf2Mbit => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    pub role: Role,
    /// Channel `n` = 2400 + n MHz.
    pub frequency: u8,
    pub mode: RadioMode,
    pub fast_ramp_up: bool,
    pub addresses: AddressTable,
    /// Logical address used for TX (transmitter) or accepted on RX (receiver).
    pub logical_address: u8,
    pub crc: CrcConfig,
}

impl RadioConfig {
    /// Default link settings for `role`: channel 7 (2407 MHz), 1 Mbit,
    /// logical address 0, CRC-16 `0x11021` / `0xFFFF`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            frequency: 7,
            mode: RadioMode::Nrf1Mbit,
            fast_ramp_up: false,
            addresses: AddressTable::default(),
            logical_address: 0,
            crc: CrcConfig::default(),
        }
    }

    /// Same link settings, other role.
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    pub fn ramp_up_cycles(&self) -> u64 {
        let us = if self.fast_ramp_up {
            FAST_RAMP_UP_US
        } else {
            RAMP_UP_US
        };
        us * CYCLES_PER_US
    }

    /// Preamble + address + payload + CRC on the air.
    pub fn air_cycles(&self) -> u64 {
        let bytes = self.mode.preamble_bytes() + (ADDRESS_LEN + PAYLOAD_LEN + CRC_LEN) as u64;
        bytes * 8 * CYCLES_PER_US / self.mode.bits_per_us()
    }

    /// Cycles from a transmit trigger to the peer's frame-verified-good event.
    pub fn beacon_latency_cycles(&self) -> u64 {
        self.ramp_up_cycles() + self.air_cycles()
    }
}

// ── Link statistics ───────────────────────────────────────────────────────────

/// Bookkeeping counters the application may read between beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    pub sent: u64,
    pub verified: u64,
    /// Frames that failed the CRC check.
    pub dropped: u64,
    /// Transmit triggers that arrived while the link was busy.
    pub ignored_triggers: u64,
}

// ── Radio ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Tx,
    Rx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Disabled,
    RampUp { remaining: u64, direction: Direction },
    Tx { end: u64 },
    Rx { since: u64 },
}

#[derive(Debug)]
struct Setup {
    config: RadioConfig,
    address: [u8; ADDRESS_LEN],
    crc: CrcEngine,
}

#[derive(Debug)]
pub struct Radio {
    node: NodeId,
    setup: Option<Setup>,
    state: State,
    /// The payload buffer: read when a frame starts, written by a good frame.
    packet: u8,
    stats: LinkStats,
}

impl Radio {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            setup: None,
            state: State::Disabled,
            packet: 0,
            stats: LinkStats::default(),
        }
    }

    /// Apply `config`.  The radio must be disabled.
    ///
    /// # Errors
    /// A timebase started on another node, out-of-range frequency or logical
    /// address, or an invalid CRC polynomial.
    pub fn configure(&mut self, timebase: &Timebase, config: RadioConfig) -> Result<(), RadioError> {
        if timebase.node() != self.node {
            return Err(RadioError::ForeignTimebase {
                node: self.node,
                clock: timebase.node(),
            });
        }
        if self.state != State::Disabled {
            return Err(RadioError::NotDisabled {
                operation: "configure",
            });
        }
        if config.frequency > MAX_FREQUENCY {
            return Err(RadioError::FrequencyOutOfRange(config.frequency));
        }
        let address = config.addresses.address(config.logical_address)?;
        let crc = CrcEngine::new(config.crc)?;

        info!(
            node = %self.node,
            role = %config.role,
            frequency_mhz = 2400 + u32::from(config.frequency),
            mode = ?config.mode,
            address = ?address,
            "radio configured"
        );

        self.setup = Some(Setup {
            config,
            address,
            crc,
        });
        Ok(())
    }

    /// Enter continuous listening.  Calling it while already listening is a
    /// no-op.
    pub fn arm_receive(&mut self) -> Result<(), RadioError> {
        let setup = self.setup.as_ref().ok_or(RadioError::NotConfigured)?;
        if setup.config.role != Role::Receiver {
            return Err(RadioError::WrongRole {
                operation: "arm receive",
                role: setup.config.role,
            });
        }
        match self.state {
            State::Disabled => {
                self.state = State::RampUp {
                    remaining: setup.config.ramp_up_cycles(),
                    direction: Direction::Rx,
                };
                debug!(node = %self.node, "receiver armed");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Send the payload buffer once.
    ///
    /// A trigger while a frame is still going out is ignored (and counted).
    pub fn trigger_transmit(&mut self) -> Result<(), RadioError> {
        let setup = self.setup.as_ref().ok_or(RadioError::NotConfigured)?;
        if setup.config.role != Role::Transmitter {
            return Err(RadioError::WrongRole {
                operation: "transmit",
                role: setup.config.role,
            });
        }
        self.begin_transmit();
        Ok(())
    }

    pub fn set_payload(&mut self, payload: u8) {
        self.packet = payload;
    }

    pub fn payload(&self) -> u8 {
        self.packet
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn config(&self) -> Option<&RadioConfig> {
        self.setup.as_ref().map(|s| &s.config)
    }

    pub fn role(&self) -> Option<Role> {
        self.config().map(|c| c.role)
    }

    /// `true` while waiting for (or receiving) a frame.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Rx { .. })
    }

    pub fn is_disabled(&self) -> bool {
        self.state == State::Disabled
    }

    pub fn crc_ok_event(&self) -> EventHandle {
        EventHandle::new(self.node, Event::RadioCrcOk)
    }

    pub fn transmit_task(&self) -> TaskHandle {
        TaskHandle::new(self.node, Task::RadioTransmit)
    }

    // ── Hardware side ─────────────────────────────────────────────────────────

    pub(crate) fn begin_transmit(&mut self) {
        let Some(setup) = &self.setup else { return };
        if setup.config.role != Role::Transmitter {
            return;
        }
        if self.state == State::Disabled {
            self.state = State::RampUp {
                remaining: setup.config.ramp_up_cycles(),
                direction: Direction::Tx,
            };
        } else {
            self.stats.ignored_triggers += 1;
            trace!(node = %self.node, "transmit trigger ignored: link busy");
        }
    }

    /// Advance one cycle.
    pub(crate) fn step(&mut self, now: u64, ether: &mut Ether, events: &mut Vec<Event>) {
        let Some(setup) = &self.setup else { return };

        match self.state {
            State::Disabled => {}

            State::RampUp {
                remaining,
                direction,
            } => {
                if remaining > 1 {
                    self.state = State::RampUp {
                        remaining: remaining - 1,
                        direction,
                    };
                    return;
                }
                // READY, shortcut to START
                self.state = match direction {
                    Direction::Tx => {
                        let frame = BeaconPacket {
                            payload: self.packet,
                        }
                        .encode(setup.address, &setup.crc);
                        let end = now + setup.config.air_cycles();
                        ether.emit(Transmission {
                            from: self.node,
                            frequency: setup.config.frequency,
                            frame,
                            start: now,
                            end,
                        });
                        State::Tx { end }
                    }
                    Direction::Rx => State::Rx { since: now },
                };
            }

            State::Tx { end } => {
                if now >= end {
                    // END, shortcut to DISABLE
                    self.stats.sent += 1;
                    self.state = State::Disabled;
                    trace!(node = %self.node, payload = self.packet, "beacon sent");
                }
            }

            State::Rx { since } => {
                let outcome = ether
                    .landing(setup.config.frequency, now)
                    .find(|t| t.from != self.node && t.start >= since && t.frame.address == setup.address)
                    .map(|t| t.frame.verify(&setup.crc));

                if let Some(result) = outcome {
                    match result {
                        Some(packet) => {
                            self.packet = packet.payload;
                            self.stats.verified += 1;
                            events.push(Event::RadioCrcOk);
                        }
                        None => {
                            self.stats.dropped += 1;
                            trace!(node = %self.node, "frame dropped: CRC mismatch");
                        }
                    }
                    // END, shortcut back to START
                    self.state = State::Rx { since: now };
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
