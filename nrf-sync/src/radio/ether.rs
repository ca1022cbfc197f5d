/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The shared air medium between the two nodes.
//!
//! A transmitting radio puts a [`Transmission`] on the ether when its frame
//! starts; a listening radio picks it up on the cycle the frame ends.  An
//! optional [`FaultPlan`] corrupts or drops frames to exercise the receiver's
//! silent-drop path.

use tracing::trace;

use super::packet::Frame;
use crate::handle::NodeId;

/// Deterministic fault injection applied to every emitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPlan {
    #[default]
    None,
    /// Flip a payload bit in every `n`th frame (1-based).
    CorruptEvery(u64),
    /// Flip a payload bit in the next `n` frames.
    CorruptNext(u64),
    /// Lose every `n`th frame entirely.
    DropEvery(u64),
}

/// One frame in flight.
#[derive(Debug, Clone)]
pub struct Transmission {
    pub from: NodeId,
    pub frequency: u8,
    pub frame: Frame,
    /// Cycle the preamble starts.
    pub start: u64,
    /// Cycle the last CRC bit ends.
    pub end: u64,
}

#[derive(Debug, Default)]
pub struct Ether {
    in_flight: Vec<Transmission>,
    faults: FaultPlan,
    emitted: u64,
    corrupted: u64,
    dropped: u64,
}

impl Ether {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.faults = faults;
    }

    /// Frames put on the air so far (including dropped ones).
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn corrupted(&self) -> u64 {
        self.corrupted
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub(crate) fn emit(&mut self, mut tx: Transmission) {
        self.emitted += 1;
        let n = self.emitted;

        match &mut self.faults {
            FaultPlan::None => {}
            FaultPlan::CorruptEvery(every) => {
                if *every > 0 && n % *every == 0 {
                    tx.frame.corrupt();
                    self.corrupted += 1;
                }
            }
            FaultPlan::CorruptNext(left) => {
                if *left > 0 {
                    *left -= 1;
                    tx.frame.corrupt();
                    self.corrupted += 1;
                }
            }
            FaultPlan::DropEvery(every) => {
                if *every > 0 && n % *every == 0 {
                    self.dropped += 1;
                    trace!(frame = n, "frame lost on air");
                    return;
                }
            }
        }

        self.in_flight.push(tx);
    }

    /// Frames on `frequency` whose last bit ends on cycle `now`.
    pub(crate) fn landing(&self, frequency: u8, now: u64) -> impl Iterator<Item = &Transmission> {
        self.in_flight
            .iter()
            .filter(move |t| t.frequency == frequency && t.end == now)
    }

    /// Forget frames that finished before `now`.
    pub(crate) fn prune(&mut self, now: u64) {
        self.in_flight.retain(|t| t.end >= now);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(end: u64) -> Transmission {
        Transmission {
            from: NodeId(0),
            frequency: 7,
            frame: Frame {
                address: [0xF0, 1, 2, 3, 4],
                payload: [0x10],
                crc: [0, 0],
            },
            start: 0,
            end,
        }
    }

    #[test]
    fn corrupt_every_nth() {
        let mut ether = Ether::with_faults(FaultPlan::CorruptEvery(2));
        ether.emit(tx(5));
        ether.emit(tx(5));
        let payloads: Vec<u8> = ether.landing(7, 5).map(|t| t.frame.payload[0]).collect();
        assert_eq!(payloads, vec![0x10, 0x11]);
        assert_eq!(ether.corrupted(), 1);
    }

    #[test]
    fn corrupt_next_runs_out() {
        let mut ether = Ether::with_faults(FaultPlan::CorruptNext(1));
        ether.emit(tx(5));
        ether.emit(tx(5));
        assert_eq!(ether.corrupted(), 1);
        assert_eq!(ether.faults, FaultPlan::CorruptNext(0));
    }

    #[test]
    fn drop_every_nth() {
        let mut ether = Ether::with_faults(FaultPlan::DropEvery(1));
        ether.emit(tx(5));
        assert_eq!(ether.in_flight(), 0);
        assert_eq!(ether.dropped(), 1);
        assert_eq!(ether.emitted(), 1);
    }

    #[test]
    fn landing_filters_by_frequency_and_end() {
        let mut ether = Ether::new();
        ether.emit(tx(5));
        assert_eq!(ether.landing(7, 4).count(), 0);
        assert_eq!(ether.landing(8, 5).count(), 0);
        assert_eq!(ether.landing(7, 5).count(), 1);

        ether.prune(6);
        assert_eq!(ether.in_flight(), 0);
    }
}
