/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pulse-cycle arithmetic.
//!
//! ```text
//! 0        offset          offset+duration               period
//! ├─ idle ──┼──── high ─────┼────────── low ──────────────┤
//! ```
//!
//! The relation `offset + duration <= period` is checked when a
//! [`PulseTiming`] is built; a malformed triple never reaches the hardware.
//! All values are counter ticks (`2^prescaler` HF cycles each).

use std::fmt;

use crate::clock::CYCLES_PER_US;
use crate::timer::BitWidth;

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    /// period, offset or duration is zero.
    Zero { field: &'static str },

    /// The high phase would run past the period end.
    PhaseOverrun {
        offset: u32,
        duration: u32,
        period: u32,
    },

    /// A rung target does not fit in the counter.
    ExceedsCounter { value: u32, bits: u32 },

    /// The beacon would still be on the air when the next one is due.
    PeriodShorterThanBeacon { period_cycles: u64, beacon_cycles: u64 },

    /// Automatic offset needs the beacon latency to be a whole number of ticks.
    LatencyNotTickAligned { latency_cycles: u64, tick_cycles: u64 },
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingError::Zero { field } => write!(f, "{field} must be at least one tick"),
            TimingError::PhaseOverrun {
                offset,
                duration,
                period,
            } => write!(
                f,
                "offset {offset} + duration {duration} = {} exceeds period {period}",
                u64::from(*offset) + u64::from(*duration)
            ),
            TimingError::ExceedsCounter { value, bits } => {
                write!(f, "{value} ticks does not fit a {bits}-bit counter")
            }
            TimingError::PeriodShorterThanBeacon {
                period_cycles,
                beacon_cycles,
            } => write!(
                f,
                "period of {:.1}µs is shorter than the {:.1}µs beacon",
                *period_cycles as f64 / CYCLES_PER_US as f64,
                *beacon_cycles as f64 / CYCLES_PER_US as f64,
            ),
            TimingError::LatencyNotTickAligned {
                latency_cycles,
                tick_cycles,
            } => write!(
                f,
                "beacon latency of {latency_cycles} cycles is not a multiple of the {tick_cycles}-cycle tick"
            ),
        }
    }
}

impl std::error::Error for TimingError {}

// ── PulseTiming ───────────────────────────────────────────────────────────────

/// A validated `(period, offset, duration)` triple in counter ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    period: u32,
    offset: u32,
    duration: u32,
}

impl PulseTiming {
    /// # Errors
    /// * [`TimingError::Zero`] – any value is zero.
    /// * [`TimingError::PhaseOverrun`] – `offset + duration > period`.
    pub fn new(period: u32, offset: u32, duration: u32) -> Result<Self, TimingError> {
        for (field, value) in [("period", period), ("offset", offset), ("duration", duration)] {
            if value == 0 {
                return Err(TimingError::Zero { field });
            }
        }
        if u64::from(offset) + u64::from(duration) > u64::from(period) {
            return Err(TimingError::PhaseOverrun {
                offset,
                duration,
                period,
            });
        }
        Ok(Self {
            period,
            offset,
            duration,
        })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Target of the period-end rung on the duration counter, which starts
    /// counting when the pin goes high.
    pub fn period_end_rung(&self) -> u32 {
        self.period - self.offset
    }

    /// Length of the low phase.  Zero is allowed.
    pub fn low_phase(&self) -> u32 {
        self.period - self.offset - self.duration
    }

    /// Every rung must fit in `width`.
    pub fn check_width(&self, width: BitWidth) -> Result<(), TimingError> {
        let max = width.max_count();
        match [self.period, self.offset, self.duration]
            .into_iter()
            .find(|&v| v > max)
        {
            Some(value) => Err(TimingError::ExceedsCounter {
                value,
                bits: width.bits(),
            }),
            None => Ok(()),
        }
    }

    /// The transmitter fires one beacon per period; it must fit.
    pub fn check_beacon(&self, prescaler: u8, beacon_cycles: u64) -> Result<(), TimingError> {
        let period_cycles = ticks_to_cycles(self.period, prescaler);
        if period_cycles < beacon_cycles {
            return Err(TimingError::PeriodShorterThanBeacon {
                period_cycles,
                beacon_cycles,
            });
        }
        Ok(())
    }
}

// ── Unit helpers ──────────────────────────────────────────────────────────────

pub fn ticks_to_cycles(ticks: u32, prescaler: u8) -> u64 {
    u64::from(ticks) << prescaler
}

/// Offset that makes the transmitter's pulse rise on the very cycle the
/// receiver sees the beacon that was sent one period earlier.
pub fn aligned_offset(beacon_cycles: u64, prescaler: u8) -> Result<u32, TimingError> {
    let tick_cycles = 1u64 << prescaler;
    if beacon_cycles % tick_cycles != 0 {
        return Err(TimingError::LatencyNotTickAligned {
            latency_cycles: beacon_cycles,
            tick_cycles,
        });
    }
    u32::try_from(beacon_cycles / tick_cycles).map_err(|_| TimingError::ExceedsCounter {
        value: u32::MAX,
        bits: 32,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_is_valid() {
        let t = PulseTiming::new(1000, 10, 10).unwrap();
        assert_eq!(t.period_end_rung(), 990);
        assert_eq!(t.low_phase(), 980);
    }

    #[test]
    fn scenario_b_is_rejected() {
        assert_eq!(
            PulseTiming::new(1000, 10, 995),
            Err(TimingError::PhaseOverrun {
                offset: 10,
                duration: 995,
                period: 1000
            })
        );
    }

    #[test]
    fn zero_length_low_phase_is_allowed() {
        let t = PulseTiming::new(100, 40, 60).unwrap();
        assert_eq!(t.low_phase(), 0);
        assert_eq!(t.period_end_rung(), t.duration());
    }

    #[test]
    fn zero_fields_rejected() {
        assert_eq!(PulseTiming::new(0, 1, 1), Err(TimingError::Zero { field: "period" }));
        assert_eq!(PulseTiming::new(10, 0, 1), Err(TimingError::Zero { field: "offset" }));
        assert_eq!(PulseTiming::new(10, 1, 0), Err(TimingError::Zero { field: "duration" }));
    }

    #[test]
    fn overrun_near_u32_max_does_not_wrap() {
        let err = PulseTiming::new(u32::MAX, u32::MAX, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "offset 4294967295 + duration 1 = 4294967296 exceeds period 4294967295"
        );
    }

    #[test]
    fn width_check() {
        let t = PulseTiming::new(70_000, 10, 10).unwrap();
        assert!(t.check_width(BitWidth::B32).is_ok());
        assert_eq!(
            t.check_width(BitWidth::B16),
            Err(TimingError::ExceedsCounter {
                value: 70_000,
                bits: 16
            })
        );
    }

    #[test]
    fn beacon_must_fit_period() {
        let t = PulseTiming::new(200, 10, 10).unwrap();
        // 200 ticks at 1 MHz = 3200 cycles < 212 µs beacon
        assert!(t.check_beacon(4, 212 * 16).is_err());
        assert!(t.check_beacon(4, 200 * 16).is_ok());
    }

    #[test]
    fn aligned_offset_in_ticks() {
        assert_eq!(aligned_offset(212 * 16, 4), Ok(212));
        assert_eq!(aligned_offset(212 * 16, 0), Ok(3392));
        assert!(matches!(
            aligned_offset(212 * 16, 9),
            Err(TimingError::LatencyNotTickAligned { .. })
        ));
    }

    #[test]
    fn error_messages_mention_values() {
        let msg = PulseTiming::new(1000, 10, 995).unwrap_err().to_string();
        assert!(msg.contains("1005"), "{msg}");
    }
}
