/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use thiserror::Error;

use crate::handle::NodeId;

/// Configuration errors raised by [`Timer`](super::Timer).
///
/// All of them happen before the run loop starts; a configured counter has
/// no runtime failure mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("TIMER{timer} is not configured")]
    NotConfigured { timer: u8 },

    #[error("TIMER{timer} on {node} cannot use the HF clock of {clock}")]
    ForeignTimebase {
        timer: u8,
        node: NodeId,
        clock: NodeId,
    },

    #[error("TIMER{timer} must be stopped before it is reconfigured")]
    Running { timer: u8 },

    #[error("TIMER{timer} prescaler {prescaler} is out of range (0..={max})", max = super::MAX_PRESCALER)]
    PrescalerOutOfRange { timer: u8, prescaler: u8 },

    #[error("TIMER{timer} has no compare channel {channel} ({available} available)")]
    NoSuchChannel {
        timer: u8,
        channel: u8,
        available: usize,
    },

    #[error("TIMER{timer} channel {channel}: target {target} does not fit in {bits} bits")]
    TargetTooWide {
        timer: u8,
        channel: u8,
        target: u32,
        bits: u32,
    },
}
