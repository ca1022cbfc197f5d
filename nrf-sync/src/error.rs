/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Top-level configuration error for bringing up a node.
//!
//! Every peripheral reports its own structured error; [`SyncError`] wraps
//! them so an orchestrator's `boot` has a single failure type.  All of these
//! are configuration-time fatal: a node that fails to boot never runs.

use thiserror::Error;

use crate::board::Board;
use crate::clock::ClockError;
use crate::fabric::FabricError;
use crate::gpio::GpioError;
use crate::radio::RadioError;
use crate::timer::TimerError;
use crate::timing::TimingError;

/// Which kind of board resource a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Led,
    Button,
}

impl std::fmt::Display for PinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinKind::Led => write!(f, "LED"),
            PinKind::Button => write!(f, "button"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("clock: {0}")]
    Clock(#[from] ClockError),

    #[error("timer: {0}")]
    Timer(#[from] TimerError),

    #[error("gpio: {0}")]
    Gpio(#[from] GpioError),

    #[error("radio: {0}")]
    Radio(#[from] RadioError),

    #[error("fabric: {0}")]
    Fabric(#[from] FabricError),

    #[error("pulse timing: {0}")]
    Timing(#[from] TimingError),

    #[error("{board} has no {kind} {index}")]
    BoardPin {
        board: Board,
        kind: PinKind,
        index: usize,
    },
}
