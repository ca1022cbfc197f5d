/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! nrf-sync – two boards pulsing a GPIO on the same cycle, kept in step by
//! a single-byte radio beacon and hardware event routing alone.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── handle.rs       – opaque event / task handles, node identity
//! ├── board.rs        – dev-kit LED / button pin maps
//! ├── clock.rs        – HF / LF oscillators, boot-time await primitive
//! ├── gpio.rs         – GPIOTE toggle outputs, debounced buttons
//! ├── timer/          – compare-channel counters (rungs + shortcuts)
//! ├── radio/          – beacon link, packet + CRC, shared air medium
//! ├── fabric/         – event → task interconnect (builder + slots)
//! ├── node.rs         – one board's peripherals stepped cycle by cycle
//! ├── timing.rs       – period / offset / duration arithmetic
//! ├── orchestrator/   – transmitter and receiver wiring
//! ├── config/         – YAML pair configuration
//! ├── error.rs        – boot-time error aggregate
//! └── sim.rs          – two-node run on a shared cycle counter
//! ```

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod fabric;
pub mod gpio;
pub mod handle;
pub mod node;
pub mod orchestrator;
pub mod radio;
pub mod sim;
pub mod timer;
pub mod timing;
