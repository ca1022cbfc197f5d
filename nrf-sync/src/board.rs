/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Board pin mapping: physical pins and the development kits' LED / button
//! assignments.

use std::fmt;

use serde::Deserialize;

/// A physical GPIO pin (`P<port>.<number>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Pin {
    port: u8,
    number: u8,
}

impl Pin {
    /// Returns `None` for pins that do not exist (P0 has 32 pins, P1 has 16).
    pub fn new(port: u8, number: u8) -> Option<Self> {
        let valid = match port {
            0 => number < 32,
            1 => number < 16,
            _ => false,
        };
        valid.then_some(Self { port, number })
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}.{:02}", self.port, self.number)
    }
}

/// Supported development kits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    /// nRF52840 DK.
    #[default]
    Pca10056,
    /// nRF52832 DK.
    Pca10040,
}

impl Board {
    fn led_numbers(self) -> [u8; 4] {
        match self {
            Board::Pca10056 => [13, 14, 15, 16],
            Board::Pca10040 => [17, 18, 19, 20],
        }
    }

    fn button_numbers(self) -> [u8; 4] {
        match self {
            Board::Pca10056 => [11, 12, 24, 25],
            Board::Pca10040 => [13, 14, 15, 16],
        }
    }

    /// Pin driving LED `index` (0-based), or `None` if the board has no such LED.
    pub fn led(self, index: usize) -> Option<Pin> {
        self.led_numbers()
            .get(index)
            .and_then(|&n| Pin::new(0, n))
    }

    /// Pin wired to button `index` (0-based).
    pub fn button(self, index: usize) -> Option<Pin> {
        self.button_numbers()
            .get(index)
            .and_then(|&n| Pin::new(0, n))
    }

    pub fn button_count(self) -> usize {
        self.button_numbers().len()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Board::Pca10056 => write!(f, "PCA10056"),
            Board::Pca10040 => write!(f, "PCA10040"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_range_per_port() {
        assert!(Pin::new(0, 31).is_some());
        assert!(Pin::new(0, 32).is_none());
        assert!(Pin::new(1, 15).is_some());
        assert!(Pin::new(1, 16).is_none());
        assert!(Pin::new(2, 0).is_none());
    }

    #[test]
    fn pin_display() {
        assert_eq!(Pin::new(0, 7).unwrap().to_string(), "P0.07");
        assert_eq!(Pin::new(1, 12).unwrap().to_string(), "P1.12");
    }

    #[test]
    fn dk_mappings() {
        assert_eq!(Board::Pca10056.led(0), Pin::new(0, 13));
        assert_eq!(Board::Pca10056.button(3), Pin::new(0, 25));
        assert_eq!(Board::Pca10040.led(3), Pin::new(0, 20));
        assert_eq!(Board::Pca10040.led(4), None);
    }
}
