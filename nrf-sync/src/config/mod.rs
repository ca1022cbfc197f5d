/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pair configuration loading.
//!
//! One YAML file describes both nodes; every key is optional and falls back
//! to the values the firmware was built with.
//!
//! ```yaml
//! board: pca10056
//! clock:
//!   hf_startup_us: 256
//!   lf_startup_us: 250000
//! timing:
//!   prescaler: 4          # 1 MHz tick
//!   bit_width: "32"
//!   period_ticks: 1000
//!   offset_ticks: auto    # or a tick count
//!   duration_ticks: 10
//! radio:
//!   frequency: 7          # 2407 MHz
//!   mode: nrf_1mbit
//!   fast_ramp_up: false
//!   base0: 0x14071997
//!   base1: 0x16081931
//!   prefixes: [0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7]
//!   logical_address: 0
//!   crc_poly: 0x11021
//!   crc_init: 0xFFFF
//! transmitter:
//!   led: 0
//!   gpiote_channel: 0
//!   seed: button          # or lf_clock_started
//!   button: 0
//! receiver:
//!   led: 0
//!   gpiote_channel: 0
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::board::Board;
use crate::clock::ClockConfig;
use crate::error::{PinKind, SyncError};
use crate::orchestrator::{PulseSettings, ReceiverSettings, Seed, TransmitterSettings};
use crate::radio::packet::LOGICAL_ADDRESSES;
use crate::radio::{AddressTable, CrcConfig, RadioConfig, RadioMode, Role};
use crate::timer::BitWidth;
use crate::timing::{aligned_offset, PulseTiming};

/// 1 MHz counter tick.
const DEFAULT_PRESCALER: u8 = 4;
const DEFAULT_PERIOD_TICKS: u32 = 1000;
const DEFAULT_DURATION_TICKS: u32 = 10;

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncConfigFile {
    board: Board,
    clock: ClockEntry,
    timing: TimingEntry,
    radio: RadioEntry,
    transmitter: TransmitterEntry,
    receiver: ReceiverEntry,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ClockEntry {
    hf_startup_us: u32,
    lf_startup_us: u32,
    hf_crystal_fitted: bool,
    lf_crystal_fitted: bool,
}

impl Default for ClockEntry {
    fn default() -> Self {
        let c = ClockConfig::default();
        Self {
            hf_startup_us: c.hf_startup_us,
            lf_startup_us: c.lf_startup_us,
            hf_crystal_fitted: c.hf_crystal_fitted,
            lf_crystal_fitted: c.lf_crystal_fitted,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OffsetKeyword {
    Auto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum OffsetEntry {
    Ticks(u32),
    Keyword(OffsetKeyword),
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TimingEntry {
    prescaler: u8,
    bit_width: BitWidth,
    period_ticks: u32,
    offset_ticks: OffsetEntry,
    duration_ticks: u32,
}

impl Default for TimingEntry {
    fn default() -> Self {
        Self {
            prescaler: DEFAULT_PRESCALER,
            bit_width: BitWidth::default(),
            period_ticks: DEFAULT_PERIOD_TICKS,
            offset_ticks: OffsetEntry::Keyword(OffsetKeyword::Auto),
            duration_ticks: DEFAULT_DURATION_TICKS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RadioEntry {
    frequency: u8,
    mode: RadioMode,
    fast_ramp_up: bool,
    base0: u32,
    base1: u32,
    prefixes: Vec<u8>,
    logical_address: u8,
    crc_poly: u32,
    crc_init: u16,
}

impl Default for RadioEntry {
    fn default() -> Self {
        let r = RadioConfig::new(Role::Transmitter);
        Self {
            frequency: r.frequency,
            mode: r.mode,
            fast_ramp_up: r.fast_ramp_up,
            base0: r.addresses.base0,
            base1: r.addresses.base1,
            prefixes: r.addresses.prefixes.to_vec(),
            logical_address: r.logical_address,
            crc_poly: r.crc.poly,
            crc_init: r.crc.init,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SeedEntry {
    #[default]
    Button,
    LfClockStarted,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TransmitterEntry {
    led: usize,
    gpiote_channel: u8,
    seed: SeedEntry,
    button: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReceiverEntry {
    led: usize,
    gpiote_channel: u8,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Pulse offset as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Ticks(u32),
    /// Equal to the beacon latency, so both pulses rise together.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    Button,
    LfClockStarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitterSection {
    pub led: usize,
    pub gpiote_channel: u8,
    pub seed: SeedKind,
    pub button: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSection {
    pub led: usize,
    pub gpiote_channel: u8,
}

/// Everything needed to boot the transmitter/receiver pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub board: Board,
    pub clock: ClockConfig,
    pub prescaler: u8,
    pub bit_width: BitWidth,
    pub period_ticks: u32,
    pub offset: Offset,
    pub duration_ticks: u32,
    /// Shared link settings; each orchestrator applies its own role.
    pub radio: RadioConfig,
    pub transmitter: TransmitterSection,
    pub receiver: ReceiverSection,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            board: Board::default(),
            clock: ClockConfig::default(),
            prescaler: DEFAULT_PRESCALER,
            bit_width: BitWidth::default(),
            period_ticks: DEFAULT_PERIOD_TICKS,
            offset: Offset::Auto,
            duration_ticks: DEFAULT_DURATION_TICKS,
            radio: RadioConfig::new(Role::Transmitter),
            transmitter: TransmitterSection {
                led: 0,
                gpiote_channel: 0,
                seed: SeedKind::Button,
                button: 0,
            },
            receiver: ReceiverSection {
                led: 0,
                gpiote_channel: 0,
            },
        }
    }
}

impl SyncConfig {
    /// Parses `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or a value is out of range for its field.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading sync configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: SyncConfigFile =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;
        let config = Self::from_file(file)?;

        debug!(
            board = %config.board,
            prescaler = config.prescaler,
            bits = config.bit_width.bits(),
            period = config.period_ticks,
            offset = ?config.offset,
            duration = config.duration_ticks,
            frequency = config.radio.frequency,
            "sync configuration parsed"
        );
        Ok(config)
    }

    fn from_file(file: SyncConfigFile) -> Result<Self> {
        let prefixes: [u8; LOGICAL_ADDRESSES as usize] =
            file.radio.prefixes.as_slice().try_into().with_context(|| {
                format!(
                    "radio.prefixes needs exactly {LOGICAL_ADDRESSES} entries, got {}",
                    file.radio.prefixes.len()
                )
            })?;

        Ok(Self {
            board: file.board,
            clock: ClockConfig {
                hf_startup_us: file.clock.hf_startup_us,
                lf_startup_us: file.clock.lf_startup_us,
                hf_crystal_fitted: file.clock.hf_crystal_fitted,
                lf_crystal_fitted: file.clock.lf_crystal_fitted,
            },
            prescaler: file.timing.prescaler,
            bit_width: file.timing.bit_width,
            period_ticks: file.timing.period_ticks,
            offset: match file.timing.offset_ticks {
                OffsetEntry::Ticks(t) => Offset::Ticks(t),
                OffsetEntry::Keyword(OffsetKeyword::Auto) => Offset::Auto,
            },
            duration_ticks: file.timing.duration_ticks,
            radio: RadioConfig {
                role: Role::Transmitter,
                frequency: file.radio.frequency,
                mode: file.radio.mode,
                fast_ramp_up: file.radio.fast_ramp_up,
                addresses: AddressTable {
                    base0: file.radio.base0,
                    base1: file.radio.base1,
                    prefixes,
                },
                logical_address: file.radio.logical_address,
                crc: CrcConfig {
                    poly: file.radio.crc_poly,
                    init: file.radio.crc_init,
                },
            },
            transmitter: TransmitterSection {
                led: file.transmitter.led,
                gpiote_channel: file.transmitter.gpiote_channel,
                seed: match file.transmitter.seed {
                    SeedEntry::Button => SeedKind::Button,
                    SeedEntry::LfClockStarted => SeedKind::LfClockStarted,
                },
                button: file.transmitter.button,
            },
            receiver: ReceiverSection {
                led: file.receiver.led,
                gpiote_channel: file.receiver.gpiote_channel,
            },
        })
    }

    /// Resolve the offset and validate the pulse triple.
    pub fn pulse_settings(&self) -> Result<PulseSettings, SyncError> {
        let offset = match self.offset {
            Offset::Ticks(t) => t,
            Offset::Auto => aligned_offset(self.radio.beacon_latency_cycles(), self.prescaler)?,
        };
        Ok(PulseSettings {
            prescaler: self.prescaler,
            bit_width: self.bit_width,
            timing: PulseTiming::new(self.period_ticks, offset, self.duration_ticks)?,
        })
    }

    pub fn transmitter_settings(&self) -> Result<TransmitterSettings, SyncError> {
        let t = &self.transmitter;
        let seed = match t.seed {
            SeedKind::Button => Seed::Button {
                index: u8::try_from(t.button).map_err(|_| self.no_pin(PinKind::Button, t.button))?,
                pin: self
                    .board
                    .button(t.button)
                    .ok_or_else(|| self.no_pin(PinKind::Button, t.button))?,
            },
            SeedKind::LfClockStarted => Seed::LfClockStarted,
        };
        Ok(TransmitterSettings {
            clock: self.clock.clone(),
            pulse: self.pulse_settings()?,
            radio: self.radio.with_role(Role::Transmitter),
            led: self
                .board
                .led(t.led)
                .ok_or_else(|| self.no_pin(PinKind::Led, t.led))?,
            gpiote_channel: t.gpiote_channel,
            seed,
        })
    }

    pub fn receiver_settings(&self) -> Result<ReceiverSettings, SyncError> {
        let r = &self.receiver;
        Ok(ReceiverSettings {
            clock: self.clock.clone(),
            pulse: self.pulse_settings()?,
            radio: self.radio.with_role(Role::Receiver),
            led: self
                .board
                .led(r.led)
                .ok_or_else(|| self.no_pin(PinKind::Led, r.led))?,
            gpiote_channel: r.gpiote_channel,
        })
    }

    fn no_pin(&self, kind: PinKind, index: usize) -> SyncError {
        SyncError::BoardPin {
            board: self.board,
            kind,
            index,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pin;
    use crate::timing::TimingError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn empty_mapping_gives_firmware_defaults() {
        let cfg = SyncConfig::from_yaml_str("{}\n").unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.board, Board::Pca10056);
        assert_eq!(cfg.prescaler, 4);
        assert_eq!(cfg.offset, Offset::Auto);
        assert_eq!(cfg.radio.frequency, 7);
        assert_eq!(cfg.radio.addresses.base0, 0x1407_1997);
        assert_eq!(cfg.radio.crc.poly, 0x11021);
    }

    #[test]
    fn auto_offset_is_the_beacon_latency() {
        let pulse = SyncConfig::default().pulse_settings().unwrap();
        // 140 µs ramp-up + 72 µs on air at 1 MHz ticks
        assert_eq!(pulse.timing.offset(), 212);

        let fast = SyncConfig::from_yaml_str("radio:\n  fast_ramp_up: true\n  mode: nrf_2mbit\n").unwrap();
        assert_eq!(fast.pulse_settings().unwrap().timing.offset(), 80);
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
board: pca10040
clock:
  hf_startup_us: 400
  lf_crystal_fitted: false
timing:
  prescaler: 0
  bit_width: "16"
  period_ticks: 16000
  offset_ticks: 160
  duration_ticks: 160
radio:
  frequency: 80
  base0: 0xE7E7E7E7
  prefixes: [0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7]
  logical_address: 3
transmitter:
  led: 1
  gpiote_channel: 2
  seed: lf_clock_started
receiver:
  led: 3
  gpiote_channel: 5
"#;
        let f = yaml_tempfile(yaml);
        let cfg = SyncConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.board, Board::Pca10040);
        assert_eq!(cfg.clock.hf_startup_us, 400);
        assert!(!cfg.clock.lf_crystal_fitted);
        assert_eq!(cfg.bit_width, BitWidth::B16);
        assert_eq!(cfg.offset, Offset::Ticks(160));
        assert_eq!(cfg.radio.addresses.base0, 0xE7E7_E7E7);
        assert_eq!(cfg.radio.addresses.base1, 0x1608_1931);
        assert_eq!(cfg.radio.addresses.prefixes[3], 0xC3);

        let tx = cfg.transmitter_settings().unwrap();
        assert_eq!(tx.seed, Seed::LfClockStarted);
        assert_eq!(tx.led, Pin::new(0, 18).unwrap());
        assert_eq!(tx.gpiote_channel, 2);
        assert_eq!(tx.radio.role, Role::Transmitter);

        let rx = cfg.receiver_settings().unwrap();
        assert_eq!(rx.led, Pin::new(0, 20).unwrap());
        assert_eq!(rx.radio.role, Role::Receiver);
        assert_eq!(rx.radio.logical_address, 3);
    }

    #[test]
    fn button_seed_maps_to_board_pin() {
        let cfg = SyncConfig::from_yaml_str("transmitter:\n  button: 2\n").unwrap();
        let tx = cfg.transmitter_settings().unwrap();
        assert_eq!(
            tx.seed,
            Seed::Button {
                index: 2,
                pin: Pin::new(0, 24).unwrap()
            }
        );
    }

    #[test]
    fn overrunning_pulse_is_rejected() {
        let cfg = SyncConfig::from_yaml_str(
            "timing:\n  period_ticks: 1000\n  offset_ticks: 10\n  duration_ticks: 995\n",
        )
        .unwrap();
        assert!(matches!(
            cfg.transmitter_settings(),
            Err(SyncError::Timing(TimingError::PhaseOverrun { .. }))
        ));
    }

    #[test]
    fn overrun_at_counter_limit_reports_the_full_sum() {
        let cfg = SyncConfig::from_yaml_str(
            "timing:\n  period_ticks: 4294967295\n  offset_ticks: 4294967295\n  duration_ticks: 1\n",
        )
        .unwrap();
        let err = cfg.transmitter_settings().unwrap_err();
        assert_eq!(
            err.to_string(),
            "pulse timing: offset 4294967295 + duration 1 = 4294967296 exceeds period 4294967295"
        );
    }

    #[test]
    fn auto_offset_needs_tick_alignment() {
        let cfg = SyncConfig::from_yaml_str("timing:\n  prescaler: 9\n").unwrap();
        assert!(matches!(
            cfg.pulse_settings(),
            Err(SyncError::Timing(TimingError::LatencyNotTickAligned { .. }))
        ));
    }

    #[test]
    fn unknown_led_is_a_board_error() {
        let cfg = SyncConfig::from_yaml_str("receiver:\n  led: 7\n").unwrap();
        let err = cfg.receiver_settings().unwrap_err();
        assert_eq!(
            err,
            SyncError::BoardPin {
                board: Board::Pca10056,
                kind: PinKind::Led,
                index: 7
            }
        );
        assert_eq!(err.to_string(), "PCA10056 has no LED 7");
    }

    #[test]
    fn wrong_prefix_count_is_rejected() {
        assert!(SyncConfig::from_yaml_str("radio:\n  prefixes: [1, 2]\n").is_err());
    }

    #[test]
    fn unknown_keys_and_keywords_are_rejected() {
        assert!(SyncConfig::from_yaml_str("timing:\n  period: 1000\n").is_err());
        assert!(SyncConfig::from_yaml_str("timing:\n  offset_ticks: soon\n").is_err());
        assert!(SyncConfig::from_yaml_str("transmitter:\n  seed: timer\n").is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = SyncConfig::load_from_file(Path::new("/nonexistent/path/sync.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(SyncConfig::load_from_file(f.path()).is_err());
    }
}
