/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Beacon wire format.
//!
//! ```text
//! ┌──────────┬─────────────────────────┬─────────┬───────────┐
//! │ preamble │ address (prefix + base) │ payload │   CRC-16  │
//! │  1–2 B   │           5 B           │   1 B   │  2 B, MSB │
//! └──────────┴─────────────────────────┴─────────┴───────────┘
//! ```
//!
//! The CRC covers the five address bytes and the payload.  Both roles must
//! share the address table and the CRC polynomial / initial value, otherwise
//! no frame is ever accepted.

use std::sync::{Mutex, PoisonError};

use crc::{Algorithm, Crc, CRC_16_IBM_3740};

use super::RadioError;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Payload length in bytes.
pub const PAYLOAD_LEN: usize = 1;

/// Error-detection code length in bytes.
pub const CRC_LEN: usize = 2;

/// Base address length in bytes (BALEN).
pub const BASE_ADDRESS_LEN: usize = 4;

/// Full on-air address length: one prefix byte plus the base.
pub const ADDRESS_LEN: usize = BASE_ADDRESS_LEN + 1;

/// Number of logical addresses (one per prefix byte).
pub const LOGICAL_ADDRESSES: u8 = 8;

// ── Address table ─────────────────────────────────────────────────────────────

/// Base addresses and prefix bytes.
///
/// Logical address 0 is `prefixes[0]` + `base0`; 1–7 use `base1` with their
/// own prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTable {
    pub base0: u32,
    pub base1: u32,
    pub prefixes: [u8; LOGICAL_ADDRESSES as usize],
}

impl Default for AddressTable {
    fn default() -> Self {
        Self {
            base0: 0x1407_1997,
            base1: 0x1608_1931,
            prefixes: [0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7],
        }
    }
}

impl AddressTable {
    /// On-air bytes of `logical` address: prefix, then the base MSB first.
    pub fn address(&self, logical: u8) -> Result<[u8; ADDRESS_LEN], RadioError> {
        let prefix = *self
            .prefixes
            .get(logical as usize)
            .ok_or(RadioError::NoSuchLogicalAddress(logical))?;
        let base = if logical == 0 { self.base0 } else { self.base1 };

        let mut out = [0u8; ADDRESS_LEN];
        out[0] = prefix;
        out[1..].copy_from_slice(&base.to_be_bytes());
        Ok(out)
    }
}

// ── Error-detection code ──────────────────────────────────────────────────────

/// CRC settings as written to the radio: the polynomial in 17-bit form
/// (`0x11021` = x^16 + x^12 + x^5 + 1, the x^16 term implicit) and the
/// initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcConfig {
    pub poly: u32,
    pub init: u16,
}

impl Default for CrcConfig {
    fn default() -> Self {
        Self {
            poly: 0x1_1021,
            init: 0xFFFF,
        }
    }
}

/// CRC-16 engine built from a [`CrcConfig`].
pub(crate) struct CrcEngine {
    crc: Crc<u16>,
}

impl std::fmt::Debug for CrcEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcEngine")
            .field("poly", &self.crc.algorithm.poly)
            .field("init", &self.crc.algorithm.init)
            .finish()
    }
}

/// Non-default generators built so far.  `Crc` wants a `'static` table
/// definition, so each distinct (poly, init) pair is leaked exactly once and
/// shared by every later radio configuration.
static CUSTOM_ALGORITHMS: Mutex<Vec<&'static Algorithm<u16>>> = Mutex::new(Vec::new());

fn custom_algorithm(poly: u16, init: u16) -> &'static Algorithm<u16> {
    let mut known = CUSTOM_ALGORITHMS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(algorithm) = known
        .iter()
        .copied()
        .find(|a| a.poly == poly && a.init == init)
    {
        return algorithm;
    }
    let algorithm: &'static Algorithm<u16> = Box::leak(Box::new(Algorithm {
        width: 16,
        poly,
        init,
        refin: false,
        refout: false,
        xorout: 0x0000,
        check: 0x0000,
        residue: 0x0000,
    }));
    known.push(algorithm);
    algorithm
}

impl CrcEngine {
    pub(crate) fn new(config: CrcConfig) -> Result<Self, RadioError> {
        // Bit 16 may carry the implicit x^16 term; anything above is invalid,
        // and a polynomial without the x^0 term detects nothing useful.
        if config.poly > 0x1_FFFF || config.poly & 1 == 0 {
            return Err(RadioError::InvalidCrcPolynomial(config.poly));
        }
        let poly = (config.poly & 0xFFFF) as u16;

        let algorithm = if poly == CRC_16_IBM_3740.poly && config.init == CRC_16_IBM_3740.init {
            &CRC_16_IBM_3740
        } else {
            custom_algorithm(poly, config.init)
        };

        Ok(Self {
            crc: Crc::<u16>::new(algorithm),
        })
    }

    pub(crate) fn checksum(&self, address: &[u8; ADDRESS_LEN], payload: &[u8; PAYLOAD_LEN]) -> u16 {
        let mut digest = self.crc.digest();
        digest.update(address);
        digest.update(payload);
        digest.finalize()
    }
}

// ── Packets & frames ──────────────────────────────────────────────────────────

/// The single-byte beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BeaconPacket {
    pub payload: u8,
}

/// A beacon as it travels over the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub address: [u8; ADDRESS_LEN],
    pub payload: [u8; PAYLOAD_LEN],
    pub crc: [u8; CRC_LEN],
}

impl BeaconPacket {
    pub(crate) fn encode(&self, address: [u8; ADDRESS_LEN], engine: &CrcEngine) -> Frame {
        let payload = [self.payload];
        let crc = engine.checksum(&address, &payload).to_be_bytes();
        Frame {
            address,
            payload,
            crc,
        }
    }
}

impl Frame {
    /// The packet, if the error-detection code matches.
    pub(crate) fn verify(&self, engine: &CrcEngine) -> Option<BeaconPacket> {
        let expected = engine.checksum(&self.address, &self.payload);
        (u16::from_be_bytes(self.crc) == expected).then_some(BeaconPacket {
            payload: self.payload[0],
        })
    }

    /// Flip one bit of the payload, leaving the CRC as sent.
    pub fn corrupt(&mut self) {
        self.payload[0] ^= 0x01;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CrcEngine {
        CrcEngine::new(CrcConfig::default()).unwrap()
    }

    #[test]
    fn default_crc_is_ccitt_false() {
        let e = engine();
        let mut d = e.crc.digest();
        d.update(b"123456789");
        assert_eq!(d.finalize(), 0x29B1);
    }

    #[test]
    fn custom_polynomial_builds() {
        let e = CrcEngine::new(CrcConfig {
            poly: 0x1_8005,
            init: 0x0000,
        })
        .unwrap();
        assert_eq!(e.crc.algorithm.poly, 0x8005);
    }

    #[test]
    fn custom_polynomial_is_built_once() {
        let config = CrcConfig {
            poly: 0x1_3D65,
            init: 0x1234,
        };
        let first = CrcEngine::new(config).unwrap();
        let second = CrcEngine::new(config).unwrap();
        assert!(std::ptr::eq(first.crc.algorithm, second.crc.algorithm));

        let other_init = CrcEngine::new(CrcConfig { init: 0x0000, ..config }).unwrap();
        assert!(!std::ptr::eq(first.crc.algorithm, other_init.crc.algorithm));
        assert_eq!(other_init.crc.algorithm.init, 0x0000);
    }

    #[test]
    fn invalid_polynomials_rejected() {
        for poly in [0x2_1021, 0x1_1020, 0] {
            let result = CrcEngine::new(CrcConfig { poly, init: 0xFFFF });
            assert!(
                matches!(result, Err(RadioError::InvalidCrcPolynomial(p)) if p == poly),
                "poly {poly:#x} should be rejected"
            );
        }
    }

    #[test]
    fn address_layout() {
        let table = AddressTable::default();
        assert_eq!(table.address(0).unwrap(), [0xF0, 0x14, 0x07, 0x19, 0x97]);
        assert_eq!(table.address(5).unwrap(), [0xF5, 0x16, 0x08, 0x19, 0x31]);
        assert!(table.address(8).is_err());
    }

    #[test]
    fn payload_survives_verified_round_trip() {
        let e = engine();
        let addr = AddressTable::default().address(0).unwrap();
        for payload in [0x00, 0x01, 0x5A, 0xFF] {
            let frame = BeaconPacket { payload }.encode(addr, &e);
            assert_eq!(frame.verify(&e), Some(BeaconPacket { payload }));
        }
    }

    #[test]
    fn corrupted_frame_fails_verification() {
        let e = engine();
        let addr = AddressTable::default().address(0).unwrap();
        let mut frame = BeaconPacket { payload: 0x03 }.encode(addr, &e);
        frame.corrupt();
        assert_eq!(frame.verify(&e), None);
    }

    #[test]
    fn mismatched_crc_init_never_verifies() {
        let tx = engine();
        let rx = CrcEngine::new(CrcConfig {
            poly: 0x1_1021,
            init: 0x0000,
        })
        .unwrap();
        let addr = AddressTable::default().address(0).unwrap();
        let frame = BeaconPacket { payload: 7 }.encode(addr, &tx);
        assert_eq!(frame.verify(&rx), None);
    }
}
