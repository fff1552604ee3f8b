// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use crc::{Algorithm, Crc};

/// CRC-8 used by the AGS10 on every 5-byte frame.
/// Polynomial: 0x31
/// Initial Value: 0xFF
/// Input/Output Reflected: false
/// Final XOR: 0x00
/// Check Value: 0xF7 (for "123456789")
pub const AGS10_CRC: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

const CRC_COMPUTER: Crc<u8> = Crc::<u8>::new(&AGS10_CRC);

/// Calculates the CRC-8 of `data`.
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    CRC_COMPUTER.checksum(data)
}

/// Checks a sensor frame: CRC of the first four bytes against the fifth.
///
/// On mismatch returns `(expected, calculated)`, where `expected` is the
/// byte the sensor sent.
pub fn verify_frame(frame: &[u8; 5]) -> Result<(), (u8, u8)> {
    let calculated = crc8(&frame[..4]);
    if calculated == frame[4] {
        Ok(())
    } else {
        Err((frame[4], calculated))
    }
}
