//! ATECC frame checksum
//!
//! The chip protects every frame with a 16-bit CRC using polynomial 0x8005.
//! It is *not* CRC-16/ARC or CRC-16/CCITT: the register starts at zero,
//! input bits are fed least-significant first, and the result is neither
//! reflected nor inverted.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

/// CRC polynomial
pub const POLYNOMIAL: u16 = 0x8005;

/// Calculate the ATECC checksum over `data`
///
/// # Algorithm
///
/// ```text
/// for each byte, for bit 0..8 (LSB first):
///     data_bit = (byte >> bit) & 1
///     crc_bit  = crc >> 15
///     crc    <<= 1
///     if data_bit != crc_bit: crc ^= 0x8005
/// ```
///
/// # Examples
///
/// ```
/// use atecc_core::checksum;
///
/// assert_eq!(checksum::crc16(b""), 0x0000);
/// assert_eq!(checksum::crc16(b"a"), 0x8317);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        for bit in 0..8 {
            let data_bit = (byte >> bit) & 1;
            let crc_bit = (crc >> 15) as u8;
            crc <<= 1;
            if data_bit != crc_bit {
                crc ^= POLYNOMIAL;
            }
        }
    }

    trace!(
        len = data.len(),
        crc = format!("0x{:04X}", crc),
        "Calculated checksum"
    );

    crc
}

/// Verify a frame whose last two bytes are its little-endian checksum
///
/// Returns `false` for frames too short to hold a checksum.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }

    let (body, crc) = frame.split_at(frame.len() - 2);
    crc16(body) == LittleEndian::read_u16(crc)
}
