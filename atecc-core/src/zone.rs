//! Memory zones and address computation

use std::fmt;

use crate::constants::{config, DATA_SLOT_COUNT};
use crate::error::{Error, Result};

/// Logical memory zone
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Zone {
    Config = 0x00,
    Otp = 0x01,
    Data = 0x02,
}

impl Zone {
    /// Size of the zone (or of the slot, for the data zone) in bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use atecc_core::Zone;
    ///
    /// assert_eq!(Zone::Config.size(0).unwrap(), 128);
    /// assert_eq!(Zone::Data.size(8).unwrap(), 416);
    /// assert!(Zone::Data.size(16).is_err());
    /// ```
    pub fn size(self, slot: u16) -> Result<usize> {
        match self {
            Self::Config => Ok(config::ZONE_SIZE),
            Self::Otp => Ok(config::OTP_ZONE_SIZE),
            Self::Data => match slot {
                0..=7 => Ok(36),
                8 => Ok(416),
                9..DATA_SLOT_COUNT => Ok(72),
                _ => Err(Error::InvalidSlot { zone: self, slot }),
            },
        }
    }

    /// Get zone name
    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Otp => "otp",
            Self::Data => "data",
        }
    }
}

impl From<Zone> for u8 {
    fn from(zone: Zone) -> u8 {
        zone as u8
    }
}

impl TryFrom<u8> for Zone {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Config),
            0x01 => Ok(Self::Otp),
            0x02 => Ok(Self::Data),
            _ => Err(Error::InvalidZone(value)),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compute the address parameter for a zone access
///
/// ```text
/// config/otp:  block << 3 | offset
/// data:        block << 8 | slot << 3 | offset
/// ```
///
/// `offset` is the word index within the block and is masked to 3 bits.
///
/// # Examples
///
/// ```
/// use atecc_core::zone::{address, Zone};
///
/// assert_eq!(address(Zone::Config, 0, 2, 5), 0x0015);
/// assert_eq!(address(Zone::Data, 9, 1, 1), 0x0149);
/// ```
pub fn address(zone: Zone, slot: u16, block: u8, offset: u8) -> u16 {
    let offset = u16::from(offset & 0x07);

    match zone {
        Zone::Config | Zone::Otp => (u16::from(block) << 3) | offset,
        Zone::Data => (slot << 3) | offset | (u16::from(block) << 8),
    }
}
