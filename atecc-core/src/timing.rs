//! Device types, clock dividers and command execution times
//!
//! The chip cannot be polled while it executes a command, so the host waits
//! for the typical execution time of the opcode before reading the
//! response. How long that is depends on the device and on the clock
//! divider configured in the ChipMode byte.

use std::fmt;
use std::time::Duration;

use crate::command::Opcode;
use crate::error::{Error, Result};

/// Physical device type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    #[default]
    Atecc608,
}

impl DeviceType {
    /// Revision byte identifying an ATECC608
    const REVISION_608: u8 = 0x60;

    /// Identify the device from the Info(revision) output
    ///
    /// # Examples
    ///
    /// ```
    /// use atecc_core::DeviceType;
    ///
    /// let device = DeviceType::from_revision(&[0x00, 0x00, 0x60, 0x03]).unwrap();
    /// assert_eq!(device, DeviceType::Atecc608);
    /// ```
    pub fn from_revision(revision: &[u8]) -> Result<Self> {
        match revision.get(2) {
            Some(&Self::REVISION_608) => Ok(Self::Atecc608),
            _ => Err(Error::UnknownDevice(revision.to_vec())),
        }
    }

    /// Get device name
    pub fn name(self) -> &'static str {
        match self {
            Self::Atecc608 => "ATECC608",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clock divider selected by ChipMode bits 3..7
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ClockDivider {
    /// Full speed
    #[default]
    M0 = 0x00,
    M1 = 0x05,
    M2 = 0x0D,
}

impl ClockDivider {
    /// Extract the clock divider from the ChipMode byte
    ///
    /// # Examples
    ///
    /// ```
    /// use atecc_core::ClockDivider;
    ///
    /// assert_eq!(ClockDivider::from_chip_mode(0x28).unwrap(), ClockDivider::M1);
    /// assert_eq!(ClockDivider::from_chip_mode(0x01).unwrap(), ClockDivider::M0);
    /// ```
    pub fn from_chip_mode(chip_mode: u8) -> Result<Self> {
        Self::try_from((chip_mode & 0xF8) >> 3)
    }
}

impl TryFrom<u8> for ClockDivider {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::M0),
            0x05 => Ok(Self::M1),
            0x0D => Ok(Self::M2),
            _ => Err(Error::UnknownClockDivider(value)),
        }
    }
}

impl fmt::Display for ClockDivider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::M0 => "M0",
            Self::M1 => "M1",
            Self::M2 => "M2",
        };
        f.write_str(name)
    }
}

/// Execution times in milliseconds, one table per clock divider
type ExecutionTable = [(Opcode, u64); 22];

static ATECC608_M0: ExecutionTable = [
    (Opcode::Aes, 27),
    (Opcode::CheckMac, 40),
    (Opcode::Counter, 25),
    (Opcode::DeriveKey, 50),
    (Opcode::Ecdh, 75),
    (Opcode::GenDig, 25),
    (Opcode::GenKey, 115),
    (Opcode::Info, 5),
    (Opcode::Kdf, 165),
    (Opcode::Lock, 35),
    (Opcode::Mac, 55),
    (Opcode::Nonce, 20),
    (Opcode::PrivWrite, 50),
    (Opcode::Random, 23),
    (Opcode::Read, 5),
    (Opcode::SecureBoot, 80),
    (Opcode::SelfTest, 250),
    (Opcode::Sha, 36),
    (Opcode::Sign, 115),
    (Opcode::UpdateExtra, 10),
    (Opcode::Verify, 105),
    (Opcode::Write, 45),
];

static ATECC608_M1: ExecutionTable = [
    (Opcode::Aes, 27),
    (Opcode::CheckMac, 40),
    (Opcode::Counter, 25),
    (Opcode::DeriveKey, 50),
    (Opcode::Ecdh, 172),
    (Opcode::GenDig, 35),
    (Opcode::GenKey, 215),
    (Opcode::Info, 5),
    (Opcode::Kdf, 165),
    (Opcode::Lock, 35),
    (Opcode::Mac, 55),
    (Opcode::Nonce, 20),
    (Opcode::PrivWrite, 50),
    (Opcode::Random, 23),
    (Opcode::Read, 5),
    (Opcode::SecureBoot, 160),
    (Opcode::SelfTest, 625),
    (Opcode::Sha, 42),
    (Opcode::Sign, 220),
    (Opcode::UpdateExtra, 10),
    (Opcode::Verify, 295),
    (Opcode::Write, 45),
];

static ATECC608_M2: ExecutionTable = [
    (Opcode::Aes, 27),
    (Opcode::CheckMac, 40),
    (Opcode::Counter, 25),
    (Opcode::DeriveKey, 50),
    (Opcode::Ecdh, 531),
    (Opcode::GenDig, 35),
    (Opcode::GenKey, 653),
    (Opcode::Info, 5),
    (Opcode::Kdf, 165),
    (Opcode::Lock, 35),
    (Opcode::Mac, 55),
    (Opcode::Nonce, 20),
    (Opcode::PrivWrite, 50),
    (Opcode::Random, 23),
    (Opcode::Read, 5),
    (Opcode::SecureBoot, 480),
    (Opcode::SelfTest, 2324),
    (Opcode::Sha, 75),
    (Opcode::Sign, 665),
    (Opcode::UpdateExtra, 10),
    (Opcode::Verify, 1085),
    (Opcode::Write, 45),
];

fn execution_table(device: DeviceType, divider: ClockDivider) -> &'static ExecutionTable {
    match (device, divider) {
        (DeviceType::Atecc608, ClockDivider::M0) => &ATECC608_M0,
        (DeviceType::Atecc608, ClockDivider::M1) => &ATECC608_M1,
        (DeviceType::Atecc608, ClockDivider::M2) => &ATECC608_M2,
    }
}

/// Typical execution time of `opcode`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use atecc_core::{command::Opcode, timing, ClockDivider, DeviceType};
///
/// let t = timing::execution_time(DeviceType::Atecc608, ClockDivider::M0, Opcode::Sign).unwrap();
/// assert_eq!(t, Duration::from_millis(115));
/// ```
pub fn execution_time(device: DeviceType, divider: ClockDivider, opcode: Opcode) -> Result<Duration> {
    execution_table(device, divider)
        .iter()
        .find(|(op, _)| *op == opcode)
        .map(|(_, ms)| Duration::from_millis(*ms))
        .ok_or(Error::UnknownExecutionTime(opcode))
}
