//! Chip status codes
//!
//! A response of exactly four bytes (`[0x04][status][crc_lo][crc_hi]`)
//! carries a status code instead of output data.

use std::fmt;

use crate::checksum;
use crate::error::{Error, Result};

/// Status byte reported by the chip
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Command executed successfully
    Success,

    /// CheckMac or Verify mismatch
    CheckMacVerifyFailed,

    /// Length, opcode or a parameter was illegal
    ParseError,

    /// ECC processing failure
    ProcessFailure,

    /// Self test failed, the chip is in failure mode
    SelfTestFailed,

    /// Random number generator health test failed
    HealthTestFailed,

    /// Command could not be executed in the current state
    ExecutionError,

    /// Wake was successful (an error for any command except wake)
    WakeSuccessful,

    /// Bad CRC or other communication error; the command should be resent
    CommunicationError,

    /// Anything else
    Unknown(u8),
}

impl Status {
    /// Convert to the result of a command
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            status => Err(Error::Status(status)),
        }
    }

    /// Get status name
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::CheckMacVerifyFailed => "check mac verify failed",
            Self::ParseError => "parse error",
            Self::ProcessFailure => "ecc process failure",
            Self::SelfTestFailed => "self-test failed",
            Self::HealthTestFailed => "health test failed",
            Self::ExecutionError => "execution error",
            Self::WakeSuccessful => "wake successful",
            Self::CommunicationError => "crc or communication error",
            Self::Unknown(_) => "unknown status",
        }
    }
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Success,
            0x01 => Self::CheckMacVerifyFailed,
            0x03 => Self::ParseError,
            0x05 => Self::ProcessFailure,
            0x07 => Self::SelfTestFailed,
            0x08 => Self::HealthTestFailed,
            0x0F => Self::ExecutionError,
            0x11 => Self::WakeSuccessful,
            0xFF => Self::CommunicationError,
            other => Self::Unknown(other),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Success => 0x00,
            Status::CheckMacVerifyFailed => 0x01,
            Status::ParseError => 0x03,
            Status::ProcessFailure => 0x05,
            Status::SelfTestFailed => 0x07,
            Status::HealthTestFailed => 0x08,
            Status::ExecutionError => 0x0F,
            Status::WakeSuccessful => 0x11,
            Status::CommunicationError => 0xFF,
            Status::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), u8::from(*self))
    }
}

/// Validate the reply to a wake pulse
///
/// The chip answers a wake with the four-byte status frame `04 11 33 43`.
/// Anything else, including a plain success status, means the chip did not
/// wake properly.
pub fn check_wake(reply: &[u8]) -> Result<()> {
    if reply.len() != 4 || reply[0] != 0x04 || !checksum::verify(reply) {
        return Err(Error::WakeFailed(reply.to_vec()));
    }

    match Status::from(reply[1]) {
        Status::WakeSuccessful => Ok(()),
        Status::Success => Err(Error::WakeFailed(reply.to_vec())),
        status => Err(Error::Status(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion() {
        assert_eq!(Status::from(0x00), Status::Success);
        assert_eq!(Status::from(0x11), Status::WakeSuccessful);
        assert_eq!(Status::from(0xFF), Status::CommunicationError);
        assert_eq!(Status::from(0x42), Status::Unknown(0x42));

        for code in [0x00, 0x01, 0x03, 0x05, 0x07, 0x08, 0x0F, 0x11, 0xFF, 0x42] {
            assert_eq!(u8::from(Status::from(code)), code);
        }
    }

    #[test]
    fn test_status_into_result() {
        assert!(Status::Success.into_result().is_ok());
        assert_eq!(
            Status::WakeSuccessful.into_result(),
            Err(Error::Status(Status::WakeSuccessful))
        );
        assert_eq!(
            Status::from(0x42).into_result(),
            Err(Error::Status(Status::Unknown(0x42)))
        );
    }

    #[test]
    fn test_check_wake() {
        assert!(check_wake(&[0x04, 0x11, 0x33, 0x43]).is_ok());

        // Success status is not a valid wake reply
        assert!(matches!(
            check_wake(&[0x04, 0x00, 0x03, 0x40]),
            Err(Error::WakeFailed(_))
        ));

        // Self-test failure is reported as such
        let mut reply = vec![0x04, 0x07];
        reply.extend_from_slice(&checksum::crc16(&reply).to_le_bytes());
        assert_eq!(
            check_wake(&reply),
            Err(Error::Status(Status::SelfTestFailed))
        );

        assert!(matches!(check_wake(&[0x04, 0x11]), Err(Error::WakeFailed(_))));
        assert!(matches!(
            check_wake(&[0x04, 0x11, 0x33, 0x44]),
            Err(Error::WakeFailed(_))
        ));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            Status::CommunicationError.to_string(),
            "crc or communication error(0xFF)"
        );
    }
}
