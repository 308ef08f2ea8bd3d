//! Error types for atecc-core

use crate::command::Opcode;
use crate::status::Status;
use crate::zone::Zone;

/// Result type alias for atecc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Length byte does not match the number of bytes in the frame
    #[error("Frame length mismatch: header says {declared} bytes, got {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// The chip reported a non-success status code
    #[error("Device returned status: {0}")]
    Status(Status),

    /// Wake reply did not carry the wake-successful status
    #[error("Unexpected wake reply: {0:02X?}")]
    WakeFailed(Vec<u8>),

    /// Unknown opcode
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Unknown zone code
    #[error("Invalid zone: 0x{0:02X}")]
    InvalidZone(u8),

    /// Slot does not exist in zone
    #[error("Invalid slot {slot} for {zone} zone")]
    InvalidSlot {
        zone: Zone,
        slot: u16,
    },

    /// Offset is not aligned to the required access size
    #[error("Invalid offset {offset}: must be a multiple of {alignment}")]
    MisalignedOffset {
        offset: usize,
        alignment: usize,
    },

    /// Length is not aligned to the required access size
    #[error("Invalid length {length}: must be a multiple of {alignment}")]
    MisalignedLength {
        length: usize,
        alignment: usize,
    },

    /// Requested byte range does not fit in the zone
    #[error("Range {offset}+{length} exceeds {zone} zone size of {size} bytes")]
    OutOfRange {
        zone: Zone,
        offset: usize,
        length: usize,
        size: usize,
    },

    /// Read or write access must be a word or a block
    #[error("Invalid access size: {0} bytes (must be 4 or 32)")]
    InvalidAccessSize(usize),

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Invalid input for a command
    #[error("Invalid {what} size: {size} bytes")]
    InvalidInputSize {
        what: &'static str,
        size: usize,
    },

    /// MAC was supplied for a command that does not take one
    #[error("Unexpected MAC for word write")]
    UnexpectedMac,

    /// Revision bytes did not identify a supported device
    #[error("Unknown device revision: {0:02X?}")]
    UnknownDevice(Vec<u8>),

    /// Clock divider value is not one of M0/M1/M2
    #[error("Unknown clock divider: 0x{0:02X}")]
    UnknownClockDivider(u8),

    /// No execution time is known for this opcode
    #[error("Unknown execution time for {0}")]
    UnknownExecutionTime(Opcode),
}

impl Error {
    /// Check if error is transient (retransmitting the command might succeed)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Status(Status::CommunicationError))
    }

    /// Check if error indicates a corrupted or malformed frame
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::FrameTooShort { .. }
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
        )
    }

    /// Check if error was raised by local validation before any I/O
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidZone(_)
                | Self::InvalidSlot { .. }
                | Self::MisalignedOffset { .. }
                | Self::MisalignedLength { .. }
                | Self::OutOfRange { .. }
                | Self::InvalidAccessSize(_)
                | Self::PayloadTooLarge { .. }
                | Self::InvalidInputSize { .. }
                | Self::UnexpectedMac
        )
    }
}
