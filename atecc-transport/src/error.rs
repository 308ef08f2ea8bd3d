//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] atecc_core::Error),

    /// The reply holds more data than the destination can take
    #[error("Receive buffer too small: need {needed} bytes, have {capacity}")]
    ReceiveBufferTooSmall {
        needed: usize,
        capacity: usize,
    },

    #[error("Reply exceeds {limit} bytes")]
    ReplyOverflow {
        limit: usize,
    },

    #[error("Reply is missing its line terminator")]
    MissingTerminator,

    #[error("Reply is missing its closing delimiter")]
    MissingDelimiter,

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Invalid hex in reply: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Unknown kit device: {0}")]
    UnknownKitDevice(String),

    #[error("Unknown kit interface: {0}")]
    UnknownKitInterface(String),

    #[error("No device found")]
    NoDevice,
}

impl Error {
    /// Check if error indicates a corrupted or malformed reply
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::MissingTerminator
            | Self::MissingDelimiter
            | Self::MalformedReply(_)
            | Self::InvalidHex(_)
            | Self::ReplyOverflow { .. } => true,
            Self::Protocol(e) => e.is_integrity(),
            _ => false,
        }
    }

    /// Check if error is transient (retrying might succeed)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Protocol(e) => e.is_transient(),
            _ => false,
        }
    }
}
