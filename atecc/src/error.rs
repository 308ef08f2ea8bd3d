//! High-level error types

use atecc_core::Status;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] atecc_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] atecc_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] atecc_types::Error),

    #[error("Operation cancelled")]
    Cancelled,

    /// Response larger than the buffer reserved for it
    #[error("Receive buffer overflow: need {needed} bytes, have {capacity}")]
    ReceiveBufferOverflow { needed: usize, capacity: usize },

    #[error("Unexpected response size: expected {expected} bytes, got {actual}")]
    UnexpectedResponseSize { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Chip status carried by this error, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Core(atecc_core::Error::Status(status))
            | Self::Transport(atecc_transport::Error::Protocol(atecc_core::Error::Status(status))) => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Check if the operation was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if error is transient (retrying might succeed)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Core(e) => e.is_transient(),
            Self::Transport(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Check if error indicates a corrupted frame or reply
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Core(e) => e.is_integrity(),
            Self::Transport(e) => e.is_integrity(),
            _ => false,
        }
    }
}
