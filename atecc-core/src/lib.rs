//! # atecc-core
//!
//! Core protocol implementation for Microchip ATECC secure elements.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame encoding and response validation
//! - Checksum calculation
//! - Command and opcode definitions
//! - Chip status codes
//! - Zone addressing
//! - Execution time tables
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod session;
pub mod status;
pub mod timing;
pub mod zone;

pub use command::{Command, Opcode};
pub use error::{Error, Result};
pub use packet::Response;
pub use session::{Session, SessionState};
pub use status::Status;
pub use timing::{ClockDivider, DeviceType};
pub use zone::Zone;
