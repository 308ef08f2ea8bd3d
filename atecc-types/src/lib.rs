//! Value types returned by the ATECC device facade

#[macro_use]
mod fixed;

pub mod error;
pub mod identity;
pub mod keys;
pub mod lock;

pub use error::{Error, Result};
pub use identity::{Revision, SerialNumber};
pub use keys::{PublicKey, Signature};
pub use lock::LockState;
