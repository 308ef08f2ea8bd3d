//! # atecc
//!
//! Host-side driver for Microchip ATECC secure elements.
//!
//! ## Features
//!
//! - Async/await API using Tokio
//! - Raw binary link and kit (ASCII hex) board transports
//! - Zone reads and writes at byte granularity
//! - Key generation, signing and external verification
//! - Cancellation of every operation through a `CancellationToken`
//!
//! ## Quick Start
//!
//! ```no_run
//! use atecc::{Device, DeviceConfig, KitConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> atecc::Result<()> {
//!     let cancel = CancellationToken::new();
//!     let (stream, _board) = tokio::io::duplex(4096);
//!
//!     let mut device = Device::open_kit(
//!         stream,
//!         KitConfig::default(),
//!         DeviceConfig::kit_default(),
//!         &cancel,
//!     )
//!     .await?;
//!
//!     let revision = device.revision(&cancel).await?;
//!     println!("Revision: {}", revision);
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
mod zone;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::DeviceConfig;
pub use device::Device;
pub use engine::Engine;
pub use error::{Error, Result};

// Re-export lower layers
pub use atecc_core::{ClockDivider, Command, DeviceType, Opcode, Status, Zone};
pub use atecc_transport::{KitConfig, KitTransport, KitType, RawTransport, Transport};
pub use atecc_types::{LockState, PublicKey, Revision, SerialNumber, Signature};
