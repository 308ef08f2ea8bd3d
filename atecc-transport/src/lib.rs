//! Transport layer for ATECC devices
//!
//! Provides the raw binary link and the ASCII kit protocol used by
//! development boards, plus a tracing decorator for both.

pub mod error;
pub mod kit;
pub mod logging;
pub mod raw;

pub use error::{Error, Result};
pub use kit::{KitConfig, KitDevice, KitTransport, KitType};
pub use logging::{HexDump, TracingTransport};
pub use raw::RawTransport;

use async_trait::async_trait;

/// Transport trait for different communication methods
///
/// One command is in flight at a time: the caller writes a frame, waits for
/// the chip to execute it and then reads the response.
#[async_trait]
pub trait Transport: Send {
    /// Wake the device up
    async fn wake(&mut self) -> Result<()>;

    /// Put the device in idle mode
    async fn idle(&mut self) -> Result<()>;

    /// Send a command frame, returning the number of frame bytes sent
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Receive a response frame into `buf`, returning its size
    ///
    /// Fails with [`Error::ReceiveBufferTooSmall`] if the frame does not fit.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the underlying link
    async fn close(&mut self) -> Result<()>;

    /// Short transport name for diagnostics
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn wake(&mut self) -> Result<()> {
        (**self).wake().await
    }

    async fn idle(&mut self) -> Result<()> {
        (**self).idle().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
