//! Raw binary transport
//!
//! Speaks the chip's native framing over a byte stream. Every write is
//! prefixed with an I²C word address selecting what the chip should do with
//! the bytes that follow: reset the IO buffer, sleep, idle or execute a
//! command. Responses come back length-prefixed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use atecc_core::constants::{word_address, DEFAULT_WAKE_DELAY_US, RSP_SIZE_MIN};
use atecc_core::status;

use crate::{error::*, Transport};

/// Raw transport over any async byte stream
///
/// # Examples
///
/// ```no_run
/// use atecc_transport::{RawTransport, Transport};
///
/// # async fn example() -> atecc_transport::Result<()> {
/// let (stream, _chip) = tokio::io::duplex(256);
/// let mut transport = RawTransport::new(stream);
/// transport.wake().await?;
/// # Ok(())
/// # }
/// ```
pub struct RawTransport<S> {
    stream: Option<S>,
    wake_delay: Duration,
}

impl<S> RawTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create new raw transport over `stream`
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            wake_delay: Duration::from_micros(DEFAULT_WAKE_DELAY_US),
        }
    }

    /// Set the delay between the wake pulse and reading the wake reply
    pub fn with_wake_delay(mut self, delay: Duration) -> Self {
        self.wake_delay = delay;
        self
    }

    /// Check if the stream is still open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }

    async fn send_word_address(&mut self, address: u8, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;

        stream.write_all(&[address]).await?;
        if !data.is_empty() {
            stream.write_all(data).await?;
        }
        stream.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<S> Transport for RawTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Send the wake pulse and check the chip's wake reply
    ///
    /// The pause between pulse and reply is part of the physical wake
    /// signal (the chip's wake-high time), not a scheduling wait, so it is
    /// not a cancellation point.
    async fn wake(&mut self) -> Result<()> {
        self.send_word_address(word_address::RESET, &[]).await?;
        tokio::time::sleep(self.wake_delay).await;

        let mut reply = [0u8; RSP_SIZE_MIN];
        self.stream()?.read_exact(&mut reply).await?;

        status::check_wake(&reply)?;
        Ok(())
    }

    async fn idle(&mut self) -> Result<()> {
        self.send_word_address(word_address::IDLE, &[]).await
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.send_word_address(word_address::COMMAND, data).await?;
        Ok(data.len())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream()?;

        let mut len = [0u8; 1];
        stream.read_exact(&mut len).await?;
        let len = usize::from(len[0]).max(1);

        if len > buf.len() {
            // Drain the rest of the frame so the next exchange starts clean
            let mut rest = vec![0u8; len - 1];
            stream.read_exact(&mut rest).await?;
            return Err(Error::ReceiveBufferTooSmall {
                needed: len,
                capacity: buf.len(),
            });
        }

        buf[0] = len as u8;
        stream.read_exact(&mut buf[1..len]).await?;

        Ok(len)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing raw transport");
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

impl<S> Drop for RawTransport<S> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Raw transport dropped while still open");
        }
    }
}
