//! Tracing decorator for transports
//!
//! Wraps any [`Transport`] and logs every call together with a hex dump of
//! the bytes on the wire. Composed at construction time so the transports
//! themselves stay free of logging noise.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{error::Result, Transport};

/// Lazily formatted hex dump in the style of `hexdump -C`
///
/// # Examples
///
/// ```
/// use atecc_transport::HexDump;
///
/// let dump = HexDump(b"\x07\x30\x00\x00\x00\x03\x5d").to_string();
/// assert!(dump.starts_with("00000000  07 30 00 00 00 03 5d"));
/// ```
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, chunk) in self.0.chunks(16).enumerate() {
            if line > 0 {
                writeln!(f)?;
            }
            write!(f, "{:08x} ", line * 16)?;

            for i in 0..16 {
                if i == 8 {
                    write!(f, " ")?;
                }
                match chunk.get(i) {
                    Some(b) => write!(f, " {:02x}", b)?,
                    None => write!(f, "   ")?,
                }
            }

            write!(f, "  |")?;
            for &b in chunk {
                let c = if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                };
                write!(f, "{}", c)?;
            }
            write!(f, "|")?;
        }
        Ok(())
    }
}

/// Transport decorator logging every call
pub struct TracingTransport<T> {
    id: &'static str,
    inner: T,
}

impl<T: Transport> TracingTransport<T> {
    /// Wrap `inner`, tagging log lines with `id`
    pub fn new(id: &'static str, inner: T) -> Self {
        Self { id, inner }
    }

    /// Unwrap the decorated transport
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TracingTransport<T> {
    async fn wake(&mut self) -> Result<()> {
        debug!(id = self.id, ">> wake");
        let result = self.inner.wake().await;
        debug!(id = self.id, result = ?result, "<< wake");
        result
    }

    async fn idle(&mut self) -> Result<()> {
        debug!(id = self.id, ">> idle");
        let result = self.inner.idle().await;
        debug!(id = self.id, result = ?result, "<< idle");
        result
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        debug!(id = self.id, len = data.len(), ">> send");
        trace!(id = self.id, "\n{}", HexDump(data));
        let result = self.inner.write(data).await;
        debug!(id = self.id, result = ?result, "<< send");
        result
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        debug!(id = self.id, capacity = buf.len(), ">> recv");
        let result = self.inner.read(buf).await;
        debug!(id = self.id, result = ?result, "<< recv");
        if let Ok(n) = result {
            trace!(id = self.id, "\n{}", HexDump(&buf[..n]));
        }
        result
    }

    async fn close(&mut self) -> Result<()> {
        debug!(id = self.id, "close");
        self.inner.close().await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
