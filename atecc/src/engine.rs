//! Command execution engine
//!
//! Drives one command through a full exchange with the chip:
//!
//! ```text
//! encode -> [wake] -> write -> wait(exec time) -> read -> validate -> idle
//!              ^________|
//!              retry with backoff
//! ```
//!
//! Only the transmit step is retried. Once the frame is on the wire the chip
//! is sent back to idle whatever happens next.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use atecc_core::command::Command;
use atecc_core::constants::{config::CHIP_MODE_OFFSET, RSP_OVERHEAD, RSP_SIZE_MIN};
use atecc_core::{packet, timing, ClockDivider, Response, Session, SessionState, Zone};
use atecc_transport::Transport;

use crate::config::DeviceConfig;
use crate::error::{Error, Result};

/// Command executor owning the transport
pub struct Engine {
    transport: Box<dyn Transport>,
    session: Session,
    config: DeviceConfig,
    clock_divider: ClockDivider,
    closed: bool,
}

impl Engine {
    /// Create an engine over `transport`
    ///
    /// Execution times assume the full-speed clock until [`Engine::init`]
    /// has read the chip mode.
    pub fn new(transport: Box<dyn Transport>, config: DeviceConfig) -> Self {
        Self {
            transport,
            session: Session::new(),
            config,
            clock_divider: ClockDivider::default(),
            closed: false,
        }
    }

    /// Read the chip mode byte and pick the matching execution times
    pub async fn init(&mut self, cancel: &CancellationToken) -> Result<()> {
        let mut chip_mode = [0u8; 1];
        self.read_bytes_zone(Zone::Config, 0, CHIP_MODE_OFFSET, &mut chip_mode, cancel)
            .await?;

        self.clock_divider = ClockDivider::from_chip_mode(chip_mode[0])?;
        info!(
            "{} ready on {} transport (clock divider {:?})",
            self.config.device_type,
            self.transport.name(),
            self.clock_divider
        );
        Ok(())
    }

    /// Get configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Clock divider read at initialization
    pub fn clock_divider(&self) -> ClockDivider {
        self.clock_divider
    }

    /// Power state as last seen by the host
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Execute a command and copy its response data into `recv`
    ///
    /// Returns the number of response bytes copied. Commands answered with a
    /// bare status (write, lock, nonce...) yield a single byte.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` fires during a backoff or the
    ///   execution wait
    /// - the last transport error once all transmit attempts failed
    /// - [`Error::ReceiveBufferOverflow`] if the response does not fit
    /// - integrity and chip status errors from response validation
    pub async fn execute(
        &mut self,
        command: &Command,
        recv: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if self.closed {
            return Err(atecc_transport::Error::NotConnected.into());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let frame = packet::encode(command)?;
        debug!(opcode = %command.opcode, len = frame.len(), "Executing {}", command);

        self.transmit(&frame, cancel).await?;

        let result = self.receive(command, recv, cancel).await;

        if let Err(e) = self.transport.idle().await {
            warn!("Failed to idle device: {}", e);
        }
        self.session.idle();

        result
    }

    /// Execute a command answered with a status only
    pub async fn run(&mut self, command: &Command, cancel: &CancellationToken) -> Result<()> {
        let mut status = [0u8; 1];
        self.execute(command, &mut status, cancel).await?;
        Ok(())
    }

    /// Close the transport, exactly once
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(atecc_transport::Error::NotConnected.into());
        }
        self.closed = true;
        self.transport.close().await?;
        debug!("Engine closed");
        Ok(())
    }

    async fn transmit(&mut self, frame: &[u8], cancel: &CancellationToken) -> Result<()> {
        let mut attempt = 0;
        loop {
            if !self.session.is_active() {
                match self.transport.wake().await {
                    Ok(()) => self.session.activate(),
                    Err(e) => debug!("Wake failed: {}", e),
                }
            }

            match self.transport.write(frame).await {
                Ok(_) => {
                    self.session.activate();
                    return Ok(());
                }
                Err(e) if attempt < self.config.rx_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        retries = self.config.rx_retries,
                        "Transmit failed, retrying: {}",
                        e
                    );
                    wait(self.config.wake_delay, cancel).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn receive(
        &mut self,
        command: &Command,
        recv: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let exec_time =
            timing::execution_time(self.config.device_type, self.clock_divider, command.opcode)?;
        trace!(opcode = %command.opcode, "Waiting {:?}", exec_time);
        wait(exec_time, cancel).await?;

        let mut buf = vec![0u8; (recv.len() + RSP_OVERHEAD).max(RSP_SIZE_MIN)];
        let size = match self.transport.read(&mut buf).await {
            Ok(size) => size,
            Err(atecc_transport::Error::ReceiveBufferTooSmall { needed, capacity }) => {
                error!(
                    "Receive buffer overflowed for {}: need {} bytes, have {}",
                    command.opcode, needed, capacity
                );
                return Err(Error::ReceiveBufferOverflow { needed, capacity });
            }
            Err(e) => return Err(e.into()),
        };

        let response = Response::parse(&buf[..size]).inspect_err(|e| {
            debug!("Invalid response to {}: {}", command.opcode, e);
        })?;

        let data = response.data();
        let n = data.len().min(recv.len());
        recv[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

/// Sleep for `duration` unless cancelled first
async fn wait(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
