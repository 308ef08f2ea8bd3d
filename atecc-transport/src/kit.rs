//! Kit protocol transport
//!
//! Development boards expose the chip through an ASCII protocol carried in
//! fixed-size reports (typically USB HID). Binary frames travel as upper-case
//! hex inside `<id>:<op>(...)\n` commands and replies come back as
//! `<status>(<payload>)\n`.
//!
//! ```text
//! host  -> E:t(0730000000035D)\n
//! board <- 00(0704...)\n
//! ```

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

use atecc_core::{status, DeviceType, Status};

use crate::{error::*, Transport};

/// Number of enumeration slots scanned during discovery
pub const MAX_SCAN_COUNT: u8 = 8;

/// Default report size for HID boards
pub const DEFAULT_PACKET_SIZE: usize = 64;

/// Hex framing overhead around a response in a reply
const RX_WRAP_SIZE: usize = 32 + 6;

/// Capacity for control replies (wake, idle, select)
const CONTROL_REPLY_SIZE: usize = 10;

/// Physical interface between the board and the chip
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KitType {
    /// Use whatever the board reports
    #[default]
    Auto = 0x00,
    I2c = 0x01,
    Swi = 0x02,
    Spi = 0x03,
}

impl KitType {
    /// Parse the interface name reported during discovery
    pub fn from_interface(name: &str) -> Result<Self> {
        match name {
            "TWI" => Ok(Self::I2c),
            "SWI" => Ok(Self::Swi),
            "SPI" => Ok(Self::Spi),
            other => Err(Error::UnknownKitInterface(other.to_string())),
        }
    }

    /// Code sent with the interface select command
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for KitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::I2c => "i2c",
            Self::Swi => "swi",
            Self::Spi => "spi",
        };
        f.write_str(name)
    }
}

/// Board identifier for a device type
pub fn kit_id(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::Atecc608 => "ECC608",
    }
}

fn device_type_from_kit_id(id: &str) -> Result<DeviceType> {
    if id.starts_with("ECC6") {
        Ok(DeviceType::Atecc608)
    } else {
        Err(Error::UnknownKitDevice(id.to_string()))
    }
}

/// Kit transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitConfig {
    /// Device type to look for
    pub device_type: DeviceType,

    /// Enumeration index to pick, 0 for any
    pub dev_index: u8,

    /// Interface to select, `Auto` to keep the board's choice
    pub kit_type: KitType,

    /// Bus address to pick, 0 for any
    pub dev_identity: u8,

    /// Report size of the underlying link
    pub packet_size: usize,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::default(),
            dev_index: 0,
            kit_type: KitType::Auto,
            dev_identity: 0,
            packet_size: DEFAULT_PACKET_SIZE,
        }
    }
}

impl KitConfig {
    /// Set device type
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Set enumeration index
    pub fn with_dev_index(mut self, index: u8) -> Self {
        self.dev_index = index;
        self
    }

    /// Set interface type
    pub fn with_kit_type(mut self, kit_type: KitType) -> Self {
        self.kit_type = kit_type;
        self
    }

    /// Set bus address
    pub fn with_dev_identity(mut self, identity: u8) -> Self {
        self.dev_identity = identity;
        self
    }

    /// Set report size
    pub fn with_packet_size(mut self, size: usize) -> Self {
        self.packet_size = size.max(1);
        self
    }
}

/// A device reported by the board
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KitDevice {
    pub device_type: DeviceType,
    pub kit_type: KitType,
    pub index: u8,
    pub address: u8,
}

/// Parse a discovery reply such as `ECC608B TWI 00(6C)`
///
/// Returns `Ok(None)` for an empty enumeration slot.
pub fn parse_kit_device(reply: &[u8]) -> Result<Option<KitDevice>> {
    if reply.starts_with(b"no_device") {
        return Ok(None);
    }

    let text = std::str::from_utf8(reply)
        .map_err(|_| Error::MalformedReply(String::from_utf8_lossy(reply).into_owned()))?
        .trim_end_matches(['\0', '\r', '\n', ' ']);
    let malformed = || Error::MalformedReply(text.to_string());

    let mut fields = text.split_whitespace();
    let (id, iface, slot) = match (fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(iface), Some(slot)) => (id, iface, slot),
        _ => return Err(malformed()),
    };

    let (index, rest) = slot.split_once('(').ok_or_else(malformed)?;
    let address = rest.strip_suffix(')').ok_or(Error::MissingDelimiter)?;

    let index = u8::from_str_radix(index, 16).map_err(|_| malformed())?;
    let address = u8::from_str_radix(address, 16).map_err(|_| malformed())?;

    Ok(Some(KitDevice {
        device_type: device_type_from_kit_id(id)?,
        kit_type: KitType::from_interface(iface)?,
        index,
        address,
    }))
}

/// Decode a `<status>(<hex>)` reply into `dst`
///
/// The status is checked before the payload is looked at.
pub fn parse_reply(reply: &[u8], dst: &mut [u8]) -> Result<usize> {
    let status = reply
        .get(..2)
        .ok_or_else(|| Error::MalformedReply(String::from_utf8_lossy(reply).into_owned()))?;
    let mut code = [0u8; 1];
    hex::decode_to_slice(status, &mut code)?;
    Status::from(code[0]).into_result()?;

    if reply.get(2) != Some(&b'(') {
        return Err(Error::MalformedReply(
            String::from_utf8_lossy(reply).into_owned(),
        ));
    }

    let body = &reply[3..];
    let end = body
        .iter()
        .position(|&b| b == b')')
        .ok_or(Error::MissingDelimiter)?;
    let body = &body[..end];

    let size = body.len() / 2;
    if size > dst.len() {
        return Err(Error::ReceiveBufferTooSmall {
            needed: size,
            capacity: dst.len(),
        });
    }

    hex::decode_to_slice(body, &mut dst[..size])?;
    Ok(size)
}

/// Kit protocol transport over a report-oriented byte stream
pub struct KitTransport<S> {
    stream: Option<S>,
    config: KitConfig,
    id: char,
    report: Vec<u8>,
    reply: BytesMut,
}

impl<S> KitTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a kit transport without running discovery
    pub fn new(stream: S, config: KitConfig) -> Self {
        let id = kit_id(config.device_type).chars().next().unwrap_or('E');
        let packet_size = config.packet_size.max(1);
        Self {
            stream: Some(stream),
            id,
            report: vec![0u8; packet_size],
            reply: BytesMut::with_capacity(packet_size),
            config,
        }
    }

    /// Create a kit transport and select the configured device
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use atecc_transport::{KitConfig, KitTransport};
    ///
    /// # async fn example() -> atecc_transport::Result<()> {
    /// let (stream, _board) = tokio::io::duplex(4096);
    /// let transport = KitTransport::connect(stream, KitConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(stream: S, config: KitConfig) -> Result<Self> {
        let mut transport = Self::new(stream, config);
        transport.discover().await?;
        Ok(transport)
    }

    /// Get configuration
    pub fn config(&self) -> &KitConfig {
        &self.config
    }

    /// Check if the stream is still open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Scan the board and select the first device matching the config
    pub async fn discover(&mut self) -> Result<KitDevice> {
        for index in 0..MAX_SCAN_COUNT {
            let Some(device) = self.device_at(index).await? else {
                trace!("No device at index {}", index);
                continue;
            };

            if !self.matches(index, &device) {
                debug!("Skipping {:?} at index {}", device, index);
                continue;
            }

            if self.config.kit_type != KitType::Auto {
                self.select_interface(self.config.kit_type).await?;
            }
            self.select_device(device.address).await?;

            info!(
                "Selected {} on {} at 0x{:02X}",
                device.device_type, device.kit_type, device.address
            );
            return Ok(device);
        }

        Err(Error::NoDevice)
    }

    fn matches(&self, index: u8, device: &KitDevice) -> bool {
        let config = &self.config;
        (config.dev_index == 0 || config.dev_index == index)
            && (config.dev_identity == 0 || config.dev_identity == device.address)
            && config.device_type == device.device_type
            && (config.kit_type == KitType::Auto || config.kit_type == device.kit_type)
    }

    async fn device_at(&mut self, index: u8) -> Result<Option<KitDevice>> {
        let command = format!("board:device({:02X})\n", index);
        self.send(command.as_bytes()).await?;
        self.recv(self.config.packet_size).await?;
        parse_kit_device(&self.reply)
    }

    async fn select_interface(&mut self, kit_type: KitType) -> Result<()> {
        let command = format!("{}:physical:interface({:02X})\n", self.id, kit_type.code());
        self.control(command.as_bytes(), &mut [0u8; CONTROL_REPLY_SIZE])
            .await
            .map(drop)
    }

    async fn select_device(&mut self, address: u8) -> Result<()> {
        let command = format!("{}:physical:select({:02X})\n", self.id, address);
        self.control(command.as_bytes(), &mut [0u8; CONTROL_REPLY_SIZE])
            .await
            .map(drop)
    }

    /// Send a command and decode its single-report reply
    async fn control(&mut self, command: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.send(command).await?;
        self.recv(self.config.packet_size).await?;
        parse_reply(&self.reply, dst)
    }

    /// Send `command` as zero-padded reports
    async fn send(&mut self, command: &[u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        for chunk in command.chunks(self.report.len()) {
            self.report[..chunk.len()].copy_from_slice(chunk);
            self.report[chunk.len()..].fill(0);
            stream.write_all(&self.report).await?;
        }
        stream.flush().await?;

        Ok(command.len())
    }

    /// Collect reports into the reply buffer until a line terminator
    async fn recv(&mut self, limit: usize) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        self.reply.clear();

        loop {
            if self.reply.len() >= limit {
                return Err(Error::ReplyOverflow { limit });
            }

            match stream.read_exact(&mut self.report).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(if self.reply.is_empty() {
                        Error::ConnectionClosed
                    } else {
                        Error::MissingTerminator
                    });
                }
                Err(e) => return Err(e.into()),
            }

            match self.report.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.reply.extend_from_slice(&self.report[..end]);
                    break;
                }
                None => self.reply.extend_from_slice(&self.report),
            }
        }

        if self.reply.len() > limit {
            return Err(Error::ReplyOverflow { limit });
        }
        Ok(())
    }

    /// Reply size limit for a response of up to `capacity` bytes
    fn read_limit(&self, capacity: usize) -> usize {
        let message = 2 * capacity + RX_WRAP_SIZE;
        let packet = self.report.len();
        (message / packet + 1) * packet
    }
}

#[async_trait]
impl<S> Transport for KitTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn wake(&mut self) -> Result<()> {
        let command = format!("{}:w()\n", self.id);
        let mut data = [0u8; CONTROL_REPLY_SIZE];
        let n = self.control(command.as_bytes(), &mut data).await?;
        status::check_wake(&data[..n])?;
        Ok(())
    }

    async fn idle(&mut self) -> Result<()> {
        let command = format!("{}:i()\n", self.id);
        self.control(command.as_bytes(), &mut [0u8; CONTROL_REPLY_SIZE])
            .await
            .map(drop)
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let command = format!("{}:t({})\n", self.id, hex::encode_upper(data));
        self.send(command.as_bytes()).await?;
        Ok(data.len())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let limit = self.read_limit(buf.len());
        self.recv(limit).await?;
        parse_reply(&self.reply, buf)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing kit transport");
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kit"
    }
}

impl<S> Drop for KitTransport<S> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Kit transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;

    /// Scripted board answering each command line with a canned reply
    fn board(
        mut stream: DuplexStream,
        script: Vec<(&'static str, &'static str)>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut report = [0u8; DEFAULT_PACKET_SIZE];
            for (expected, reply) in script {
                let mut line = Vec::new();
                loop {
                    stream.read_exact(&mut report).await.unwrap();
                    match report.iter().position(|&b| b == b'\n') {
                        Some(end) => {
                            line.extend_from_slice(&report[..=end]);
                            break;
                        }
                        None => line.extend_from_slice(&report),
                    }
                }
                assert_eq!(String::from_utf8(line).unwrap(), expected);

                let mut out = format!("{}\n", reply).into_bytes();
                let padded = out.len().div_ceil(DEFAULT_PACKET_SIZE) * DEFAULT_PACKET_SIZE;
                out.resize(padded, 0);
                stream.write_all(&out).await.unwrap();
            }
        })
    }

    #[test]
    fn test_parse_kit_device() {
        let device = parse_kit_device(b"ECC608B TWI 00(6C)").unwrap().unwrap();
        assert_eq!(device.device_type, DeviceType::Atecc608);
        assert_eq!(device.kit_type, KitType::I2c);
        assert_eq!(device.index, 0);
        assert_eq!(device.address, 0x6C);
    }

    #[test]
    fn test_parse_kit_device_empty_slot() {
        assert_eq!(parse_kit_device(b"no_device").unwrap(), None);
    }

    #[test]
    fn test_parse_kit_device_errors() {
        assert!(matches!(
            parse_kit_device(b"SHA204A TWI 00(64)"),
            Err(Error::UnknownKitDevice(_))
        ));
        assert!(matches!(
            parse_kit_device(b"ECC608B UART 00(6C)"),
            Err(Error::UnknownKitInterface(_))
        ));
        assert!(matches!(
            parse_kit_device(b"ECC608B TWI 00(6C"),
            Err(Error::MissingDelimiter)
        ));
        assert!(matches!(
            parse_kit_device(b"garbage"),
            Err(Error::MalformedReply(_))
        ));
    }

    #[test]
    fn test_kit_type_codes() {
        assert_eq!(KitType::Auto.code(), 0x00);
        assert_eq!(KitType::I2c.code(), 0x01);
        assert_eq!(KitType::Swi.code(), 0x02);
        assert_eq!(KitType::Spi.code(), 0x03);
        assert_eq!(KitType::from_interface("SWI").unwrap(), KitType::Swi);
    }

    #[test]
    fn test_parse_reply() {
        let mut dst = [0u8; 8];
        let n = parse_reply(b"00(04113343)", &mut dst).unwrap();
        assert_eq!(&dst[..n], &[0x04, 0x11, 0x33, 0x43]);

        assert_eq!(parse_reply(b"00()", &mut dst).unwrap(), 0);
    }

    #[test]
    fn test_parse_reply_status_first() {
        let mut dst = [0u8; 8];
        let err = parse_reply(b"0F(", &mut dst).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(atecc_core::Error::Status(Status::ExecutionError))
        ));
    }

    #[test]
    fn test_parse_reply_errors() {
        let mut dst = [0u8; 2];
        assert!(matches!(
            parse_reply(b"00(0102", &mut dst),
            Err(Error::MissingDelimiter)
        ));
        assert!(matches!(
            parse_reply(b"00(010203)", &mut dst),
            Err(Error::ReceiveBufferTooSmall {
                needed: 3,
                capacity: 2
            })
        ));
        assert!(matches!(
            parse_reply(b"00(0G)", &mut dst),
            Err(Error::InvalidHex(_))
        ));
        assert!(matches!(parse_reply(b"0", &mut dst), Err(Error::MalformedReply(_))));
    }

    #[test]
    fn test_read_limit() {
        let (stream, _board) = duplex(64);
        let transport = KitTransport::new(stream, KitConfig::default());

        // 2 * 32 + 38 = 102 -> two reports
        assert_eq!(transport.read_limit(32), 128);
        // 2 * 151 + 38 = 340 -> six reports
        assert_eq!(transport.read_limit(151), 384);
    }

    #[tokio::test]
    async fn test_kit_discover_skips_empty_slots() {
        let (host, device) = duplex(4096);
        let board = board(
            device,
            vec![
                ("board:device(00)\n", "no_device"),
                ("board:device(01)\n", "ECC608B TWI 01(6C)"),
                ("E:physical:select(6C)\n", "00()"),
            ],
        );

        let mut transport = KitTransport::connect(host, KitConfig::default())
            .await
            .unwrap();
        board.await.unwrap();

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_discover_filters_and_selects_interface() {
        let (host, device) = duplex(4096);
        let board = board(
            device,
            vec![
                ("board:device(00)\n", "ECC608B TWI 00(6C)"),
                ("board:device(01)\n", "ECC608B SWI 01(00)"),
                ("E:physical:interface(02)\n", "00()"),
                ("E:physical:select(00)\n", "00()"),
            ],
        );

        let config = KitConfig::default().with_kit_type(KitType::Swi);
        let mut transport = KitTransport::new(host, config);
        let device = transport.discover().await.unwrap();
        board.await.unwrap();

        assert_eq!(device.kit_type, KitType::Swi);
        assert_eq!(device.index, 1);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_discover_no_device() {
        let (host, device) = duplex(4096);
        let script = (0..MAX_SCAN_COUNT)
            .map(|i| {
                let command: &'static str =
                    Box::leak(format!("board:device({:02X})\n", i).into_boxed_str());
                (command, "no_device")
            })
            .collect();
        let board = board(device, script);

        let mut transport = KitTransport::new(host, KitConfig::default());
        assert!(matches!(transport.discover().await, Err(Error::NoDevice)));
        board.await.unwrap();

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_exchange() {
        let (host, device) = duplex(4096);
        let board = board(
            device,
            vec![
                ("E:w()\n", "00(04113343)"),
                ("E:t(0730000000035D)\n", "00(0700005000D9A5)"),
                ("E:i()\n", "00()"),
            ],
        );

        let mut transport = KitTransport::new(host, KitConfig::default());
        transport.wake().await.unwrap();

        let frame = [0x07, 0x30, 0x00, 0x00, 0x00, 0x03, 0x5D];
        assert_eq!(transport.write(&frame).await.unwrap(), 7);

        let mut buf = [0u8; 16];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x07, 0x00, 0x00, 0x50, 0x00, 0xD9, 0xA5]);

        transport.idle().await.unwrap();
        board.await.unwrap();

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_long_command_spans_reports() {
        let (host, device) = duplex(4096);
        let payload = [0xABu8; 40];
        let expected: &'static str =
            Box::leak(format!("E:t({})\n", hex::encode_upper(payload)).into_boxed_str());
        let board = board(device, vec![(expected, "00()")]);

        let mut transport = KitTransport::new(host, KitConfig::default());
        assert_eq!(transport.write(&payload).await.unwrap(), 40);

        let mut buf = [0u8; 4];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
        board.await.unwrap();

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_missing_terminator() {
        let (host, mut device) = duplex(4096);
        device.write_all(&[b'0'; DEFAULT_PACKET_SIZE]).await.unwrap();
        drop(device);

        let mut transport = KitTransport::new(host, KitConfig::default());
        let mut buf = [0u8; 32];
        assert!(matches!(
            transport.read(&mut buf).await,
            Err(Error::MissingTerminator)
        ));

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_kit_reply_overflow() {
        let (host, mut device) = duplex(4096);
        device.write_all(&[b'0'; DEFAULT_PACKET_SIZE * 2]).await.unwrap();

        let mut transport = KitTransport::new(host, KitConfig::default());
        assert!(matches!(
            transport.idle().await,
            Err(Error::ReplyOverflow { limit: 64 })
        ));

        transport.close().await.unwrap();
    }
}
