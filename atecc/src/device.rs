//! High-level device interface

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use atecc_core::command::{
    check_digest, Command, GenKeyMode, InfoMode, LockTarget, MessageSource, NonceMode, NonceTarget,
    RandomMode, SignMode, UpdateMode,
};
use atecc_core::constants::{
    config, BLOCK_SIZE, DATA_SLOT_COUNT, PUBLIC_KEY_SIZE, RANDOM_SIZE, REVISION_SIZE,
    SIGNATURE_SIZE, WORD_SIZE,
};
use atecc_core::{ClockDivider, DeviceType, Status, Zone};
use atecc_transport::{KitConfig, KitTransport, RawTransport, TracingTransport, Transport};
use atecc_types::{LockState, PublicKey, Revision, SerialNumber, Signature};

use crate::config::DeviceConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};

/// ATECC secure element
///
/// Every operation takes a [`CancellationToken`]; cancelling it aborts the
/// operation at its next wait and yields [`Error::Cancelled`].
///
/// # Examples
///
/// ```no_run
/// use atecc::{Device, DeviceConfig};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> atecc::Result<()> {
///     let cancel = CancellationToken::new();
///     let stream = tokio::net::TcpStream::connect("127.0.0.1:7000").await
///         .map_err(atecc_transport::Error::from)?;
///
///     let mut device = Device::open_raw(stream, DeviceConfig::i2c_default(), &cancel).await?;
///     println!("Serial: {}", device.serial_number(&cancel).await?);
///
///     device.close().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    engine: Engine,
}

impl Device {
    /// Create a device over any transport and initialize it
    ///
    /// Reads the chip mode to pick execution times.
    pub async fn new<T>(transport: T, config: DeviceConfig, cancel: &CancellationToken) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let transport = TracingTransport::new(transport.name(), transport);
        let mut engine = Engine::new(Box::new(transport), config);
        engine.init(cancel).await?;
        Ok(Self { engine })
    }

    /// Open a device speaking raw frames over `stream`
    pub async fn open_raw<S>(stream: S, config: DeviceConfig, cancel: &CancellationToken) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let transport = RawTransport::new(stream).with_wake_delay(config.wake_delay);
        Self::new(transport, config, cancel).await
    }

    /// Open a device behind a kit board on `stream`
    ///
    /// Runs board discovery before initializing the chip.
    pub async fn open_kit<S>(
        stream: S,
        kit: KitConfig,
        config: DeviceConfig,
        cancel: &CancellationToken,
    ) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let kit = kit.with_device_type(config.device_type);
        let transport = KitTransport::connect(stream, kit).await?;
        Self::new(transport, config, cancel).await
    }

    /// Configured device type
    pub fn device_type(&self) -> DeviceType {
        self.engine.config().device_type
    }

    /// Clock divider read from the chip mode
    pub fn clock_divider(&self) -> ClockDivider {
        self.engine.clock_divider()
    }

    /// Execute a raw command, copying response data into `recv`
    pub async fn execute(
        &mut self,
        command: &Command,
        recv: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.engine.execute(command, recv, cancel).await
    }

    /// Get the device revision
    ///
    /// Hard coded into the chip; byte 2 identifies the device family.
    pub async fn revision(&mut self, cancel: &CancellationToken) -> Result<Revision> {
        let mut recv = [0u8; REVISION_SIZE];
        let n = self
            .engine
            .execute(&Command::info(InfoMode::Revision), &mut recv, cancel)
            .await?;
        expect_size(REVISION_SIZE, n)?;
        Ok(Revision::new(recv))
    }

    /// Identify the device family from its revision
    pub async fn detect_device_type(&mut self, cancel: &CancellationToken) -> Result<DeviceType> {
        let revision = self.revision(cancel).await?;
        Ok(DeviceType::from_revision(revision.as_bytes())?)
    }

    /// Get 32 random bytes, updating the RNG seed
    pub async fn random(&mut self, cancel: &CancellationToken) -> Result<[u8; RANDOM_SIZE]> {
        let mut recv = [0u8; RANDOM_SIZE];
        let n = self
            .engine
            .execute(&Command::random(RandomMode::UpdateSeed), &mut recv, cancel)
            .await?;
        expect_size(RANDOM_SIZE, n)?;
        Ok(recv)
    }

    /// Fill `buf` with random bytes, one Random command per 32 bytes
    pub async fn fill_random(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        for chunk in buf.chunks_mut(RANDOM_SIZE) {
            let random = self.random(cancel).await?;
            chunk.copy_from_slice(&random[..chunk.len()]);
        }
        Ok(())
    }

    /// Get the 9-byte serial number
    pub async fn serial_number(&mut self, cancel: &CancellationToken) -> Result<SerialNumber> {
        let mut block = [0u8; BLOCK_SIZE];
        self.engine
            .read_zone(Zone::Config, 0, 0, 0, &mut block, cancel)
            .await?;
        Ok(SerialNumber::from_config(&block)?)
    }

    /// Read one word or block
    pub async fn read_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        block: u8,
        offset: u8,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.engine
            .read_zone(zone, slot, block, offset, buf, cancel)
            .await
    }

    /// Read a byte range from a zone
    pub async fn read_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.engine
            .read_bytes_zone(zone, slot, offset, buf, cancel)
            .await
    }

    /// Write a byte range into a zone
    ///
    /// The config zone is writable while unlocked; once the data zone is
    /// locked only OTP and slots configured for it accept writes.
    /// `offset` and `data.len()` must be multiples of 4. Block alignment is
    /// not required: unaligned edges are written word by word.
    pub async fn write_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.engine
            .write_bytes_zone(zone, slot, offset, data, cancel)
            .await
    }

    /// Read the complete configuration zone
    pub async fn read_config_zone(&mut self, cancel: &CancellationToken) -> Result<[u8; config::ZONE_SIZE]> {
        let mut buf = [0u8; config::ZONE_SIZE];
        self.engine
            .read_bytes_zone(Zone::Config, 0, 0, &mut buf, cancel)
            .await?;
        Ok(buf)
    }

    /// Write a complete configuration zone image
    ///
    /// `data` must be exactly 128 bytes. The first 16 bytes are factory
    /// programmed and skipped; bytes 84 and 85 go through UpdateExtra once
    /// everything else was written.
    ///
    /// Warning: a UserExtra or UserExtraAdd value other than zero can only be
    /// written once.
    pub async fn write_config_zone(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        if data.len() != config::ZONE_SIZE {
            return Err(atecc_core::Error::InvalidInputSize {
                what: "config zone",
                size: data.len(),
            }
            .into());
        }

        let offset = config::PERMANENT_OFFSET;
        let n = self
            .engine
            .write_bytes_zone(Zone::Config, 0, offset, &data[offset..], cancel)
            .await?;

        self.update_extra(UpdateMode::UserExtra, data[config::USER_EXTRA_OFFSET], cancel)
            .await?;
        self.update_extra(UpdateMode::UserExtraAdd, data[config::USER_EXTRA_ADD_OFFSET], cancel)
            .await?;

        info!("Config zone written");
        Ok(n)
    }

    /// Update UserExtra or UserExtraAdd
    pub async fn update_extra(&mut self, mode: UpdateMode, value: u8, cancel: &CancellationToken) -> Result<()> {
        self.engine
            .run(&Command::update_extra(mode, value), cancel)
            .await
    }

    /// Lock state of the config or data zone
    pub async fn lock_state(&mut self, zone: Zone, cancel: &CancellationToken) -> Result<LockState> {
        let lock_byte = match zone {
            Zone::Config => config::LOCK_CONFIG_OFFSET,
            Zone::Data => config::LOCK_VALUE_OFFSET,
            Zone::Otp => {
                return Err(Error::InvalidArgument("otp zone has no lock byte".into()));
            }
        };

        let mut word = [0u8; WORD_SIZE];
        self.engine
            .read_zone(Zone::Config, 0, config::LOCK_BLOCK, config::LOCK_WORD, &mut word, cancel)
            .await?;

        let state = LockState::from_lock_byte(word[lock_byte - config::LOCK_OFFSET]);
        debug!("{} zone is {}", zone, state);
        Ok(state)
    }

    /// Check if the config or data zone is locked
    pub async fn is_locked(&mut self, zone: Zone, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.lock_state(zone, cancel).await?.is_locked())
    }

    /// Same as `is_locked(Zone::Config)`
    pub async fn is_config_zone_locked(&mut self, cancel: &CancellationToken) -> Result<bool> {
        self.is_locked(Zone::Config, cancel).await
    }

    /// Same as `is_locked(Zone::Data)`
    pub async fn is_data_zone_locked(&mut self, cancel: &CancellationToken) -> Result<bool> {
        self.is_locked(Zone::Data, cancel).await
    }

    /// Check if an individual data slot is locked
    pub async fn is_slot_locked(&mut self, slot: u8, cancel: &CancellationToken) -> Result<bool> {
        check_slot(slot)?;

        let mut word = [0u8; WORD_SIZE];
        let block = (config::SLOT_LOCKED_OFFSET / BLOCK_SIZE) as u8;
        let offset = ((config::SLOT_LOCKED_OFFSET % BLOCK_SIZE) / WORD_SIZE) as u8;
        self.engine
            .read_zone(Zone::Config, 0, block, offset, &mut word, cancel)
            .await?;

        let bits = u16::from_le_bytes([word[0], word[1]]);
        Ok(LockState::from_slot_bit(bits & (1 << slot) != 0).is_locked())
    }

    /// Lock the config zone
    pub async fn lock_config_zone(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("Locking config zone");
        self.lock(LockTarget::Config, cancel).await
    }

    /// Lock the data and OTP zones
    pub async fn lock_data_zone(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("Locking data zone");
        self.lock(LockTarget::Data, cancel).await
    }

    /// Lock a single data slot
    pub async fn lock_data_slot(&mut self, slot: u8, cancel: &CancellationToken) -> Result<()> {
        check_slot(slot)?;
        info!("Locking data slot {}", slot);
        self.lock(LockTarget::DataSlot(slot), cancel).await
    }

    async fn lock(&mut self, target: LockTarget, cancel: &CancellationToken) -> Result<()> {
        self.engine.run(&Command::lock(target, 0), cancel).await
    }

    /// Generate a new private key in `slot`, returning its public key
    pub async fn generate_key(&mut self, slot: u8, cancel: &CancellationToken) -> Result<PublicKey> {
        self.gen_key(GenKeyMode::Private, slot, cancel).await
    }

    /// Compute the public key of the private key in `slot`
    pub async fn public_key(&mut self, slot: u8, cancel: &CancellationToken) -> Result<PublicKey> {
        self.gen_key(GenKeyMode::Public, slot, cancel).await
    }

    async fn gen_key(&mut self, mode: GenKeyMode, slot: u8, cancel: &CancellationToken) -> Result<PublicKey> {
        let command = Command::gen_key(mode, u16::from(slot), &[])?;
        let mut recv = [0u8; PUBLIC_KEY_SIZE];
        let n = self.engine.execute(&command, &mut recv, cancel).await?;
        expect_size(PUBLIC_KEY_SIZE, n)?;
        Ok(PublicKey::new(recv))
    }

    /// Sign a 32-byte digest with the private key in `key_id`
    ///
    /// Refreshes the RNG seed, loads the digest into the message buffer and
    /// signs it from there. The signature is R‖S.
    pub async fn sign(&mut self, key_id: u16, digest: &[u8], cancel: &CancellationToken) -> Result<Signature> {
        check_digest(digest)?;

        self.random(cancel).await?;

        let (target, source) = message_buffer(self.device_type());
        self.nonce_load(target, digest, cancel).await?;

        let command = Command::sign(SignMode::External, source, key_id);
        let mut recv = [0u8; SIGNATURE_SIZE];
        let n = self.engine.execute(&command, &mut recv, cancel).await?;
        expect_size(SIGNATURE_SIZE, n)?;
        Ok(Signature::new(recv))
    }

    /// Verify a signature over `digest` with an external public key
    ///
    /// Returns `Ok(false)` when the chip reports a verify failure.
    pub async fn verify_extern(
        &mut self,
        digest: &[u8],
        signature: &Signature,
        public_key: &PublicKey,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        check_digest(digest)?;

        let (target, source) = message_buffer(self.device_type());
        self.nonce_load(target, digest, cancel).await?;

        let command = Command::verify_extern(source, signature.as_ref(), public_key.as_ref())?;
        match self.engine.run(&command, cancel).await {
            Ok(()) => Ok(true),
            Err(e) if e.status() == Some(Status::CheckMacVerifyFailed) => {
                debug!("Signature rejected by device");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn nonce_load(&mut self, target: NonceTarget, input: &[u8], cancel: &CancellationToken) -> Result<()> {
        let command = Command::nonce(NonceMode::Passthrough, target, 0, input)?;
        self.engine.run(&command, cancel).await
    }

    /// Release the transport
    ///
    /// Fails with a not-connected error if called twice.
    pub async fn close(&mut self) -> Result<()> {
        info!("Closing device");
        self.engine.close().await
    }
}

/// Where external messages are loaded for Sign and Verify
fn message_buffer(device_type: DeviceType) -> (NonceTarget, MessageSource) {
    match device_type {
        DeviceType::Atecc608 => (NonceTarget::MessageDigestBuffer, MessageSource::MessageDigestBuffer),
    }
}

fn check_slot(slot: u8) -> Result<()> {
    if u16::from(slot) >= DATA_SLOT_COUNT {
        return Err(atecc_core::Error::InvalidSlot {
            zone: Zone::Data,
            slot: u16::from(slot),
        }
        .into());
    }
    Ok(())
}

fn expect_size(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::UnexpectedResponseSize { expected, actual });
    }
    Ok(())
}
