//! ATECC command definitions

use std::fmt;

use bytes::Bytes;

use crate::constants::{
    BLOCK_SIZE, CMD_PAYLOAD_MAX, DIGEST_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE, WORD_SIZE,
    ZONE_READ_WRITE_32,
};
use crate::error::{Error, Result};
use crate::zone::Zone;

/// Command opcodes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Pause = 0x01,
    Mac = 0x08,
    Hmac = 0x11,
    Read = 0x02,
    Write = 0x12,
    Delete = 0x13,
    GenDig = 0x15,
    Nonce = 0x16,
    Lock = 0x17,
    Random = 0x1B,
    DeriveKey = 0x1C,
    UpdateExtra = 0x20,
    Counter = 0x24,
    CheckMac = 0x28,
    Info = 0x30,
    GenKey = 0x40,
    Sign = 0x41,
    Ecdh = 0x43,
    Verify = 0x45,
    PrivWrite = 0x46,
    Sha = 0x47,
    Aes = 0x51,
    Kdf = 0x56,
    SelfTest = 0x77,
    SecureBoot = 0x80,
}

impl Opcode {
    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Pause => "Pause",
            Self::Mac => "MAC",
            Self::Hmac => "HMAC",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Delete => "Delete",
            Self::GenDig => "GenDig",
            Self::Nonce => "Nonce",
            Self::Lock => "Lock",
            Self::Random => "Random",
            Self::DeriveKey => "DeriveKey",
            Self::UpdateExtra => "UpdateExtra",
            Self::Counter => "Counter",
            Self::CheckMac => "CheckMac",
            Self::Info => "Info",
            Self::GenKey => "GenKey",
            Self::Sign => "Sign",
            Self::Ecdh => "ECDH",
            Self::Verify => "Verify",
            Self::PrivWrite => "PrivWrite",
            Self::Sha => "SHA",
            Self::Aes => "AES",
            Self::Kdf => "KDF",
            Self::SelfTest => "SelfTest",
            Self::SecureBoot => "SecureBoot",
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Pause),
            0x08 => Ok(Self::Mac),
            0x11 => Ok(Self::Hmac),
            0x02 => Ok(Self::Read),
            0x12 => Ok(Self::Write),
            0x13 => Ok(Self::Delete),
            0x15 => Ok(Self::GenDig),
            0x16 => Ok(Self::Nonce),
            0x17 => Ok(Self::Lock),
            0x1B => Ok(Self::Random),
            0x1C => Ok(Self::DeriveKey),
            0x20 => Ok(Self::UpdateExtra),
            0x24 => Ok(Self::Counter),
            0x28 => Ok(Self::CheckMac),
            0x30 => Ok(Self::Info),
            0x40 => Ok(Self::GenKey),
            0x41 => Ok(Self::Sign),
            0x43 => Ok(Self::Ecdh),
            0x45 => Ok(Self::Verify),
            0x46 => Ok(Self::PrivWrite),
            0x47 => Ok(Self::Sha),
            0x51 => Ok(Self::Aes),
            0x56 => Ok(Self::Kdf),
            0x77 => Ok(Self::SelfTest),
            0x80 => Ok(Self::SecureBoot),
            _ => Err(Error::UnknownOpcode(value)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Info command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum InfoMode {
    Revision = 0x00,
}

/// Lock command targets
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockTarget {
    /// Configuration zone
    Config,

    /// Data and OTP zones
    Data,

    /// A single data zone slot
    DataSlot(u8),
}

impl LockTarget {
    const ZONE_CONFIG: u8 = 0x00;
    const ZONE_DATA: u8 = 0x01;
    const ZONE_DATA_SLOT: u8 = 0x02;
    const MODE_NO_CRC: u8 = 0x80;

    fn param1(self) -> u8 {
        match self {
            Self::Config => Self::ZONE_CONFIG | Self::MODE_NO_CRC,
            Self::Data => Self::ZONE_DATA | Self::MODE_NO_CRC,
            Self::DataSlot(slot) => Self::ZONE_DATA_SLOT | (slot << 2),
        }
    }
}

/// Random command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum RandomMode {
    UpdateSeed = 0x00,
    NoUpdateSeed = 0x01,
}

/// GenKey command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum GenKeyMode {
    /// Calculate the public key of an existing private key
    Public = 0x00,

    /// Generate a new private key and return its public key
    Private = 0x04,

    /// Key digest
    Digest = 0x08,

    /// Public key digest
    PubKeyDigest = 0x10,

    /// MAC of public key and session key
    Mac = 0x20,
}

/// Nonce command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum NonceMode {
    /// Combine 20 bytes of input with a device random number, updating the seed
    SeedUpdate = 0x00,

    /// Load the input as-is
    Passthrough = 0x03,
}

/// Where Nonce stores its result
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum NonceTarget {
    TempKey = 0x00,
    MessageDigestBuffer = 0x40,
    AlternateKeyBuffer = 0x80,
}

/// Sign command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SignMode {
    Internal = 0x00,
    Invalidate = 0x01,
    IncludeSerialNumber = 0x40,
    External = 0x80,
}

/// Message source for Sign and Verify
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageSource {
    TempKey = 0x00,
    MessageDigestBuffer = 0x20,
}

/// Verify command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum VerifyMode {
    Stored = 0x00,
    ValidateExternal = 0x01,
    External = 0x02,
    Validate = 0x03,
    Invalidate = 0x07,
}

/// Verify key type for P-256 public keys
pub const VERIFY_KEY_P256: u16 = 0x0004;

/// UpdateExtra command modes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateMode {
    /// Config byte 84
    UserExtra = 0x00,

    /// Config byte 85
    UserExtraAdd = 0x01,
}

/// An ATECC command
///
/// # Examples
///
/// ```
/// use atecc_core::command::{Command, InfoMode, Opcode};
///
/// let command = Command::info(InfoMode::Revision);
/// assert_eq!(command.opcode, Opcode::Info);
/// assert!(command.payload.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Opcode
    pub opcode: Opcode,

    /// First parameter (mode, zone...)
    pub param1: u8,

    /// Second parameter (key id, address...)
    pub param2: u16,

    /// Command data
    pub payload: Bytes,
}

impl Command {
    /// Create a command
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload exceeds
    /// [`CMD_PAYLOAD_MAX`].
    pub fn new(opcode: Opcode, param1: u8, param2: u16, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > CMD_PAYLOAD_MAX {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: CMD_PAYLOAD_MAX,
            });
        }

        Ok(Self {
            opcode,
            param1,
            param2,
            payload,
        })
    }

    /// Command without payload
    fn bare(opcode: Opcode, param1: u8, param2: u16) -> Self {
        Self {
            opcode,
            param1,
            param2,
            payload: Bytes::new(),
        }
    }

    /// Info command
    pub fn info(mode: InfoMode) -> Self {
        Self::bare(Opcode::Info, mode as u8, 0)
    }

    /// Lock command
    pub fn lock(target: LockTarget, summary_crc: u16) -> Self {
        Self::bare(Opcode::Lock, target.param1(), summary_crc)
    }

    /// Read command for a word or (with `block`) a 32-byte block
    pub fn read(zone: Zone, address: u16, block: bool) -> Self {
        let mut param1 = u8::from(zone);
        if block {
            param1 |= ZONE_READ_WRITE_32;
        }
        Self::bare(Opcode::Read, param1, address)
    }

    /// Write command
    ///
    /// `value` must be a word or a block; a MAC may only accompany a block.
    pub fn write(zone: Zone, address: u16, value: &[u8], mac: Option<&[u8]>) -> Result<Self> {
        let mut param1 = u8::from(zone);
        let mut payload = Vec::with_capacity(BLOCK_SIZE * 2);
        payload.extend_from_slice(value);

        match value.len() {
            WORD_SIZE if mac.is_some() => return Err(Error::UnexpectedMac),
            WORD_SIZE => {}
            BLOCK_SIZE => {
                param1 |= ZONE_READ_WRITE_32;
                if let Some(mac) = mac {
                    if mac.len() != BLOCK_SIZE {
                        return Err(Error::InvalidInputSize {
                            what: "mac",
                            size: mac.len(),
                        });
                    }
                    payload.extend_from_slice(mac);
                }
            }
            size => return Err(Error::InvalidAccessSize(size)),
        }

        Self::new(Opcode::Write, param1, address, payload)
    }

    /// GenKey command
    pub fn gen_key(mode: GenKeyMode, key_id: u16, other_data: &[u8]) -> Result<Self> {
        Self::new(
            Opcode::GenKey,
            mode as u8,
            key_id,
            Bytes::copy_from_slice(other_data),
        )
    }

    /// Random command
    pub fn random(mode: RandomMode) -> Self {
        Self::bare(Opcode::Random, mode as u8, 0)
    }

    /// Nonce command
    ///
    /// Pass-through accepts 32 or 64 bytes; seed update requires 20 bytes.
    pub fn nonce(mode: NonceMode, target: NonceTarget, param2: u16, input: &[u8]) -> Result<Self> {
        const INPUT_LEN_64: u8 = 0x20;

        let mut param1 = mode as u8;
        match (mode, input.len()) {
            (NonceMode::Passthrough, 32) => {}
            (NonceMode::Passthrough, 64) => param1 |= INPUT_LEN_64,
            (NonceMode::SeedUpdate, 20) => {}
            (_, size) => {
                return Err(Error::InvalidInputSize {
                    what: "nonce",
                    size,
                });
            }
        }
        param1 |= target as u8;

        Self::new(Opcode::Nonce, param1, param2, Bytes::copy_from_slice(input))
    }

    /// Sign command
    pub fn sign(mode: SignMode, source: MessageSource, key_id: u16) -> Self {
        Self::bare(Opcode::Sign, mode as u8 | source as u8, key_id)
    }

    /// Verify command in external mode with a P-256 public key
    pub fn verify_extern(source: MessageSource, signature: &[u8], public_key: &[u8]) -> Result<Self> {
        if signature.len() != SIGNATURE_SIZE {
            return Err(Error::InvalidInputSize {
                what: "signature",
                size: signature.len(),
            });
        }
        if public_key.len() != PUBLIC_KEY_SIZE {
            return Err(Error::InvalidInputSize {
                what: "public key",
                size: public_key.len(),
            });
        }

        let mut payload = Vec::with_capacity(SIGNATURE_SIZE + PUBLIC_KEY_SIZE);
        payload.extend_from_slice(signature);
        payload.extend_from_slice(public_key);

        Self::new(
            Opcode::Verify,
            VerifyMode::External as u8 | source as u8,
            VERIFY_KEY_P256,
            payload,
        )
    }

    /// UpdateExtra command
    pub fn update_extra(mode: UpdateMode, value: u8) -> Self {
        Self::bare(Opcode::UpdateExtra, mode as u8, u16::from(value))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(p1=0x{:02X}, p2=0x{:04X}, len={})",
            self.opcode,
            self.param1,
            self.param2,
            self.payload.len()
        )
    }
}

/// Check that a digest has the size Sign and Verify expect
pub fn check_digest(digest: &[u8]) -> Result<()> {
    if digest.len() != DIGEST_SIZE {
        return Err(Error::InvalidInputSize {
            what: "digest",
            size: digest.len(),
        });
    }
    Ok(())
}
