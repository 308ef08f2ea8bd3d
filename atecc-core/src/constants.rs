//! Protocol constants

/// Size of a block access
pub const BLOCK_SIZE: usize = 32;

/// Size of a word access
pub const WORD_SIZE: usize = 4;

/// Words per block
pub const WORDS_PER_BLOCK: usize = BLOCK_SIZE / WORD_SIZE;

/// Smallest command frame: length, opcode, param1, param2 and crc
pub const CMD_SIZE_MIN: usize = 7;

/// Largest command payload
pub const CMD_PAYLOAD_MAX: usize = 4 * 36 + 7;

/// Response overhead: length byte and crc
pub const RSP_OVERHEAD: usize = 3;

/// Smallest valid response (length, status, crc)
pub const RSP_SIZE_MIN: usize = 4;

/// Zone parameter bit 7: access 32 bytes, otherwise 4 bytes
pub const ZONE_READ_WRITE_32: u8 = 0x80;

/// Default I2C address of the chip
pub const DEFAULT_I2C_ADDRESS: u8 = 0x60;

/// Default wake delay (tWHI + tWLO) in microseconds
pub const DEFAULT_WAKE_DELAY_US: u64 = 1500;

/// Default number of transmit retries
pub const DEFAULT_RX_RETRIES: u32 = 20;

/// I2C word addresses written ahead of a transfer
pub mod word_address {
    /// Wake pulse
    pub const RESET: u8 = 0x00;

    /// Put the chip to sleep
    pub const SLEEP: u8 = 0x01;

    /// Put the chip in idle mode
    pub const IDLE: u8 = 0x02;

    /// A command frame follows
    pub const COMMAND: u8 = 0x03;
}

/// Configuration zone layout
pub mod config {
    /// Configuration zone size
    pub const ZONE_SIZE: usize = 128;

    /// OTP zone size
    pub const OTP_ZONE_SIZE: usize = 64;

    /// Serial number bytes 0..4
    pub const SN03_OFFSET: usize = 0;

    /// Revision number
    pub const REVISION_OFFSET: usize = 4;

    /// Serial number bytes 4..9
    pub const SN48_OFFSET: usize = 8;

    /// Serial number length
    pub const SERIAL_NUMBER_SIZE: usize = 9;

    /// Byte holding the ChipMode bits (clock divider in bits 3..7)
    pub const CHIP_MODE_OFFSET: usize = 19;

    /// First 16 bytes are written by the factory and cannot be changed
    pub const PERMANENT_OFFSET: usize = 16;

    /// Block holding the lock bytes
    pub const LOCK_BLOCK: u8 = 2;

    /// Word within [`LOCK_BLOCK`] holding the lock bytes
    pub const LOCK_WORD: u8 = 5;

    /// Byte offset of the lock word (UserExtra, UserExtraAdd, LockValue, LockConfig)
    pub const LOCK_OFFSET: usize = LOCK_BLOCK as usize * 32 + LOCK_WORD as usize * 4;

    /// UserExtra byte, written with UpdateExtra only
    pub const USER_EXTRA_OFFSET: usize = 84;

    /// UserExtraAdd byte, written with UpdateExtra only
    pub const USER_EXTRA_ADD_OFFSET: usize = 85;

    /// Data zone lock byte
    pub const LOCK_VALUE_OFFSET: usize = 86;

    /// Configuration zone lock byte
    pub const LOCK_CONFIG_OFFSET: usize = 87;

    /// Per-slot lock bits (16 bits, little-endian, bit clear = locked)
    pub const SLOT_LOCKED_OFFSET: usize = 88;

    /// Lock byte value of an unlocked zone
    pub const LOCK_UNLOCKED: u8 = 0x55;
}

/// Number of data zone slots
pub const DATA_SLOT_COUNT: u16 = 16;

/// Public key size (X and Y of a P-256 point)
pub const PUBLIC_KEY_SIZE: usize = 64;

/// Signature size (R and S of a P-256 signature)
pub const SIGNATURE_SIZE: usize = 64;

/// Random command output size
pub const RANDOM_SIZE: usize = 32;

/// Info command output size
pub const REVISION_SIZE: usize = 4;

/// Digest size accepted by Sign and Verify
pub const DIGEST_SIZE: usize = 32;
