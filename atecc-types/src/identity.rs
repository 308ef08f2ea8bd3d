//! Chip identity values

use crate::{Error, Result};

fixed_bytes!(
    /// Info command revision word
    ///
    /// Byte 2 identifies the device family.
    Revision,
    4
);

impl Revision {
    /// Device family code
    pub fn family(&self) -> u8 {
        self.0[2]
    }

    /// Silicon revision code
    pub fn silicon(&self) -> u8 {
        self.0[3]
    }
}

fixed_bytes!(
    /// Factory programmed 9-byte serial number
    ///
    /// # Examples
    ///
    /// ```
    /// use atecc_types::SerialNumber;
    ///
    /// let sn: SerialNumber = "0123A1B2C3D4E5F6EE".parse().unwrap();
    /// assert_eq!(sn.to_string(), "0123A1B2C3D4E5F6EE");
    /// ```
    SerialNumber,
    9
);

impl SerialNumber {
    /// Assemble the serial number from the start of the config zone
    ///
    /// SN[0..4] lives at bytes 0..4 and SN[4..9] at bytes 8..13.
    pub fn from_config(config: &[u8]) -> Result<Self> {
        if config.len() < 13 {
            return Err(Error::Validation(format!(
                "config excerpt must be at least 13 bytes, got {}",
                config.len()
            )));
        }

        let mut sn = [0u8; 9];
        sn[..4].copy_from_slice(&config[0..4]);
        sn[4..].copy_from_slice(&config[8..13]);
        Ok(Self(sn))
    }
}
