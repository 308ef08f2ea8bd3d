//! P-256 key material

fixed_bytes!(
    /// Uncompressed P-256 public key as X‖Y, without the 0x04 prefix
    PublicKey,
    64
);

impl PublicKey {
    /// X coordinate
    pub fn x(&self) -> &[u8] {
        &self.0[..32]
    }

    /// Y coordinate
    pub fn y(&self) -> &[u8] {
        &self.0[32..]
    }
}

fixed_bytes!(
    /// ECDSA P-256 signature as R‖S
    Signature,
    64
);

impl Signature {
    /// R component
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// S component
    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }
}
