//! Fixed-size byte values with hex formatting

/// Define a newtype over `[u8; $size]`
///
/// Generates slice conversion, hex parsing and upper-case hex display.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            /// Size in bytes
            pub const SIZE: usize = $size;

            /// Wrap raw bytes
            pub const fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes
            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }

            /// Unwrap into the raw bytes
            pub fn into_bytes(self) -> [u8; $size] {
                self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = $crate::Error;

            fn try_from(bytes: &[u8]) -> $crate::Result<Self> {
                let bytes = <[u8; $size]>::try_from(bytes).map_err(|_| {
                    $crate::Error::Validation(format!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        $size,
                        bytes.len()
                    ))
                })?;
                Ok(Self(bytes))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                let mut bytes = [0u8; $size];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|e| $crate::Error::Parse(format!("{}: {}", stringify!($name), e)))?;
                Ok(Self(bytes))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&hex::encode_upper(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}
