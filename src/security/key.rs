//! Process-wide symmetric key for session sealing.
//!
//! The key is decoded from hex exactly once, at startup, and then handed by
//! reference into the token service. Both AES-128 and AES-256 key lengths are
//! accepted; anything else is rejected before the gateway binds.

use std::fmt;

/// AES-128 key length in bytes.
pub const AES_128_KEY_LEN: usize = 16;

/// AES-256 key length in bytes.
pub const AES_256_KEY_LEN: usize = 32;

/// Errors raised while building or using a [`SecretKey`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("secret key is not valid hex: {0}")]
    InvalidHex(String),
    #[error("secret key must be {AES_128_KEY_LEN} or {AES_256_KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("cipher initialisation failed")]
    Cipher,
}

/// Raw AES key bytes. `Debug` is redacted and the bytes are zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Build a key from raw bytes, checking the length against the supported ciphers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.len() {
            AES_128_KEY_LEN | AES_256_KEY_LEN => Ok(Self(bytes.to_vec())),
            other => Err(KeyError::InvalidLength(other)),
        }
    }

    /// Decode a hex configuration value (surrounding whitespace is ignored).
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(encoded.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Generate a fresh random key of the given length from the OS CSPRNG.
    pub fn generate(len: usize) -> Result<Self, KeyError> {
        use aes_gcm::aead::rand_core::RngCore;
        use aes_gcm::aead::OsRng;

        if len != AES_128_KEY_LEN && len != AES_256_KEY_LEN {
            return Err(KeyError::InvalidLength(len));
        }
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex form, used only by `timelog generate-key`.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}
