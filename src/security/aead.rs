//! AES-GCM sealing for session claims.
//!
//! Sealed blobs have the layout `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! A fresh nonce is drawn from the OS CSPRNG for every seal; a repeated
//! (key, nonce) pair would void GCM's guarantees.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};

use super::key::{KeyError, SecretKey, AES_128_KEY_LEN, AES_256_KEY_LEN};

/// Nonce size for AES-GCM (12 bytes / 96 bits).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag size.
pub const TAG_LEN: usize = 16;

/// Opening failed: input too short, wrong key, or any modified byte.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("ciphertext failed authentication")]
pub struct AuthenticationError;

enum Cipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// Seals and opens byte strings under a single [`SecretKey`].
pub struct AeadCodec {
    cipher: Cipher,
}

impl AeadCodec {
    /// Pick the cipher matching the key length.
    pub fn new(key: &SecretKey) -> Result<Self, KeyError> {
        let cipher = match key.len() {
            AES_128_KEY_LEN => Cipher::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key.as_bytes()).map_err(|_| KeyError::Cipher)?,
            )),
            AES_256_KEY_LEN => Cipher::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| KeyError::Cipher)?,
            )),
            other => return Err(KeyError::InvalidLength(other)),
        };
        Ok(Self { cipher })
    }

    /// Encrypt and authenticate `plaintext`, returning `nonce || ciphertext_with_tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let (nonce, ciphertext) = match &self.cipher {
            Cipher::Aes128(c) => {
                let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
                let ct = c.encrypt(&nonce, plaintext).map_err(|_| KeyError::Cipher)?;
                (nonce, ct)
            }
            Cipher::Aes256(c) => {
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                let ct = c.encrypt(&nonce, plaintext).map_err(|_| KeyError::Cipher)?;
                (nonce, ct)
            }
        };

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(nonce.as_slice());
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    /// Split off the nonce and authenticate-decrypt the remainder.
    ///
    /// Either the whole plaintext authenticates or nothing is returned.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, AuthenticationError> {
        if sealed.len() < NONCE_LEN {
            return Err(AuthenticationError);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        match &self.cipher {
            Cipher::Aes128(c) => c.decrypt(nonce, ciphertext),
            Cipher::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
        .map_err(|_| AuthenticationError)
    }
}
