//! Key handling and authenticated encryption for session tokens.

pub mod aead;
pub mod key;

pub use aead::{AeadCodec, AuthenticationError, NONCE_LEN, TAG_LEN};
pub use key::{KeyError, SecretKey, AES_128_KEY_LEN, AES_256_KEY_LEN};
