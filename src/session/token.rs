//! Session token issuance and verification.
//!
//! Claim plaintext: `session:<uuid>` or, when a maximum age is configured,
//! `session:<uuid>:<issued-at unix secs>`. The claim is sealed with
//! [`AeadCodec`] and transported as unpadded base64url.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

use super::SessionError;
use crate::auth::Identity;
use crate::security::{AeadCodec, KeyError, SecretKey, NONCE_LEN};

/// Context label bound into every claim; also the cookie name.
pub const SESSION_LABEL: &str = "session";

/// Separator between claim fields. Cannot occur in the label, a hyphenated UUID
/// or a decimal timestamp.
const CLAIM_SEPARATOR: char = ':';

/// Tolerated clock skew for tokens that claim to be issued in the future.
const MAX_CLOCK_SKEW_SECS: u64 = 60;

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Issues and verifies session tokens under one process key.
pub struct SessionTokens {
    codec: AeadCodec,
    label: &'static str,
    /// `None` keeps tokens valid until the key rotates.
    max_age_secs: Option<u64>,
}

impl SessionTokens {
    pub fn new(key: &SecretKey, max_age_secs: Option<u64>) -> Result<Self, KeyError> {
        Ok(Self {
            codec: AeadCodec::new(key)?,
            label: SESSION_LABEL,
            max_age_secs: max_age_secs.filter(|secs| *secs > 0),
        })
    }

    pub fn shared(key: &SecretKey, max_age_secs: Option<u64>) -> Result<Arc<Self>, KeyError> {
        Self::new(key, max_age_secs).map(Arc::new)
    }

    pub fn max_age_secs(&self) -> Option<u64> {
        self.max_age_secs
    }

    /// Mint a token for `identity`.
    pub fn issue(&self, identity: &Identity) -> Result<String, KeyError> {
        self.issue_at(identity, epoch_secs())
    }

    pub(crate) fn issue_at(&self, identity: &Identity, now: u64) -> Result<String, KeyError> {
        let id = identity.id.hyphenated();
        let claim = match self.max_age_secs {
            Some(_) => format!("{}{CLAIM_SEPARATOR}{id}{CLAIM_SEPARATOR}{now}", self.label),
            None => format!("{}{CLAIM_SEPARATOR}{id}", self.label),
        };
        let sealed = self.codec.seal(claim.as_bytes())?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Recover the identity a token was issued for.
    ///
    /// The returned identity carries only the id; display names are not embedded.
    pub fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        self.verify_at(token, epoch_secs())
    }

    pub(crate) fn verify_at(&self, token: &str, now: u64) -> Result<Identity, SessionError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| SessionError::MalformedToken)?;
        if sealed.len() < NONCE_LEN {
            return Err(SessionError::MalformedToken);
        }

        let plaintext = self
            .codec
            .open(&sealed)
            .map_err(|_| SessionError::InvalidToken)?;
        let claim = String::from_utf8(plaintext).map_err(|_| SessionError::MalformedToken)?;

        let (label, rest) = claim
            .split_once(CLAIM_SEPARATOR)
            .ok_or(SessionError::MalformedToken)?;
        if label != self.label {
            return Err(SessionError::InvalidToken);
        }

        let (id_part, issued_part) = match rest.split_once(CLAIM_SEPARATOR) {
            Some((id, issued)) => (id, Some(issued)),
            None => (rest, None),
        };
        let id = Uuid::parse_str(id_part).map_err(|_| SessionError::MalformedToken)?;
        let issued_at = issued_part
            .map(|raw| raw.parse::<u64>().map_err(|_| SessionError::MalformedToken))
            .transpose()?;

        if let Some(max_age) = self.max_age_secs {
            let issued_at = issued_at.ok_or(SessionError::InvalidToken)?;
            if issued_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
                return Err(SessionError::InvalidToken);
            }
            if now.saturating_sub(issued_at) > max_age {
                return Err(SessionError::InvalidToken);
            }
        }

        Ok(Identity::new(id))
    }
}
