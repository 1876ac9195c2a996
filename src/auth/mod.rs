//! Login identity and credential checks.
//!
//! Provides:
//! - [`Identity`]: the user a session belongs to (UUID + optional display name)
//! - [`IdentitySource`]: pluggable username / id lookup
//! - [`ConfiguredIdentity`]: the single account configured out-of-band
//! - [`CredentialValidator`]: Argon2 password verification with a uniform failure
//!
//! ## Design Decisions
//! - The token layer never creates identities; it only recovers the id.
//! - Unknown usernames still pay for one Argon2 verification so response
//!   timing does not reveal which usernames exist.

pub mod credentials;

use uuid::Uuid;

pub use credentials::{
    check_password_hash, hash_password, ConfiguredIdentity, CredentialValidator,
    IdentitySource, InvalidCredentials, StoredCredential,
};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
