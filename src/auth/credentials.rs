//! Username/password validation against an [`IdentitySource`].

use std::sync::Arc;

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use uuid::Uuid;

use super::Identity;

/// Login rejected. Deliberately carries no detail about which check failed.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("invalid username or password")]
pub struct InvalidCredentials;

/// What an identity source returns for a username.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub identity: Identity,
    /// Argon2 PHC string.
    pub password_hash: String,
}

/// Lookup capability behind the validator. A multi-user store can implement
/// this without touching the token layer.
pub trait IdentitySource: Send + Sync {
    fn find_by_username(&self, username: &str) -> Option<StoredCredential>;

    /// Re-resolve an identity (with display name) from a verified session id.
    fn find_by_id(&self, id: &Uuid) -> Option<Identity>;
}

/// The one account this deployment serves, taken from configuration.
#[derive(Clone)]
pub struct ConfiguredIdentity {
    username: String,
    password_hash: String,
    id: Uuid,
}

impl ConfiguredIdentity {
    pub fn new(id: Uuid, username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn identity(&self) -> Identity {
        Identity::new(self.id).with_display_name(self.username.clone())
    }
}

impl std::fmt::Debug for ConfiguredIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredIdentity")
            .field("username", &self.username)
            .field("id", &self.id)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

impl IdentitySource for ConfiguredIdentity {
    fn find_by_username(&self, username: &str) -> Option<StoredCredential> {
        // Usernames are not secret; a plain comparison is fine here.
        (username == self.username).then(|| StoredCredential {
            identity: self.identity(),
            password_hash: self.password_hash.clone(),
        })
    }

    fn find_by_id(&self, id: &Uuid) -> Option<Identity> {
        (*id == self.id).then(|| self.identity())
    }
}

/// Verifies login attempts against an [`IdentitySource`].
pub struct CredentialValidator {
    source: Arc<dyn IdentitySource>,
    /// Verified against when the username is unknown, so both failure paths cost one Argon2 run.
    decoy_hash: String,
}

impl CredentialValidator {
    pub fn new(source: Arc<dyn IdentitySource>) -> Result<Self, password_hash::Error> {
        let mut decoy_password = [0u8; 32];
        password_hash::rand_core::RngCore::fill_bytes(&mut OsRng, &mut decoy_password);
        let decoy_hash = hash_password_bytes(&decoy_password)?;
        Ok(Self { source, decoy_hash })
    }

    /// Check a login attempt. Unknown user and wrong password are indistinguishable.
    pub fn validate(&self, username: &str, password: &str) -> Result<Identity, InvalidCredentials> {
        match self.source.find_by_username(username) {
            Some(stored) => {
                if verify_password(&stored.password_hash, password) {
                    Ok(stored.identity)
                } else {
                    Err(InvalidCredentials)
                }
            }
            None => {
                let _ = verify_password(&self.decoy_hash, password);
                Err(InvalidCredentials)
            }
        }
    }

    /// Look up the full identity behind a verified session.
    pub fn resolve(&self, id: &Uuid) -> Option<Identity> {
        self.source.find_by_id(id)
    }
}

fn verify_password(phc: &str, password: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn hash_password_bytes(password: &[u8]) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password, &salt)?.to_string())
}

/// Produce an Argon2id PHC string for `timelog hash-password`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    hash_password_bytes(password.as_bytes())
}

/// Reject configuration values that are not parsable PHC strings.
pub fn check_password_hash(phc: &str) -> Result<(), password_hash::Error> {
    PasswordHash::new(phc).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_ID: &str = "3fe9a1c2-5b7d-4e8f-9a0b-1c2d3e4f5a6b";

    fn validator() -> CredentialValidator {
        let hash = hash_password("correct horse").unwrap();
        let account = ConfiguredIdentity::new(Uuid::parse_str(USER_ID).unwrap(), "andras", hash);
        CredentialValidator::new(Arc::new(account)).unwrap()
    }

    #[test]
    fn correct_credentials_return_configured_identity() {
        let identity = validator().validate("andras", "correct horse").unwrap();
        assert_eq!(identity.id.to_string(), USER_ID);
        assert_eq!(identity.display_name.as_deref(), Some("andras"));
    }

    #[test]
    fn unknown_user_and_wrong_password_fail_identically() {
        let validator = validator();
        let unknown = validator.validate("nouser", "anypass").unwrap_err();
        let wrong = validator.validate("andras", "wrongpass").unwrap_err();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn username_match_is_exact() {
        let validator = validator();
        assert!(validator.validate("Andras", "correct horse").is_err());
        assert!(validator.validate(" andras", "correct horse").is_err());
    }

    #[test]
    fn unparsable_stored_hash_never_validates() {
        let account = ConfiguredIdentity::new(Uuid::new_v4(), "andras", "plaintext-oops");
        let validator = CredentialValidator::new(Arc::new(account)).unwrap();
        assert_eq!(
            validator.validate("andras", "plaintext-oops"),
            Err(InvalidCredentials)
        );
    }

    #[test]
    fn resolve_restores_display_name() {
        let validator = validator();
        let id = Uuid::parse_str(USER_ID).unwrap();
        assert_eq!(
            validator.resolve(&id).unwrap().display_name.as_deref(),
            Some("andras")
        );
        assert!(validator.resolve(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn hashes_are_salted_phc_strings() {
        let a = hash_password("pw").unwrap();
        let b = hash_password("pw").unwrap();
        assert!(a.starts_with("$argon2"));
        assert_ne!(a, b);
        assert!(check_password_hash(&a).is_ok());
        assert!(check_password_hash("not a hash").is_err());
    }

    #[test]
    fn debug_redacts_password_hash() {
        let account = ConfiguredIdentity::new(Uuid::new_v4(), "andras", "$argon2id$secret");
        assert!(!format!("{account:?}").contains("secret"));
    }
}
