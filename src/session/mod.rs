//! Stateless cookie sessions.
//!
//! [`SessionTokens`] seals an identity claim; [`SessionCookies`] moves the
//! resulting token in and out of HTTP headers. Every verification failure is
//! reported to clients identically; the variants below exist for logs only.

pub mod cookie;
pub mod token;

pub use cookie::{SessionCookies, SESSION_COOKIE};
pub use token::{SessionTokens, SESSION_LABEL};

/// Why a presented session was rejected.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// Not valid base64url, too short, or the claim does not parse.
    #[error("malformed session token")]
    MalformedToken,
    /// Failed authentication, carries a foreign context label, or has expired.
    #[error("invalid session token")]
    InvalidToken,
    #[error("no session cookie")]
    NoCookie,
}

impl SessionError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::MalformedToken => "malformed",
            SessionError::InvalidToken => "invalid",
            SessionError::NoCookie => "no_cookie",
        }
    }
}
