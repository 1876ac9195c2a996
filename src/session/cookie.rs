//! `Set-Cookie` / `Cookie` header plumbing for session tokens.

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use super::{SessionError, SessionTokens, SESSION_LABEL};
use crate::auth::Identity;
use crate::security::KeyError;

/// Cookie carrying the session token. Matches the claim label so a token minted for
/// another cookie name never verifies here.
pub const SESSION_COOKIE: &str = SESSION_LABEL;

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Secure; SameSite=Lax; Path=/";

/// Binds [`SessionTokens`] to the session cookie.
#[derive(Clone)]
pub struct SessionCookies {
    tokens: Arc<SessionTokens>,
}

impl SessionCookies {
    pub fn new(tokens: Arc<SessionTokens>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    /// `Set-Cookie` value for a freshly issued session. No expiry attributes,
    /// so browsers drop it when the session ends.
    pub fn set_session_cookie(&self, identity: &Identity) -> Result<String, KeyError> {
        let token = self.tokens.issue(identity)?;
        Ok(format!("{SESSION_COOKIE}={token}; {COOKIE_ATTRIBUTES}"))
    }

    /// Verify the session cookie presented with a request.
    pub fn read_session_cookie(&self, headers: &HeaderMap) -> Result<Identity, SessionError> {
        let token = find_cookie(headers, SESSION_COOKIE).ok_or(SessionError::NoCookie)?;
        self.tokens.verify(token)
    }

    /// `Set-Cookie` value that makes the client discard the session.
    pub fn clear_session_cookie() -> String {
        format!(
            "{SESSION_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {COOKIE_ATTRIBUTES}"
        )
    }
}

/// First value of cookie `name` across every `Cookie` header.
fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}
