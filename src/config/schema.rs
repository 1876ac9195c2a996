use schemars::JsonSchema;
use serde::Deserialize;

/// Top-level `config.toml`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Free-form deployment label, logged at startup.
    pub environment: String,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            gateway: GatewayConfig::default(),
            auth: AuthConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind address. Defaults to loopback.
    pub host: String,
    pub port: u16,
    /// Login attempts allowed per client per minute (0 = unlimited).
    pub login_attempts_per_minute: u32,
    /// Charge login attempts to `X-Forwarded-For` / `X-Real-IP` instead of the
    /// TCP peer. Only enable behind a reverse proxy that sets these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            login_attempts_per_minute: 10,
            trust_forwarded_headers: false,
        }
    }
}

/// `[auth]` section. Secrets are usually supplied through the environment instead.
#[derive(Clone, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Hex-encoded AES key: 32 hex chars (AES-128) or 64 (AES-256).
    pub secret_key: Option<String>,
    pub username: Option<String>,
    /// Argon2 PHC string, see `timelog hash-password`.
    pub password_hash: Option<String>,
    /// UUID of the configured account.
    pub user_id: Option<String>,
    /// Maximum session age in seconds; 0 disables expiry.
    pub session_max_age_secs: u64,
}

/// One week.
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            username: None,
            password_hash: None,
            user_id: None,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthConfig")
            .field("secret_key", &redact(&self.secret_key))
            .field("username", &self.username)
            .field("password_hash", &redact(&self.password_hash))
            .field("user_id", &self.user_id)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .finish()
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `timelog=debug`. `RUST_LOG` wins.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
