//! TOML configuration with environment overrides.
//!
//! Loaded once at startup, then [`Config::validate`] turns the raw strings into
//! typed runtime values. Nothing downstream re-reads the environment.

pub mod schema;

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::auth::{check_password_hash, ConfiguredIdentity};
use crate::security::{KeyError, SecretKey};

pub use schema::{AuthConfig, Config, GatewayConfig, LogConfig};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "TIMELOG_";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid secret key: {0}")]
    Key(#[from] KeyError),
    #[error("invalid user id: {0}")]
    UserId(String),
    #[error("`auth.password_hash` is not a valid PHC string: {0}")]
    PasswordHash(String),
}

/// Everything the session layer needs, decoded and checked.
#[derive(Debug)]
pub struct RuntimeAuth {
    pub secret_key: SecretKey,
    pub account: ConfiguredIdentity,
    /// `None` when expiry is disabled.
    pub session_max_age_secs: Option<u64>,
}

/// Platform default location, e.g. `~/.config/timelog/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "timelog")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load from `path` (or the default location), then apply `TIMELOG_*` overrides.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment values. `lookup` is injectable so tests don't touch
    /// the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        };

        if let Some((_, host)) = var("HOST") {
            self.gateway.host = host;
        }
        if let Some((name, port)) = var("PORT") {
            self.gateway.port = parse_env(&name, &port)?;
        }
        if let Some((name, trust)) = var("TRUST_FORWARDED_HEADERS") {
            self.gateway.trust_forwarded_headers = parse_env(&name, &trust)?;
        }
        if let Some((_, key)) = var("SECRET_KEY") {
            self.auth.secret_key = Some(key);
        }
        if let Some((_, username)) = var("USERNAME") {
            self.auth.username = Some(username);
        }
        if let Some((_, hash)) = var("PASSWORD_HASH") {
            self.auth.password_hash = Some(hash);
        }
        if let Some((_, id)) = var("USER_ID") {
            self.auth.user_id = Some(id);
        }
        if let Some((name, secs)) = var("SESSION_MAX_AGE_SECS") {
            self.auth.session_max_age_secs = parse_env(&name, &secs)?;
        }
        if let Some((_, level)) = var("LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some((_, environment)) = var("ENVIRONMENT") {
            self.environment = environment;
        }
        Ok(())
    }

    /// Decode and check the auth settings. Any failure here is startup-fatal.
    pub fn validate(&self) -> Result<RuntimeAuth, ConfigError> {
        let hex_key = self
            .auth
            .secret_key
            .as_deref()
            .ok_or(ConfigError::Missing("auth.secret_key"))?;
        let secret_key = SecretKey::from_hex(hex_key)?;

        let username = self
            .auth
            .username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::Missing("auth.username"))?;

        let password_hash = self
            .auth
            .password_hash
            .as_deref()
            .map(str::trim)
            .filter(|hash| !hash.is_empty())
            .ok_or(ConfigError::Missing("auth.password_hash"))?;
        check_password_hash(password_hash)
            .map_err(|e| ConfigError::PasswordHash(e.to_string()))?;

        let raw_id = self
            .auth
            .user_id
            .as_deref()
            .ok_or(ConfigError::Missing("auth.user_id"))?;
        let user_id =
            Uuid::parse_str(raw_id.trim()).map_err(|e| ConfigError::UserId(e.to_string()))?;

        Ok(RuntimeAuth {
            secret_key,
            account: ConfiguredIdentity::new(user_id, username, password_hash),
            session_max_age_secs: Some(self.auth.session_max_age_secs).filter(|secs| *secs > 0),
        })
    }

    /// JSON Schema for the config file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var: var.to_owned(),
        reason: e.to_string(),
    })
}
