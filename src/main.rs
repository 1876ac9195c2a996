use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use timelog::auth::hash_password;
use timelog::config::{default_config_path, Config, LogConfig};
use timelog::gateway::{self, AppState};
use timelog::security::{SecretKey, AES_128_KEY_LEN, AES_256_KEY_LEN};

/// `timelog` - session-authenticated time logging service.
#[derive(Parser, Debug)]
#[command(name = "timelog")]
#[command(author, version, about = "Session-authenticated timelog web service.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Config file (defaults to the platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind host, overrides config and TIMELOG_HOST
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides config and TIMELOG_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print an Argon2 hash for the configured account's password
    HashPassword {
        password: String,
    },

    /// Print a fresh random hex secret key
    GenerateKey {
        #[arg(long, value_enum, default_value_t = KeyBits::Aes256)]
        bits: KeyBits,
    },

    /// Print the JSON Schema of the config file
    ConfigSchema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KeyBits {
    #[value(name = "128")]
    Aes128,
    #[value(name = "256")]
    Aes256,
}

impl KeyBits {
    fn key_len(self) -> usize {
        match self {
            KeyBits::Aes128 => AES_128_KEY_LEN,
            KeyBits::Aes256 => AES_256_KEY_LEN,
        }
    }
}

fn init_tracing(log: &LogConfig, environment: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Production logs go to collectors; everything else is for humans.
    if environment.eq_ignore_ascii_case("production") {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = Config::load(config.as_deref()).context("failed to load config")?;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            init_tracing(&config.log, &config.environment);
            tracing::info!(
                environment = %config.environment,
                version = env!("CARGO_PKG_VERSION"),
                "Starting timelog"
            );

            let auth = config.validate().context("invalid configuration")?;
            tracing::info!(
                username = %auth.account.username(),
                key_bits = auth.secret_key.len() * 8,
                max_age_secs = ?auth.session_max_age_secs,
                "Session layer configured"
            );

            let state = AppState::from_runtime(auth, &config.gateway)?;
            gateway::run_gateway(&config.gateway.host, config.gateway.port, state).await
        }
        Commands::HashPassword { password } => {
            let hash = hash_password(&password)
                .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
            println!("{hash}");
            println!();
            println!("TIMELOG_PASSWORD_HASH='{hash}'");
            Ok(())
        }
        Commands::GenerateKey { bits } => {
            let key = SecretKey::generate(bits.key_len())?;
            println!("{}", key.to_hex());
            Ok(())
        }
        Commands::ConfigSchema => {
            let schema = serde_json::to_string_pretty(&Config::json_schema())?;
            println!("{schema}");
            if let Some(path) = default_config_path() {
                eprintln!("# default config path: {}", path.display());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "timelog", "serve", "--config", "/tmp/t.toml", "--host", "0.0.0.0", "-p", "9000",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve { config, host, port } => {
                assert_eq!(config, Some(PathBuf::from("/tmp/t.toml")));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn generate_key_rejects_unsupported_sizes() {
        assert!(Cli::try_parse_from(["timelog", "generate-key", "--bits", "192"]).is_err());
        let cli = Cli::try_parse_from(["timelog", "generate-key", "--bits", "128"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::GenerateKey {
                bits: KeyBits::Aes128
            }
        ));
    }
}
