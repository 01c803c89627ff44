//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Relay configuration, assembled from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Telegram bot token (the bearer credential embedded in API URLs).
    pub bot_token: SecretString,
    /// Path to the local delivery-log database file.
    pub db_path: PathBuf,
    /// Sleep between poll cycles.
    pub poll_interval: Duration,
    /// Upper bound on each getUpdates / sendMessage request. A hang in
    /// either call stalls the whole loop, so the transport must be bounded.
    pub request_timeout: Duration,
}

impl RelayConfig {
    /// Read configuration from the environment.
    ///
    /// `BOT_TOKEN` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN".to_string()))?;

        let db_path = std::env::var("RELAY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/relay.db"));

        let poll_interval = env_secs("RELAY_POLL_INTERVAL_SECS", 1)?;
        let request_timeout = env_secs("RELAY_REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            db_path,
            poll_interval,
            request_timeout,
        })
    }
}

/// Parse a whole-seconds duration from an env var, falling back to `default`
/// when unset. A set-but-unparseable value is a configuration error, not a
/// silent fallback.
fn env_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected whole seconds, got {raw:?}"),
            })?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
