//! Signal Service configuration.
//!
//! Configuration is loaded from environment variables. The grant-signing
//! credentials are required: serving tokens without them would be
//! insecure, so startup aborts when they are absent. Sensitive fields are
//! redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default bind address for the combined WebSocket/HTTP listener.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default room-grant TTL in seconds.
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 3600;

/// Default grace window for rejected calls, in seconds.
///
/// A rejected session is retained this long so a straggling message
/// referencing it still resolves to a meaningful `wrong-state` error.
pub const DEFAULT_REJECT_GRACE_SECONDS: u64 = 5;

/// Default grace window for sessions ended by a disconnect, in seconds.
///
/// Longer than the reject window: disconnects can leave more in-flight
/// messages behind them.
pub const DEFAULT_DISCONNECT_GRACE_SECONDS: u64 = 10;

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "signal";

/// Signal Service configuration.
///
/// Loaded from environment variables with sensible defaults for everything
/// except the grant-signing credentials.
#[derive(Clone)]
pub struct Config {
    /// Bind address for the WebSocket/HTTP listener (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// API key identifying this service to the media plane (grant issuer).
    pub token_api_key: String,

    /// Secret used to sign room grants.
    /// Protected by `SecretString` to prevent accidental logging.
    pub token_api_secret: SecretString,

    /// Room-grant TTL in seconds (default: 3600).
    pub token_ttl_seconds: u64,

    /// Grace window for rejected calls in seconds (default: 5).
    pub reject_grace_seconds: u64,

    /// Grace window for disconnect-ended calls in seconds (default: 10).
    pub disconnect_grace_seconds: u64,

    /// Unique identifier for this service instance.
    pub instance_id: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("token_api_key", &self.token_api_key)
            .field("token_api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("reject_grace_seconds", &self.reject_grace_seconds)
            .field("disconnect_grace_seconds", &self.disconnect_grace_seconds)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when a required signing
    /// credential is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when a required signing
    /// credential is absent.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_api_key = vars
            .get("SIGNAL_TOKEN_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("SIGNAL_TOKEN_API_KEY".to_string()))?
            .clone();

        let token_api_secret = SecretString::from(
            vars.get("SIGNAL_TOKEN_API_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("SIGNAL_TOKEN_API_SECRET".to_string()))?
                .clone(),
        );

        let bind_address = vars
            .get("SIGNAL_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token_ttl_seconds = vars
            .get("SIGNAL_TOKEN_TTL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

        let reject_grace_seconds = vars
            .get("SIGNAL_REJECT_GRACE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REJECT_GRACE_SECONDS);

        let disconnect_grace_seconds = vars
            .get("SIGNAL_DISCONNECT_GRACE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DISCONNECT_GRACE_SECONDS);

        // Generate instance ID
        let instance_id = vars.get("SIGNAL_INSTANCE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            token_api_key,
            token_api_secret,
            token_ttl_seconds,
            reject_grace_seconds,
            disconnect_grace_seconds,
            instance_id,
        })
    }

    /// Grant TTL as a [`Duration`].
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    /// Reject grace window as a [`Duration`].
    #[must_use]
    pub fn reject_grace(&self) -> Duration {
        Duration::from_secs(self.reject_grace_seconds)
    }

    /// Disconnect grace window as a [`Duration`].
    #[must_use]
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_seconds)
    }
}
