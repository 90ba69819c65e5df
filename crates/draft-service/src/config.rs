//! Draft service configuration.
//!
//! Configuration is loaded from environment variables. The Redis URL may
//! carry credentials and is redacted in Debug output.

use common::observability::LogFormat;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default realtime/REST bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8091";

/// Default interval between re-flush attempts for rooms that failed to persist.
pub const DEFAULT_PERSIST_RETRY_INTERVAL_SECONDS: u64 = 5;

/// Default quiet time before an unattended room actor is released.
pub const DEFAULT_ROOM_IDLE_SECONDS: u64 = 300;

/// Default maximum number of live rooms.
pub const DEFAULT_MAX_ROOMS: usize = 1000;

/// Default service instance ID prefix.
pub const DEFAULT_SERVICE_ID_PREFIX: &str = "draft";

#[derive(Clone)]
pub struct Config {
    /// Redis connection URL. Protected by `SecretString` to prevent
    /// accidental logging.
    pub redis_url: SecretString,

    /// Realtime and REST bind address (default: "0.0.0.0:8090").
    pub bind_address: String,

    /// Health endpoint bind address (default: "0.0.0.0:8091").
    pub health_bind_address: String,

    /// Seconds between re-flush attempts for dirty rooms (default: 5).
    pub persist_retry_interval_seconds: u64,

    /// Seconds an unattended room stays live with no traffic (default: 300).
    pub room_idle_seconds: u64,

    /// Maximum live rooms held by this instance (default: 1000).
    pub max_rooms: usize,

    /// Unique identifier for this instance.
    pub service_id: String,

    pub log_format: LogFormat,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field(
                "persist_retry_interval_seconds",
                &self.persist_retry_interval_seconds,
            )
            .field("room_idle_seconds", &self.room_idle_seconds)
            .field("max_rooms", &self.max_rooms)
            .field("service_id", &self.service_id)
            .field("log_format", &self.log_format)
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
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// `MissingEnvVar` when `REDIS_URL` is absent, `InvalidValue` when a
    /// numeric or enumerated variable does not parse.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let redis_url = SecretString::from(
            vars.get("REDIS_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?
                .clone(),
        );

        let bind_address = vars
            .get("DRAFT_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let health_bind_address = vars
            .get("DRAFT_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let persist_retry_interval_seconds = parse_var(
            vars,
            "DRAFT_PERSIST_RETRY_INTERVAL_SECONDS",
            DEFAULT_PERSIST_RETRY_INTERVAL_SECONDS,
        )?;
        if persist_retry_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "DRAFT_PERSIST_RETRY_INTERVAL_SECONDS must be at least 1".to_string(),
            ));
        }

        let room_idle_seconds =
            parse_var(vars, "DRAFT_ROOM_IDLE_SECONDS", DEFAULT_ROOM_IDLE_SECONDS)?;
        if room_idle_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "DRAFT_ROOM_IDLE_SECONDS must be at least 1".to_string(),
            ));
        }

        let max_rooms = parse_var(vars, "DRAFT_MAX_ROOMS", DEFAULT_MAX_ROOMS)?;

        let log_format = match vars.get("DRAFT_LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("DRAFT_LOG_FORMAT: {e}")))?,
            None => LogFormat::default(),
        };

        // Generate instance ID
        let service_id = vars.get("DRAFT_SERVICE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_SERVICE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            redis_url,
            bind_address,
            health_bind_address,
            persist_retry_interval_seconds,
            room_idle_seconds,
            max_rooms,
            service_id,
            log_format,
        })
    }

    #[must_use]
    pub fn persist_retry_interval(&self) -> Duration {
        Duration::from_secs(self.persist_retry_interval_seconds)
    }

    #[must_use]
    pub fn room_idle_release(&self) -> Duration {
        Duration::from_secs(self.room_idle_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{name}={raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "REDIS_URL".to_string(),
            "redis://:hunter2@localhost:6379".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(
            config.redis_url.expose_secret(),
            "redis://:hunter2@localhost:6379"
        );
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.health_bind_address, DEFAULT_HEALTH_BIND_ADDRESS);
        assert_eq!(
            config.persist_retry_interval(),
            Duration::from_secs(DEFAULT_PERSIST_RETRY_INTERVAL_SECONDS)
        );
        assert_eq!(
            config.room_idle_release(),
            Duration::from_secs(DEFAULT_ROOM_IDLE_SECONDS)
        );
        assert_eq!(config.max_rooms, DEFAULT_MAX_ROOMS);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.service_id.starts_with("draft-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("DRAFT_BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "DRAFT_HEALTH_BIND_ADDRESS".to_string(),
            "127.0.0.1:9001".to_string(),
        );
        vars.insert(
            "DRAFT_PERSIST_RETRY_INTERVAL_SECONDS".to_string(),
            "12".to_string(),
        );
        vars.insert("DRAFT_MAX_ROOMS".to_string(), "50".to_string());
        vars.insert("DRAFT_ROOM_IDLE_SECONDS".to_string(), "90".to_string());
        vars.insert("DRAFT_SERVICE_ID".to_string(), "draft-custom-1".to_string());
        vars.insert("DRAFT_LOG_FORMAT".to_string(), "json".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.health_bind_address, "127.0.0.1:9001");
        assert_eq!(config.persist_retry_interval_seconds, 12);
        assert_eq!(config.max_rooms, 50);
        assert_eq!(config.room_idle_seconds, 90);
        assert_eq!(config.service_id, "draft-custom-1");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_vars_missing_redis_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_from_vars_invalid_numbers() {
        let mut vars = base_vars();
        vars.insert("DRAFT_MAX_ROOMS".to_string(), "lots".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(v)) if v.contains("DRAFT_MAX_ROOMS")
        ));

        let mut vars = base_vars();
        vars.insert(
            "DRAFT_PERSIST_RETRY_INTERVAL_SECONDS".to_string(),
            "0".to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut vars = base_vars();
        vars.insert("DRAFT_ROOM_IDLE_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(v)) if v.contains("DRAFT_ROOM_IDLE_SECONDS")
        ));
    }

    #[test]
    fn test_from_vars_invalid_log_format() {
        let mut vars = base_vars();
        vars.insert("DRAFT_LOG_FORMAT".to_string(), "xml".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("redis://"));
        assert!(!debug_output.contains("hunter2"));
    }
}
