//! `draft-bot` configuration.
//!
//! Loaded from environment variables. The roster API key is held as a
//! `SecretString` and redacted in Debug output.

use common::observability::LogFormat;
use common::secret::SecretString;
use common::types::RoomCode;
use draft_core::Seat;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default draft server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8090";

#[derive(Clone)]
pub struct BotConfig {
    /// Base URL of the draft service, `http://` or `ws://` (default: "http://127.0.0.1:8090").
    pub server_url: String,

    pub room_code: RoomCode,

    /// Seat to join as (default: left).
    pub seat: Seat,

    /// Roster endpoint returning `{code, message, data: [{code, name}]}`.
    pub roster_api_url: String,

    /// Sent as the `x-api-key` header.
    pub roster_api_key: SecretString,

    pub log_format: LogFormat,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("server_url", &self.server_url)
            .field("room_code", &self.room_code)
            .field("seat", &self.seat)
            .field("roster_api_url", &self.roster_api_url)
            .field("roster_api_key", &"[REDACTED]")
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

impl BotConfig {
    /// # Errors
    ///
    /// See [`BotConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// # Errors
    ///
    /// `MissingEnvVar` for an absent room code, roster URL or key;
    /// `InvalidValue` for a malformed room code, seat or log format.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            vars.get(name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let server_url = vars
            .get("DRAFT_SERVER_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let room_code = RoomCode::parse(&required("DRAFT_ROOM_CODE")?)
            .map_err(|e| ConfigError::InvalidValue(format!("DRAFT_ROOM_CODE: {e}")))?;

        let seat = match vars.get("DRAFT_SEAT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("DRAFT_SEAT: {e}")))?,
            None => Seat::Left,
        };

        let roster_api_url = required("ROSTER_API_URL")?;
        let roster_api_key = SecretString::from(required("ROSTER_API_KEY")?);

        let log_format = match vars.get("DRAFT_LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("DRAFT_LOG_FORMAT: {e}")))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            server_url,
            room_code,
            seat,
            roster_api_url,
            roster_api_key,
            log_format,
        })
    }

    /// Websocket URL for the configured room and seat.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}/v1/rooms/{}/ws?seat={}", self.room_code, self.seat)
    }
}
