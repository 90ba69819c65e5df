//! Endpoint error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The roster could not be loaded. The endpoint must not run without one.
    #[error("Roster unavailable: {0}")]
    RosterUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The realtime channel ended.
    #[error("Connection closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
