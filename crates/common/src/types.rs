//! Shared identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of a room code.
pub const MAX_ROOM_CODE_LEN: usize = 32;

/// Reasons a string is not a usable room code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code is empty")]
    Empty,

    #[error("room code exceeds {MAX_ROOM_CODE_LEN} characters")]
    TooLong,

    #[error("room code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A validated room code.
///
/// Codes are 1 to 32 characters of ASCII letters, digits, `-` and `_`. They
/// appear in URLs and Redis keys, so anything else is refused up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validate and wrap a room code.
    ///
    /// # Errors
    ///
    /// Returns [`RoomCodeError`] when the code is empty, too long, or contains
    /// a character outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, RoomCodeError> {
        if raw.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        if raw.chars().count() > MAX_ROOM_CODE_LEN {
            return Err(RoomCodeError::TooLong);
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(RoomCodeError::InvalidCharacter(bad));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

/// Unique identifier for one realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
