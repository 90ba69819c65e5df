//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every crate in the workspace reaches for the same
//! wrapper. The Redis URL (which may embed a password) and the roster API key
//! are both held as [`SecretString`].
//!
//! `SecretString` redacts itself in `Debug`, so a config struct that derives
//! or hand-writes `Debug` cannot leak the value through `{:?}` or a tracing
//! field. The inner value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct RosterSource {
//!     url: String,
//!     api_key: SecretString,
//! }
//!
//! let source = RosterSource {
//!     url: "https://roster.example/v2/data/Character".to_string(),
//!     api_key: SecretString::from("k-123"),
//! };
//!
//! assert!(!format!("{source:?}").contains("k-123"));
//! assert_eq!(source.api_key.expose_secret(), "k-123");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
