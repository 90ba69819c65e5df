//! Draft room endpoint.
//!
//! An endpoint joins one room over the realtime channel, mirrors its state,
//! turns each snapshot into cues through the reconciler and runs the start
//! countdown and per-turn timer locally.
//!
//! - [`endpoint`] - the single-task driver
//! - [`roster`] - roster providers
//! - [`transport`] - websocket bridge to typed channels
//! - [`effects`] - presentation hooks
//! - [`config`] - `draft-bot` configuration

#![warn(clippy::pedantic)]

pub mod config;
pub mod effects;
pub mod endpoint;
pub mod errors;
pub mod roster;
pub mod transport;

pub use endpoint::{DraftEndpoint, EndpointSettings};
pub use errors::ClientError;
