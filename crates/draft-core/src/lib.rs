//! Draft room core.
//!
//! Everything in this crate is synchronous and free of I/O so it can be
//! shared by the server and by every endpoint:
//!
//! - [`phase`] - the fixed turn table
//! - [`state`] - the authoritative per-room state and its round log
//! - [`engine`] - validation and transition of ban/pick actions
//! - [`reconciler`] - snapshot diffing into exactly-once cues
//! - [`timers`] - start countdown and per-turn action timer
//! - [`protocol`] - realtime wire messages

#![warn(clippy::pedantic)]

pub mod engine;
pub mod phase;
pub mod protocol;
pub mod reconciler;
pub mod roster;
pub mod state;
pub mod timers;
pub mod types;

pub use engine::{ActionRequest, AutoResolution, DraftEngine, RejectReason, TurnStamp};
pub use phase::{DraftPhase, PhaseTable};
pub use state::{RoomRecord, RoomState, RoundRecord};
pub use types::{ActionKind, EntityId, Seat, Side, SidePair};
