//! Draft Service Library
//!
//! Server side of the ban/pick draft tool:
//!
//! - Session Store: per-room state, validated through the draft engine and
//!   written through to Redis before any subscriber sees it
//! - Realtime Hub: websocket fan-out of state changes, presence and
//!   readiness to the two seats and any observers
//! - REST surface for room lifecycle, listing and seat capacity
//!
//! # Architecture
//!
//! ```text
//! RoomControllerActor (singleton)
//! └── RoomActor (one per live room)
//!     ├── owns RoomState and the dirty flag
//!     └── ConnectionActor (one per websocket, write half)
//! ```
//!
//! # Modules
//!
//! - [`actors`] - Actor hierarchy
//! - [`store`] - Session Store facade over the actors
//! - [`repository`] - Persistence backends
//! - [`routes`], [`handlers`], [`ws`] - HTTP and websocket surface
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with HTTP and realtime mappings

#![warn(clippy::pedantic)]

pub mod actors;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod repository;
pub mod routes;
pub mod store;
pub mod ws;
