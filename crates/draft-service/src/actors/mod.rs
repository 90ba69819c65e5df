//! Actor hierarchy for the Session Store and Realtime Hub.
//!
//! ```text
//! RoomControllerActor (singleton per service instance)
//! └── supervises N RoomActors
//!     └── RoomActor (one per live room code)
//!         ├── owns RoomRecord and the dirty flag
//!         └── supervises N ConnectionActors
//!             └── ConnectionActor (one per websocket, owns the write half)
//! ```
//!
//! - **Single writer**: all mutation of a room happens on its actor's task
//! - **CancellationToken propagation**: parents hand child tokens down
//! - **Mailbox monitoring**: depth thresholds (Room: 100/500, Connection: 50/200)

pub mod connection;
pub mod controller;
pub mod messages;
pub mod metrics;
pub mod room;

pub use connection::{ConnectionActor, ConnectionActorHandle};
pub use controller::{ControllerSettings, RoomControllerActor, RoomControllerActorHandle};
pub use messages::*;
pub use metrics::{ActorMetrics, ActorType, MailboxMonitor};
pub use room::{RoomActor, RoomActorHandle, RoomContext};
