//! Message types for actor communication.
//!
//! Requests that need an answer carry a `oneshot` sender; notifications
//! from the websocket layer (`Disconnect`, `Command`) are fire-and-forget.

use super::connection::ConnectionActorHandle;
use super::room::RoomActorHandle;
use crate::errors::DraftError;

use common::types::{ConnectionId, RoomCode};
use draft_core::protocol::{ClientCommand, ServerEvent};
use draft_core::{ActionRequest, RoomState, Seat, Side, SidePair, TurnStamp};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Messages sent to `RoomControllerActor`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Live handle for a room, spawning its actor from storage when needed.
    /// With `create`, an unknown code becomes a fresh room.
    GetRoom {
        code: RoomCode,
        create: bool,
        respond_to: oneshot::Sender<Result<RoomActorHandle, DraftError>>,
    },

    /// Stop the room actor and remove the stored record.
    DeleteRoom {
        code: RoomCode,
        respond_to: oneshot::Sender<Result<(), DraftError>>,
    },

    /// Stored rooms overlaid with live state, newest first.
    ListRooms {
        respond_to: oneshot::Sender<Result<Vec<RoomSummary>, DraftError>>,
    },

    CheckCapacity {
        code: RoomCode,
        respond_to: oneshot::Sender<Result<RoomCapacity, DraftError>>,
    },

    GetStatus {
        respond_to: oneshot::Sender<ControllerStatus>,
    },

    /// Stop accepting rooms and cancel every room actor.
    Shutdown {
        deadline: Duration,
        respond_to: oneshot::Sender<Result<(), DraftError>>,
    },
}

/// Messages sent to `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// Subscribe an already-spawned connection actor under a seat.
    Connect {
        connection_id: ConnectionId,
        seat: Seat,
        handle: ConnectionActorHandle,
        task_handle: JoinHandle<()>,
        respond_to: oneshot::Sender<Result<(), DraftError>>,
    },

    /// The socket's read half ended.
    Disconnect { connection_id: ConnectionId },

    /// Inbound frame from a subscriber. Failures other than rejections are
    /// reported back to that subscriber as an `error` event.
    Command {
        connection_id: ConnectionId,
        command: ClientCommand,
    },

    GetState {
        respond_to: oneshot::Sender<RoomState>,
    },

    GetPresence {
        respond_to: oneshot::Sender<SidePair<bool>>,
    },

    /// Overwrite the whole state (`save` and `initialize`).
    ReplaceState {
        state: Box<RoomState>,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    ApplyAction {
        request: ActionRequest,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    SetReadyToStart {
        side: Side,
        ready: bool,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    MarkRestartReady {
        side: Side,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    /// Perform the restart when both sides are ready. Answers whether it did.
    ResetIfBothReady {
        respond_to: oneshot::Sender<Result<bool, DraftError>>,
    },

    SkipTurn {
        side: Side,
        turn: TurnStamp,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    SaveRound {
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    SetName {
        side: Side,
        name: String,
        respond_to: oneshot::Sender<Result<RoomState, DraftError>>,
    },

    /// Write the record now if an earlier write failed.
    Flush {
        respond_to: oneshot::Sender<Result<(), DraftError>>,
    },
}

/// Messages sent to `ConnectionActor`.
#[derive(Debug)]
pub enum ConnectionMessage {
    /// Write one event frame to the socket.
    Deliver { event: Box<ServerEvent> },

    /// Send a close frame and stop.
    Close { reason: String },

    Ping { respond_to: oneshot::Sender<()> },
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Row of the room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: RoomCode,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub phase_index: usize,
    pub left_name: Option<String>,
    pub right_name: Option<String>,
    pub saved_rounds: usize,
    /// Whether a room actor is currently running for this code.
    pub live: bool,
}

impl RoomSummary {
    #[must_use]
    pub fn new(code: RoomCode, created_at: i64, state: &RoomState, live: bool) -> Self {
        Self {
            code,
            created_at,
            phase_index: state.phase_index,
            left_name: state.left_name.clone(),
            right_name: state.right_name.clone(),
            saved_rounds: state.saved_rounds.len(),
            live,
        }
    }
}

/// Seat availability for the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCapacity {
    pub has_left: bool,
    pub has_right: bool,
    pub exists: bool,
}

impl RoomCapacity {
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            has_left: false,
            has_right: false,
            exists: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub room_count: usize,
    pub connection_count: usize,
    pub is_draining: bool,
    pub mailbox_depth: usize,
}
