//! Realtime wire messages.
//!
//! Frames are JSON objects tagged by `type` in kebab-case with camelCase
//! fields, e.g. `{"type":"state-updated","roomState":{...}}`.

use crate::engine::{ActionRequest, TurnStamp};
use crate::state::RoomState;
use crate::types::{ActionKind, EntityId, Seat, Side, SidePair};
use common::types::RoomCode;
use serde::{Deserialize, Serialize};

/// Server to endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Joined {
        side: Seat,
        room_state: RoomState,
        presence: SidePair<bool>,
    },
    Left {
        side: Seat,
    },
    StateUpdated {
        room_state: RoomState,
    },
    ReadyToStartStatus {
        ready_left: bool,
        ready_right: bool,
    },
    RestartReadyStatus {
        ready_left: bool,
        ready_right: bool,
    },
    RestartApproved {},
    /// Sent only to the connection whose command failed.
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl ServerEvent {
    #[must_use]
    pub fn ready_to_start(state: &RoomState) -> Self {
        ServerEvent::ReadyToStartStatus {
            ready_left: state.ready_to_start.left,
            ready_right: state.ready_to_start.right,
        }
    }

    #[must_use]
    pub fn restart_ready(state: &RoomState) -> Self {
        ServerEvent::RestartReadyStatus {
            ready_left: state.ready_to_restart.left,
            ready_right: state.ready_to_restart.right,
        }
    }

    /// Wire name, for logs.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::Left { .. } => "left",
            ServerEvent::StateUpdated { .. } => "state-updated",
            ServerEvent::ReadyToStartStatus { .. } => "ready-to-start-status",
            ServerEvent::RestartReadyStatus { .. } => "restart-ready-status",
            ServerEvent::RestartApproved {} => "restart-approved",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// # Errors
    ///
    /// Only if serialization itself fails, which plain data never does.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Returns the decode error for frames that are not a known event.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

const fn ready_default() -> bool {
    true
}

/// Endpoint to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    Action {
        room_code: RoomCode,
        side: Side,
        kind: ActionKind,
        entity_id: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn: Option<TurnStamp>,
    },
    ReadyToStart {
        room_code: RoomCode,
        side: Side,
        #[serde(default = "ready_default")]
        ready: bool,
    },
    ReadyToRestart {
        room_code: RoomCode,
        side: Side,
    },
    SkipTurn {
        room_code: RoomCode,
        side: Side,
        turn: TurnStamp,
    },
    SaveRound {
        room_code: RoomCode,
    },
    SetName {
        room_code: RoomCode,
        side: Side,
        name: String,
    },
}

impl ClientCommand {
    /// # Errors
    ///
    /// Returns the decode error for anything that is not a known command.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// # Errors
    ///
    /// Only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn room_code(&self) -> &RoomCode {
        match self {
            ClientCommand::Action { room_code, .. }
            | ClientCommand::ReadyToStart { room_code, .. }
            | ClientCommand::ReadyToRestart { room_code, .. }
            | ClientCommand::SkipTurn { room_code, .. }
            | ClientCommand::SaveRound { room_code }
            | ClientCommand::SetName { room_code, .. } => room_code,
        }
    }

    /// Side the command claims to act for. `save-round` names no side.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match self {
            ClientCommand::Action { side, .. }
            | ClientCommand::ReadyToStart { side, .. }
            | ClientCommand::ReadyToRestart { side, .. }
            | ClientCommand::SkipTurn { side, .. }
            | ClientCommand::SetName { side, .. } => Some(*side),
            ClientCommand::SaveRound { .. } => None,
        }
    }

    #[must_use]
    pub const fn command_type(&self) -> &'static str {
        match self {
            ClientCommand::Action { .. } => "action",
            ClientCommand::ReadyToStart { .. } => "ready-to-start",
            ClientCommand::ReadyToRestart { .. } => "ready-to-restart",
            ClientCommand::SkipTurn { .. } => "skip-turn",
            ClientCommand::SaveRound { .. } => "save-round",
            ClientCommand::SetName { .. } => "set-name",
        }
    }
}

impl From<ActionRequest> for ClientCommand {
    fn from(request: ActionRequest) -> Self {
        ClientCommand::Action {
            room_code: request.room_code,
            side: request.acting_side,
            kind: request.kind,
            entity_id: request.entity_id,
            turn: request.turn,
        }
    }
}
