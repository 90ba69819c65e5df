//! Test fixtures: room codes, rosters and command builders.

use common::types::RoomCode;
use draft_core::protocol::ClientCommand;
use draft_core::roster::RosterEntry;
use draft_core::{ActionKind, EntityId, RoomRecord, RoomState, Side, TurnStamp};

/// Parse a room code known to be valid.
pub fn room_code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).expect("fixture room code must be valid")
}

/// Roster with ids `1..=count`.
pub fn roster(count: u32) -> Vec<RosterEntry> {
    (1..=count)
        .map(|id| RosterEntry::new(id, format!("Entity {id}")))
        .collect()
}

/// Stored record with the given state.
pub fn record(code: &str, created_at: i64, state: RoomState) -> RoomRecord {
    let mut record = RoomRecord::new(room_code(code), created_at);
    record.state = state;
    record
}

pub fn action(code: &RoomCode, side: Side, kind: ActionKind, entity: u32) -> ClientCommand {
    ClientCommand::Action {
        room_code: code.clone(),
        side,
        kind,
        entity_id: EntityId(entity),
        turn: None,
    }
}

/// Action pinned to the current position of `state`.
pub fn stamped_action(
    code: &RoomCode,
    side: Side,
    kind: ActionKind,
    entity: u32,
    state: &RoomState,
) -> ClientCommand {
    ClientCommand::Action {
        room_code: code.clone(),
        side,
        kind,
        entity_id: EntityId(entity),
        turn: Some(TurnStamp::of(state)),
    }
}

pub fn ready(code: &RoomCode, side: Side, ready: bool) -> ClientCommand {
    ClientCommand::ReadyToStart {
        room_code: code.clone(),
        side,
        ready,
    }
}

pub fn ready_to_restart(code: &RoomCode, side: Side) -> ClientCommand {
    ClientCommand::ReadyToRestart {
        room_code: code.clone(),
        side,
    }
}
