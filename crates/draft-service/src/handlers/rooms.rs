//! Room handlers.
//!
//! - `POST /v1/rooms/{code}` - Initialise or reset a room
//! - `GET /v1/rooms` - Room summaries, newest first
//! - `GET /v1/rooms/{code}` - Current state
//! - `DELETE /v1/rooms/{code}` - Stop the room and drop its record
//! - `GET /v1/rooms/{code}/capacity` - Seat availability
//!
//! Mutations made here reach websocket subscribers through the room actor
//! exactly like commands sent over the socket.

use crate::actors::{RoomCapacity, RoomSummary};
use crate::errors::DraftError;
use crate::routes::AppState;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::types::RoomCode;
use draft_core::RoomState;
use std::sync::Arc;
use tracing::{info, instrument};

/// Validate a room code taken from the path.
///
/// # Errors
///
/// `InvalidRoomCode` carrying the reason.
pub fn parse_room_code(raw: &str) -> Result<RoomCode, DraftError> {
    RoomCode::parse(raw).map_err(|e| DraftError::InvalidRoomCode(e.to_string()))
}

/// Handler for POST /v1/rooms/{code}
///
/// # Response
///
/// - 201 Created: fresh `RoomState`
/// - 400 Bad Request: invalid code
/// - 503 Service Unavailable: storage down, room limit, or draining
#[instrument(skip(state), fields(room_code = %code))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<(StatusCode, Json<RoomState>), DraftError> {
    let code = parse_room_code(&code)?;
    let room_state = state.store.initialize(&code).await?;

    info!(target: "draft.handlers.rooms", room_code = %code, "Room initialized");

    Ok((StatusCode::CREATED, Json(room_state)))
}

#[instrument(skip(state))]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummary>>, DraftError> {
    Ok(Json(state.store.list().await?))
}

#[instrument(skip(state), fields(room_code = %code))]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomState>, DraftError> {
    let code = parse_room_code(&code)?;
    state
        .store
        .load(&code)
        .await?
        .map(Json)
        .ok_or_else(|| DraftError::RoomNotFound(code.to_string()))
}

/// Handler for DELETE /v1/rooms/{code}
///
/// Idempotent: deleting an unknown room is still 204.
#[instrument(skip(state), fields(room_code = %code))]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<StatusCode, DraftError> {
    let code = parse_room_code(&code)?;
    state.store.delete(&code).await?;

    info!(target: "draft.handlers.rooms", room_code = %code, "Room deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(room_code = %code))]
pub async fn get_capacity(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomCapacity>, DraftError> {
    let code = parse_room_code(&code)?;
    Ok(Json(state.store.check_capacity(&code).await?))
}
