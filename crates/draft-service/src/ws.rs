//! Realtime Hub entry point: `GET /v1/rooms/{code}/ws?seat=left|right|observer`.
//!
//! The upgrade handler splits the socket. The write half goes to a
//! `ConnectionActor` subscribed to the room; the read half stays here, parses
//! each text frame as a [`ClientCommand`] and forwards it to the room actor.
//! When the read half ends the room is told to drop the subscriber.

use crate::actors::ConnectionActor;
use crate::errors::DraftError;
use crate::handlers::parse_room_code;
use crate::observability::metrics as prom;
use crate::routes::AppState;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use common::types::{ConnectionId, RoomCode};
use draft_core::protocol::ClientCommand;
use draft_core::{RejectReason, Seat};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    /// Absent means observer.
    #[serde(default)]
    pub seat: Option<Seat>,
}

/// Upgrade handler. An invalid code is refused before the upgrade; an
/// unknown room is refused over the socket with an `error` frame.
pub async fn room_socket(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<JoinParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, DraftError> {
    let code = parse_room_code(&code)?;
    let seat = params.seat.unwrap_or(Seat::Observer);

    Ok(ws.on_upgrade(move |socket| serve_socket(state, code, seat, socket)))
}

async fn serve_socket(state: Arc<AppState>, code: RoomCode, seat: Seat, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    let room = match state.store.room(&code).await {
        Ok(room) => room,
        Err(e) => {
            debug!(
                target: "draft.ws",
                room_code = %code,
                error = %e,
                "Refusing socket"
            );
            refuse(&mut sink, &e).await;
            return;
        }
    };

    let connection_id = ConnectionId::new();
    let token = room.child_token();
    let (handle, task_handle) = ConnectionActor::spawn(
        connection_id,
        code.clone(),
        seat,
        sink,
        token.clone(),
        Arc::clone(&state.metrics),
    );

    // On a seat conflict the room has already sent the error and close.
    if let Err(e) = room.connect(connection_id, seat, handle, task_handle).await {
        debug!(
            target: "draft.ws",
            room_code = %code,
            connection_id = %connection_id,
            error = %e,
            "Connection refused by room"
        );
        return;
    }

    info!(
        target: "draft.ws",
        room_code = %code,
        connection_id = %connection_id,
        seat = %seat,
        "Socket connected"
    );

    loop {
        tokio::select! {
            () = token.cancelled() => break,

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientCommand::parse(&text) {
                    Ok(command) => {
                        if room.command(connection_id, command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // Malformed input is treated like a wrong-turn action.
                        debug!(
                            target: "draft.ws",
                            connection_id = %connection_id,
                            error = %e,
                            "Ignoring malformed frame"
                        );
                        prom::record_action(RejectReason::WrongTurn.as_str());
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(
                        target: "draft.ws",
                        connection_id = %connection_id,
                        error = %e,
                        "Socket read failed"
                    );
                    break;
                }
            }
        }
    }

    room.disconnect(connection_id).await;

    info!(
        target: "draft.ws",
        room_code = %code,
        connection_id = %connection_id,
        "Socket disconnected"
    );
}

/// Send an `error` frame and a policy close on a socket that never joined.
async fn refuse<S>(sink: &mut S, error: &DraftError)
where
    S: Sink<Message> + Unpin,
{
    if let Ok(text) = error.to_event().to_json() {
        let _ = sink.send(Message::Text(text)).await;
    }
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::Borrowed(error.error_code()),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
    let _ = sink.close().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use draft_core::protocol::ServerEvent;
    use futures::channel::mpsc::unbounded;

    #[test]
    fn test_join_params_seat() {
        let params: JoinParams = serde_json::from_str(r#"{"seat":"right"}"#).unwrap();
        assert_eq!(params.seat, Some(Seat::Right));

        let params: JoinParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.seat, None);
    }

    #[tokio::test]
    async fn test_refuse_sends_error_then_close() {
        let (mut tx, mut rx) = unbounded::<Message>();
        refuse(&mut tx, &DraftError::RoomNotFound("X".to_string())).await;

        match rx.next().await {
            Some(Message::Text(text)) => match ServerEvent::parse(&text).unwrap() {
                ServerEvent::Error { code, .. } => assert_eq!(code, "NOT_FOUND"),
                other => panic!("expected error event, got {other:?}"),
            },
            other => panic!("expected text frame, got {other:?}"),
        }
        match rx.next().await {
            Some(Message::Close(Some(frame))) => {
                assert_eq!(frame.code, close_code::POLICY);
                assert_eq!(frame.reason, "NOT_FOUND");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
