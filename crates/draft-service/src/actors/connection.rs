//! `ConnectionActor` - owns the write half of one websocket.
//!
//! The room actor hands every event for a subscriber to that subscriber's
//! actor, so frames leave in the order the room produced them. A failed
//! socket write ends the actor; the room notices through the finished
//! `JoinHandle` and runs its presence-drop path.
//!
//! The read half stays with the upgrade handler in [`crate::ws`], which
//! forwards parsed commands straight to the room.

use crate::errors::DraftError;

use super::messages::ConnectionMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use axum::extract::ws::{close_code, CloseFrame, Message};
use common::types::{ConnectionId, RoomCode};
use draft_core::protocol::ServerEvent;
use draft_core::Seat;
use futures::{Sink, SinkExt};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

const CONNECTION_CHANNEL_BUFFER: usize = 200;

#[derive(Clone, Debug)]
pub struct ConnectionActorHandle {
    sender: mpsc::Sender<ConnectionMessage>,
    cancel_token: CancellationToken,
    connection_id: ConnectionId,
    seat: Seat,
}

impl ConnectionActorHandle {
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[must_use]
    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Queue an event for the socket.
    pub async fn deliver(&self, event: ServerEvent) -> Result<(), DraftError> {
        self.sender
            .send(ConnectionMessage::Deliver {
                event: Box::new(event),
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))
    }

    /// Send a close frame after any queued events, then stop.
    pub async fn close(&self, reason: impl Into<String>) -> Result<(), DraftError> {
        self.sender
            .send(ConnectionMessage::Close {
                reason: reason.into(),
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))
    }

    pub async fn ping(&self) -> Result<(), DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ConnectionMessage::Ping { respond_to: tx })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

pub struct ConnectionActor<S> {
    connection_id: ConnectionId,
    room_code: RoomCode,
    seat: Seat,
    sink: S,
    receiver: mpsc::Receiver<ConnectionMessage>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
    is_closing: bool,
}

impl<S> ConnectionActor<S>
where
    S: Sink<Message> + Send + Unpin + 'static,
    S::Error: Display,
{
    /// Spawn the writer for one socket.
    ///
    /// `cancel_token` should be a child of the room's token so that stopping
    /// the room closes its sockets.
    pub fn spawn(
        connection_id: ConnectionId,
        room_code: RoomCode,
        seat: Seat,
        sink: S,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (ConnectionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CONNECTION_CHANNEL_BUFFER);

        metrics.connection_created();

        let actor = Self {
            connection_id,
            room_code,
            seat,
            sink,
            receiver,
            cancel_token: cancel_token.clone(),
            metrics,
            mailbox: MailboxMonitor::new(ActorType::Connection, connection_id.to_string()),
            is_closing: false,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ConnectionActorHandle {
            sender,
            cancel_token,
            connection_id,
            seat,
        };

        (handle, task_handle)
    }

    #[instrument(
        skip_all,
        name = "draft.actor.connection",
        fields(
            connection_id = %self.connection_id,
            room_code = %self.room_code,
            seat = %self.seat
        )
    )]
    async fn run(mut self) {
        debug!(
            target: "draft.actor.connection",
            connection_id = %self.connection_id,
            "ConnectionActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.graceful_close("room closed").await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.observe(self.receiver.len());
                            let should_exit = self.handle_message(message).await;

                            if should_exit {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        self.metrics.connection_closed();

        debug!(
            target: "draft.actor.connection",
            connection_id = %self.connection_id,
            messages_processed = self.mailbox.processed(),
            peak_backlog = self.mailbox.peak_backlog(),
            "ConnectionActor stopped"
        );
    }

    /// Returns true when the actor should exit.
    async fn handle_message(&mut self, message: ConnectionMessage) -> bool {
        match message {
            ConnectionMessage::Deliver { event } => !self.write_event(&event).await,
            ConnectionMessage::Close { reason } => {
                self.graceful_close(&reason).await;
                true
            }
            ConnectionMessage::Ping { respond_to } => {
                let _ = respond_to.send(());
                false
            }
        }
    }

    /// Returns false when the socket is gone.
    async fn write_event(&mut self, event: &ServerEvent) -> bool {
        if self.is_closing {
            return true;
        }

        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    target: "draft.actor.connection",
                    connection_id = %self.connection_id,
                    event_type = event.event_type(),
                    error = %e,
                    "Failed to encode event"
                );
                return true;
            }
        };

        match self.sink.send(Message::Text(text)).await {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    target: "draft.actor.connection",
                    connection_id = %self.connection_id,
                    event_type = event.event_type(),
                    error = %e,
                    "Socket write failed, dropping connection"
                );
                false
            }
        }
    }

    async fn graceful_close(&mut self, reason: &str) {
        if self.is_closing {
            return;
        }
        self.is_closing = true;

        debug!(
            target: "draft.actor.connection",
            connection_id = %self.connection_id,
            reason = %reason,
            "Closing connection"
        );

        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Cow::Owned(reason.to_string()),
        };
        if self.sink.send(Message::Close(Some(frame))).await.is_ok() {
            let _ = self.sink.close().await;
        }
    }
}
