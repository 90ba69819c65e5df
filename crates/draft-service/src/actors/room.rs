//! `RoomActor` - the single writer for one room code.
//!
//! Each live room runs one actor that owns:
//! - the authoritative [`RoomRecord`]
//! - the subscriber map (one `ConnectionActor` per websocket)
//! - the dirty flag for writes that did not reach storage
//!
//! Every mutation goes through the mailbox, so validation, persistence and
//! broadcast for a room never interleave. Presence is derived from the
//! subscriber map rather than stored.
//!
//! # Durability
//!
//! Accepted mutations are written to the repository before the caller is
//! answered and before subscribers see them. When the write fails the
//! in-memory state still advances and is broadcast, the caller gets a
//! retryable `Storage` error, and the record is re-written on every retry
//! tick until storage recovers. Shutdown makes one final attempt.
//!
//! # Idle release
//!
//! A room with no subscribers, nothing left to write and no traffic for
//! `idle_release` stops its actor. The record stays in storage and the
//! controller respawns the room on next access. A handle held outside the
//! controller keeps the room alive.

use crate::errors::DraftError;
use crate::observability::metrics as prom;
use crate::repository::RoomRepository;

use super::connection::ConnectionActorHandle;
use super::messages::RoomMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use common::types::{ConnectionId, RoomCode};
use draft_core::protocol::{ClientCommand, ServerEvent};
use draft_core::{
    ActionRequest, DraftEngine, RejectReason, RoomRecord, RoomState, Seat, Side, SidePair,
    TurnStamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const ROOM_CHANNEL_BUFFER: usize = 500;

/// Shared dependencies handed to every room actor.
#[derive(Clone)]
pub struct RoomContext {
    pub engine: Arc<DraftEngine>,
    pub repository: Arc<dyn RoomRepository>,
    pub persist_retry_interval: Duration,
    /// Quiet time after which an unattended room is released.
    pub idle_release: Duration,
    pub metrics: Arc<ActorMetrics>,
}

#[derive(Clone, Debug)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    code: RoomCode,
}

impl RoomActorHandle {
    #[must_use]
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, DraftError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))
    }

    /// Subscribe a spawned connection actor.
    ///
    /// On a seat conflict the room sends the `error` frame and closes the
    /// connection itself before returning `Conflict`.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        seat: Seat,
        handle: ConnectionActorHandle,
        task_handle: JoinHandle<()>,
    ) -> Result<(), DraftError> {
        self.request(|respond_to| RoomMessage::Connect {
            connection_id,
            seat,
            handle,
            task_handle,
            respond_to,
        })
        .await?
    }

    /// Notify the room that a socket's read half ended.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let _ = self
            .sender
            .send(RoomMessage::Disconnect { connection_id })
            .await;
    }

    /// Forward an inbound command. Outcomes reach the sender as events.
    pub async fn command(
        &self,
        connection_id: ConnectionId,
        command: ClientCommand,
    ) -> Result<(), DraftError> {
        self.sender
            .send(RoomMessage::Command {
                connection_id,
                command,
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))
    }

    pub async fn get_state(&self) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::GetState { respond_to })
            .await
    }

    pub async fn presence(&self) -> Result<SidePair<bool>, DraftError> {
        self.request(|respond_to| RoomMessage::GetPresence { respond_to })
            .await
    }

    pub async fn replace_state(&self, state: RoomState) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::ReplaceState {
            state: Box::new(state),
            respond_to,
        })
        .await?
    }

    pub async fn apply_action(&self, request: ActionRequest) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::ApplyAction {
            request,
            respond_to,
        })
        .await?
    }

    pub async fn set_ready_to_start(
        &self,
        side: Side,
        ready: bool,
    ) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::SetReadyToStart {
            side,
            ready,
            respond_to,
        })
        .await?
    }

    pub async fn mark_restart_ready(&self, side: Side) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::MarkRestartReady { side, respond_to })
            .await?
    }

    pub async fn reset_if_both_ready(&self) -> Result<bool, DraftError> {
        self.request(|respond_to| RoomMessage::ResetIfBothReady { respond_to })
            .await?
    }

    pub async fn skip_turn(&self, side: Side, turn: TurnStamp) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::SkipTurn {
            side,
            turn,
            respond_to,
        })
        .await?
    }

    pub async fn save_round(&self) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::SaveRound { respond_to })
            .await?
    }

    pub async fn set_name(&self, side: Side, name: String) -> Result<RoomState, DraftError> {
        self.request(|respond_to| RoomMessage::SetName {
            side,
            name,
            respond_to,
        })
        .await?
    }

    pub async fn flush(&self) -> Result<(), DraftError> {
        self.request(|respond_to| RoomMessage::Flush { respond_to })
            .await?
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token for connection actors owned by this room.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

struct ManagedConnection {
    seat: Seat,
    handle: ConnectionActorHandle,
    task_handle: JoinHandle<()>,
}

pub struct RoomActor {
    code: RoomCode,
    record: RoomRecord,
    engine: Arc<DraftEngine>,
    repository: Arc<dyn RoomRepository>,
    connections: HashMap<ConnectionId, ManagedConnection>,
    /// The stored record is behind the in-memory one.
    dirty: bool,
    persist_retry_interval: Duration,
    idle_release: Duration,
    last_activity: Instant,
    receiver: mpsc::Receiver<RoomMessage>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: MailboxMonitor,
}

impl RoomActor {
    /// Spawn the actor for `record`. Pass `dirty` when the record has never
    /// been written.
    pub fn spawn(
        record: RoomRecord,
        dirty: bool,
        context: RoomContext,
        cancel_token: CancellationToken,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);
        let code = record.code.clone();

        let actor = Self {
            code: code.clone(),
            record,
            engine: context.engine,
            repository: context.repository,
            connections: HashMap::new(),
            dirty,
            persist_retry_interval: context.persist_retry_interval,
            idle_release: context.idle_release,
            last_activity: Instant::now(),
            receiver,
            cancel_token: cancel_token.clone(),
            metrics: context.metrics,
            mailbox: MailboxMonitor::new(ActorType::Room, code.as_str()),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            code,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "draft.actor.room", fields(room_code = %self.code))]
    async fn run(mut self) {
        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            "RoomActor started"
        );

        let mut retry = tokio::time::interval(self.persist_retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut idle_check = tokio::time::interval(self.idle_release);
        idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.check_connection_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "draft.actor.room",
                        room_code = %self.code,
                        "RoomActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                _ = retry.tick() => {
                    if self.dirty {
                        let _ = self.persist("flush").await;
                    }
                }

                _ = idle_check.tick() => {
                    if self.is_idle() {
                        info!(
                            target: "draft.actor.room",
                            room_code = %self.code,
                            idle_secs = self.last_activity.elapsed().as_secs(),
                            "Releasing idle room"
                        );
                        break;
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.last_activity = Instant::now();
                            self.mailbox.observe(self.receiver.len());
                            self.handle_message(message).await;
                        }
                        None => {
                            info!(
                                target: "draft.actor.room",
                                room_code = %self.code,
                                "RoomActor channel closed, exiting"
                            );
                            self.graceful_shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            dirty = self.dirty,
            messages_processed = self.mailbox.processed(),
            peak_backlog = self.mailbox.peak_backlog(),
            "RoomActor stopped"
        );
    }

    /// Nobody is watching, nothing is unsaved, nothing has arrived lately and
    /// only the controller still holds a sender.
    fn is_idle(&self) -> bool {
        self.connections.is_empty()
            && !self.dirty
            && self.receiver.sender_strong_count() <= 1
            && self.last_activity.elapsed() >= self.idle_release
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Connect {
                connection_id,
                seat,
                handle,
                task_handle,
                respond_to,
            } => {
                let result = self
                    .handle_connect(connection_id, seat, handle, task_handle)
                    .await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id).await;
            }

            RoomMessage::Command {
                connection_id,
                command,
            } => {
                self.handle_command(connection_id, command).await;
            }

            RoomMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.record.state.clone());
            }

            RoomMessage::GetPresence { respond_to } => {
                let _ = respond_to.send(self.presence());
            }

            RoomMessage::ReplaceState { state, respond_to } => {
                let result = self.commit(*state).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::ApplyAction {
                request,
                respond_to,
            } => {
                let result = self.apply_action(&request).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::SetReadyToStart {
                side,
                ready,
                respond_to,
            } => {
                let result = self.set_ready_to_start(side, ready).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::MarkRestartReady { side, respond_to } => {
                let result = self.mark_restart_ready(side).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::ResetIfBothReady { respond_to } => {
                let result = self.reset_if_both_ready().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::SkipTurn {
                side,
                turn,
                respond_to,
            } => {
                let result = self.skip_turn(side, turn).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::SaveRound { respond_to } => {
                let result = self.save_round().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::SetName {
                side,
                name,
                respond_to,
            } => {
                let result = self.set_name(side, &name).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Flush { respond_to } => {
                let result = if self.dirty {
                    self.persist("flush").await
                } else {
                    Ok(())
                };
                let _ = respond_to.send(result);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------------

    async fn handle_connect(
        &mut self,
        connection_id: ConnectionId,
        seat: Seat,
        handle: ConnectionActorHandle,
        task_handle: JoinHandle<()>,
    ) -> Result<(), DraftError> {
        if let Some(side) = seat.side() {
            if self.presence().get(side) {
                debug!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    connection_id = %connection_id,
                    seat = %seat,
                    "Seat already taken, refusing connection"
                );
                let err = DraftError::Conflict(format!("The {seat} seat is already taken"));
                let _ = handle.deliver(err.to_event()).await;
                let _ = handle.close("seat taken").await;
                reap_connection(self.code.clone(), connection_id, task_handle);
                return Err(err);
            }
        }

        self.connections.insert(
            connection_id,
            ManagedConnection {
                seat,
                handle: handle.clone(),
                task_handle,
            },
        );

        let joined = ServerEvent::Joined {
            side: seat,
            room_state: self.record.state.clone(),
            presence: self.presence(),
        };

        // Newcomer first, then everyone else.
        let _ = handle.deliver(joined.clone()).await;
        for (id, managed) in &self.connections {
            if *id != connection_id {
                let _ = managed.handle.deliver(joined.clone()).await;
            }
        }
        let _ = handle
            .deliver(ServerEvent::ready_to_start(&self.record.state))
            .await;
        let _ = handle
            .deliver(ServerEvent::restart_ready(&self.record.state))
            .await;

        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            connection_id = %connection_id,
            seat = %seat,
            subscribers = self.connections.len(),
            "Subscriber joined"
        );

        Ok(())
    }

    async fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        // Already reaped by the health check.
        let Some(managed) = self.connections.remove(&connection_id) else {
            return;
        };

        managed.handle.cancel();
        reap_connection(self.code.clone(), connection_id, managed.task_handle);
        self.drop_presence(connection_id, managed.seat).await;
    }

    /// Announce the departure and clear the leaving side's readiness.
    async fn drop_presence(&mut self, connection_id: ConnectionId, seat: Seat) {
        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            connection_id = %connection_id,
            seat = %seat,
            subscribers = self.connections.len(),
            "Subscriber left"
        );

        self.broadcast(&ServerEvent::Left { side: seat }).await;

        let Some(side) = seat.side() else {
            return;
        };

        let state = &mut self.record.state;
        let changed = state.ready_to_start.get(side) || state.ready_to_restart.get(side);
        state.ready_to_start.set(side, false);
        state.ready_to_restart.set(side, false);
        if changed {
            let _ = self.persist("write").await;
        }

        self.broadcast(&ServerEvent::ready_to_start(&self.record.state))
            .await;
        self.broadcast(&ServerEvent::restart_ready(&self.record.state))
            .await;
    }

    fn presence(&self) -> SidePair<bool> {
        let mut presence = SidePair::default();
        for side in self.connections.values().filter_map(|m| m.seat.side()) {
            presence.set(side, true);
        }
        presence
    }

    async fn broadcast(&self, event: &ServerEvent) {
        for managed in self.connections.values() {
            let _ = managed.handle.deliver(event.clone()).await;
        }
    }

    async fn deliver_to(&self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(managed) = self.connections.get(&connection_id) {
            let _ = managed.handle.deliver(event).await;
        }
    }

    /// Route a subscriber's command. Commands for another room, from
    /// observers, or acting for a side the connection may not act for are
    /// dropped like a wrong-turn action.
    async fn handle_command(&mut self, connection_id: ConnectionId, command: ClientCommand) {
        let Some(seat) = self.connections.get(&connection_id).map(|m| m.seat) else {
            return;
        };

        let side = match permitted_side(seat, &command) {
            Some(side) if command.room_code() == &self.code => side,
            _ => {
                debug!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    connection_id = %connection_id,
                    seat = %seat,
                    command_type = command.command_type(),
                    "Dropping command not permitted for this connection"
                );
                prom::record_action(RejectReason::WrongTurn.as_str());
                return;
            }
        };

        let result = match command {
            ClientCommand::Action {
                kind,
                entity_id,
                turn,
                ..
            } => {
                let request = ActionRequest {
                    room_code: self.code.clone(),
                    acting_side: side,
                    kind,
                    entity_id,
                    turn,
                };
                self.apply_action(&request).await.map(drop)
            }
            ClientCommand::ReadyToStart { ready, .. } => {
                self.set_ready_to_start(side, ready).await.map(drop)
            }
            ClientCommand::ReadyToRestart { .. } => {
                // The reset runs even when the flag write failed; the room
                // must stay playable.
                let marked = self.mark_restart_ready(side).await.map(drop);
                let reset = self.reset_if_both_ready().await.map(drop);
                marked.and(reset)
            }
            ClientCommand::SkipTurn { turn, .. } => self.skip_turn(side, turn).await.map(drop),
            ClientCommand::SaveRound { .. } => self.save_round().await.map(drop),
            ClientCommand::SetName { name, .. } => self.set_name(side, &name).await.map(drop),
        };

        match result {
            Ok(()) | Err(DraftError::Rejected(_)) => {}
            Err(e) => self.deliver_to(connection_id, e.to_event()).await,
        }
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Install `next`, write it through, and broadcast it.
    async fn commit(&mut self, next: RoomState) -> Result<RoomState, DraftError> {
        self.record.state = next;
        let persisted = self.persist("write").await;
        self.broadcast(&ServerEvent::StateUpdated {
            room_state: self.record.state.clone(),
        })
        .await;
        persisted.map(|()| self.record.state.clone())
    }

    async fn apply_action(&mut self, request: &ActionRequest) -> Result<RoomState, DraftError> {
        let outcome = if request.room_code == self.code {
            self.engine
                .validate_and_apply(&self.record.state, request)
        } else {
            Err(RejectReason::WrongTurn)
        };

        match outcome {
            Ok(next) => {
                debug!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    side = %request.acting_side,
                    kind = request.kind.as_str(),
                    entity_id = %request.entity_id,
                    "Action accepted"
                );
                prom::record_action("accepted");
                self.commit(next).await
            }
            Err(reason) => {
                debug!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    side = %request.acting_side,
                    reason = reason.as_str(),
                    "Action rejected"
                );
                prom::record_action(reason.as_str());
                Err(reason.into())
            }
        }
    }

    async fn skip_turn(&mut self, side: Side, turn: TurnStamp) -> Result<RoomState, DraftError> {
        match self.engine.apply_skip(&self.record.state, side, turn) {
            Ok(next) => {
                debug!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    side = %side,
                    phase_index = turn.phase_index,
                    "Turn skipped"
                );
                prom::record_action("skipped");
                self.commit(next).await
            }
            Err(reason) => {
                prom::record_action(reason.as_str());
                Err(reason.into())
            }
        }
    }

    async fn set_ready_to_start(
        &mut self,
        side: Side,
        ready: bool,
    ) -> Result<RoomState, DraftError> {
        let mut next = self.record.state.clone();
        next.ready_to_start.set(side, ready);
        let result = self.commit(next).await;
        self.broadcast(&ServerEvent::ready_to_start(&self.record.state))
            .await;
        result
    }

    async fn mark_restart_ready(&mut self, side: Side) -> Result<RoomState, DraftError> {
        let mut next = self.record.state.clone();
        next.ready_to_restart.set(side, true);
        let result = self.commit(next).await;
        self.broadcast(&ServerEvent::restart_ready(&self.record.state))
            .await;
        result
    }

    async fn reset_if_both_ready(&mut self) -> Result<bool, DraftError> {
        if !self.record.state.ready_to_restart.both() {
            return Ok(false);
        }

        self.record.state.reset_for_restart();
        let persisted = self.persist("write").await;
        prom::record_restart();

        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            swap_sides = self.record.state.swap_sides,
            "Restart approved"
        );

        self.broadcast(&ServerEvent::RestartApproved {}).await;
        self.broadcast(&ServerEvent::StateUpdated {
            room_state: self.record.state.clone(),
        })
        .await;
        self.broadcast(&ServerEvent::ready_to_start(&self.record.state))
            .await;
        self.broadcast(&ServerEvent::restart_ready(&self.record.state))
            .await;

        persisted.map(|()| true)
    }

    async fn save_round(&mut self) -> Result<RoomState, DraftError> {
        let mut next = self.record.state.clone();
        next.save_round(self.engine.table(), chrono::Utc::now().timestamp_millis())
            .map_err(|e| DraftError::Conflict(e.to_string()))?;
        self.commit(next).await
    }

    async fn set_name(&mut self, side: Side, name: &str) -> Result<RoomState, DraftError> {
        let mut next = self.record.state.clone();
        next.set_name(side, name);
        self.commit(next).await
    }

    /// Write the record. On failure the room is marked dirty for the retry
    /// tick.
    async fn persist(&mut self, operation: &'static str) -> Result<(), DraftError> {
        match self.repository.write_room(&self.record).await {
            Ok(()) => {
                if self.dirty {
                    info!(
                        target: "draft.actor.room",
                        room_code = %self.code,
                        "Room state flushed after earlier storage failure"
                    );
                }
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "draft.actor.room",
                    room_code = %self.code,
                    operation = operation,
                    error = %e,
                    "Failed to persist room state, will retry"
                );
                prom::record_storage_failure(operation);
                self.dirty = true;
                Err(match e {
                    DraftError::Storage(_) => e,
                    other => DraftError::Storage(other.to_string()),
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Supervision
    // ------------------------------------------------------------------------

    /// Reap connection actors that ended on their own, typically after a
    /// failed socket write.
    async fn check_connection_health(&mut self) {
        let finished: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for connection_id in finished {
            if let Some(managed) = self.connections.remove(&connection_id) {
                match managed.task_handle.await {
                    Ok(()) => {
                        debug!(
                            target: "draft.actor.room",
                            room_code = %self.code,
                            connection_id = %connection_id,
                            "Connection actor exited"
                        );
                    }
                    Err(join_error) => {
                        if join_error.is_panic() {
                            error!(
                                target: "draft.actor.room",
                                room_code = %self.code,
                                connection_id = %connection_id,
                                error = ?join_error,
                                "Connection actor panicked"
                            );
                            self.metrics.record_panic(ActorType::Connection);
                        }
                    }
                }

                self.drop_presence(connection_id, managed.seat).await;
            }
        }
    }

    async fn graceful_shutdown(&mut self) {
        info!(
            target: "draft.actor.room",
            room_code = %self.code,
            connections = self.connections.len(),
            dirty = self.dirty,
            "Performing graceful shutdown"
        );

        if self.dirty {
            let _ = self.persist("flush").await;
        }

        for managed in self.connections.values() {
            managed.handle.cancel();
        }

        for (connection_id, managed) in self.connections.drain() {
            match tokio::time::timeout(Duration::from_secs(5), managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "draft.actor.room",
                        room_code = %self.code,
                        connection_id = %connection_id,
                        "Connection completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "draft.actor.room",
                        room_code = %self.code,
                        connection_id = %connection_id,
                        error = ?e,
                        "Connection task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "draft.actor.room",
                        room_code = %self.code,
                        connection_id = %connection_id,
                        "Connection shutdown timed out"
                    );
                }
            }
        }
    }
}

/// Wait for a removed connection actor off the room's loop.
/// The side `command` acts for when sent from `seat`, if it may.
///
/// Timeout resolutions carry a turn stamp and may act for either side, so a
/// turn still advances while its acting side is away. The stamp keeps the
/// two participants' resolutions from both landing. Everything else acts
/// only for the connection's own side.
fn permitted_side(seat: Seat, command: &ClientCommand) -> Option<Side> {
    let own = seat.side()?;
    match command {
        ClientCommand::Action {
            side,
            turn: Some(_),
            ..
        }
        | ClientCommand::SkipTurn { side, .. } => Some(*side),
        _ => match command.side() {
            Some(side) if side != own => None,
            _ => Some(own),
        },
    }
}

fn reap_connection(room_code: RoomCode, connection_id: ConnectionId, task_handle: JoinHandle<()>) {
    tokio::spawn(async move {
        match tokio::time::timeout(Duration::from_secs(5), task_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(
                    target: "draft.actor.room",
                    room_code = %room_code,
                    connection_id = %connection_id,
                    error = ?e,
                    "Connection task panicked during removal"
                );
            }
            Err(_) => {
                warn!(
                    target: "draft.actor.room",
                    room_code = %room_code,
                    connection_id = %connection_id,
                    "Connection task cleanup timed out"
                );
            }
        }
    });
}
