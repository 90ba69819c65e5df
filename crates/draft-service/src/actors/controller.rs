//! `RoomControllerActor` - registry and supervisor for room actors.
//!
//! - Singleton per service instance
//! - Spawns a `RoomActor` the first time a stored room is touched
//! - Enforces the live room limit
//! - Forgets rooms whose actors released themselves after going idle
//! - Owns the root `CancellationToken`
//! - Detects room actor panics through their `JoinHandle`
//!
//! # Graceful Shutdown
//!
//! On SIGTERM the controller stops accepting rooms and cancels the root
//! token. Each room flushes any unsaved state and closes its sockets.

use crate::errors::DraftError;
use crate::repository::RoomRepository;

use super::messages::{ControllerMessage, ControllerStatus, RoomCapacity, RoomSummary};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use super::room::{RoomActor, RoomActorHandle, RoomContext};

use common::types::RoomCode;
use draft_core::{DraftEngine, RoomRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const CONTROLLER_CHANNEL_BUFFER: usize = 1000;

/// Limits applied by the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub max_rooms: usize,
    pub persist_retry_interval: Duration,
    /// Quiet time after which an unattended room actor stops.
    pub idle_release: Duration,
}

#[derive(Clone, Debug)]
pub struct RoomControllerActorHandle {
    sender: mpsc::Sender<ControllerMessage>,
    cancel_token: CancellationToken,
}

impl RoomControllerActorHandle {
    /// Spawn the controller and return a handle to it.
    #[must_use]
    pub fn new(
        service_id: String,
        repository: Arc<dyn RoomRepository>,
        engine: Arc<DraftEngine>,
        settings: ControllerSettings,
        metrics: Arc<ActorMetrics>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let context = RoomContext {
            engine,
            repository,
            persist_retry_interval: settings.persist_retry_interval,
            idle_release: settings.idle_release,
            metrics,
        };

        let actor = RoomControllerActor::new(
            service_id,
            receiver,
            cancel_token.clone(),
            context,
            settings.max_rooms,
        );

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Handle to the live room, loading it from storage if needed.
    pub async fn get_room(&self, code: RoomCode, create: bool) -> Result<RoomActorHandle, DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::GetRoom {
                code,
                create,
                respond_to: tx,
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))?
    }

    pub async fn delete_room(&self, code: RoomCode) -> Result<(), DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::DeleteRoom {
                code,
                respond_to: tx,
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))?
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::ListRooms { respond_to: tx })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))?
    }

    pub async fn check_capacity(&self, code: RoomCode) -> Result<RoomCapacity, DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::CheckCapacity {
                code,
                respond_to: tx,
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))?
    }

    pub async fn get_status(&self) -> Result<ControllerStatus, DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))
    }

    /// Stop accepting rooms and cancel every room actor.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), DraftError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(ControllerMessage::Shutdown {
                deadline,
                respond_to: tx,
            })
            .await
            .map_err(|e| DraftError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| DraftError::Internal(format!("response receive failed: {e}")))?
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

struct ManagedRoom {
    handle: RoomActorHandle,
    task_handle: JoinHandle<()>,
    created_at: i64,
}

pub struct RoomControllerActor {
    service_id: String,
    receiver: mpsc::Receiver<ControllerMessage>,
    cancel_token: CancellationToken,
    rooms: HashMap<RoomCode, ManagedRoom>,
    context: RoomContext,
    max_rooms: usize,
    accepting_new: bool,
    mailbox: MailboxMonitor,
}

impl RoomControllerActor {
    fn new(
        service_id: String,
        receiver: mpsc::Receiver<ControllerMessage>,
        cancel_token: CancellationToken,
        context: RoomContext,
        max_rooms: usize,
    ) -> Self {
        let mailbox = MailboxMonitor::new(ActorType::Controller, &service_id);

        Self {
            service_id,
            receiver,
            cancel_token,
            rooms: HashMap::new(),
            context,
            max_rooms,
            accepting_new: true,
            mailbox,
        }
    }

    #[instrument(skip_all, name = "draft.actor.controller", fields(service_id = %self.service_id))]
    async fn run(mut self) {
        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            max_rooms = self.max_rooms,
            "RoomControllerActor started"
        );

        loop {
            self.check_room_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "draft.actor.controller",
                        service_id = %self.service_id,
                        "RoomControllerActor received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.observe(self.receiver.len());
                            self.handle_message(message).await;
                        }
                        None => {
                            info!(
                                target: "draft.actor.controller",
                                service_id = %self.service_id,
                                "RoomControllerActor channel closed, exiting"
                            );
                            self.graceful_shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            messages_processed = self.mailbox.processed(),
            peak_backlog = self.mailbox.peak_backlog(),
            "RoomControllerActor stopped"
        );
    }

    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::GetRoom {
                code,
                create,
                respond_to,
            } => {
                let result = self.get_room(code, create).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::DeleteRoom { code, respond_to } => {
                let result = self.delete_room(&code).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::ListRooms { respond_to } => {
                let result = self.list_rooms().await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::CheckCapacity { code, respond_to } => {
                let result = self.check_capacity(&code).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.get_status());
            }

            ControllerMessage::Shutdown {
                deadline,
                respond_to,
            } => {
                info!(
                    target: "draft.actor.controller",
                    service_id = %self.service_id,
                    room_count = self.rooms.len(),
                    deadline_secs = deadline.as_secs(),
                    "Initiating graceful shutdown"
                );
                self.accepting_new = false;
                self.cancel_token.cancel();
                let _ = respond_to.send(Ok(()));
            }
        }
    }

    async fn get_room(&mut self, code: RoomCode, create: bool) -> Result<RoomActorHandle, DraftError> {
        if let Some(managed) = self.rooms.get(&code) {
            if !managed.task_handle.is_finished() {
                return Ok(managed.handle.clone());
            }
        }
        // A finished task is reaped on the next loop pass; replace it now.
        if let Some(stale) = self.rooms.remove(&code) {
            self.reap_room(&code, stale).await;
        }

        if !self.accepting_new {
            return Err(DraftError::Draining);
        }

        let (record, dirty) = match self.context.repository.read_room(&code).await {
            Ok(Some(record)) => (record, false),
            Ok(None) if create => (
                RoomRecord::new(code.clone(), chrono::Utc::now().timestamp_millis()),
                true,
            ),
            Ok(None) => return Err(DraftError::RoomNotFound(code.to_string())),
            Err(e) => {
                crate::observability::metrics::record_storage_failure("read");
                warn!(
                    target: "draft.actor.controller",
                    service_id = %self.service_id,
                    room_code = %code,
                    error = %e,
                    "Failed to load room"
                );
                return Err(e);
            }
        };

        // Released rooms do not count against the limit.
        self.check_room_health().await;
        if self.rooms.len() >= self.max_rooms {
            warn!(
                target: "draft.actor.controller",
                service_id = %self.service_id,
                max_rooms = self.max_rooms,
                "Room limit reached"
            );
            return Err(DraftError::CapacityExceeded);
        }

        Ok(self.spawn_room(record, dirty))
    }

    fn spawn_room(&mut self, record: RoomRecord, dirty: bool) -> RoomActorHandle {
        let code = record.code.clone();
        let created_at = record.created_at;

        let (handle, task_handle) = RoomActor::spawn(
            record,
            dirty,
            self.context.clone(),
            self.cancel_token.child_token(),
        );

        self.rooms.insert(
            code.clone(),
            ManagedRoom {
                handle: handle.clone(),
                task_handle,
                created_at,
            },
        );
        self.context.metrics.room_created();

        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            room_code = %code,
            fresh = dirty,
            total_rooms = self.rooms.len(),
            "Room actor created"
        );

        handle
    }

    /// Stop the room, then remove the stored record. The actor is awaited
    /// first so its shutdown flush cannot resurrect the record.
    async fn delete_room(&mut self, code: &RoomCode) -> Result<(), DraftError> {
        if let Some(managed) = self.rooms.remove(code) {
            managed.handle.cancel();
            self.reap_room(code, managed).await;
        }

        self.context.repository.delete_room(code).await.map_err(|e| {
            crate::observability::metrics::record_storage_failure("delete");
            e
        })?;

        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            room_code = %code,
            total_rooms = self.rooms.len(),
            "Room deleted"
        );
        Ok(())
    }

    /// Stored rooms with live state swapped in, plus live rooms whose first
    /// write has not landed yet.
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, DraftError> {
        let stored = self.context.repository.list_rooms().await.map_err(|e| {
            crate::observability::metrics::record_storage_failure("list");
            e
        })?;

        let mut summaries = Vec::with_capacity(stored.len());
        for record in stored {
            let live_state = match self.rooms.get(&record.code) {
                Some(managed) => managed.handle.get_state().await.ok(),
                None => None,
            };
            let live = live_state.is_some();
            let state = live_state.unwrap_or(record.state);
            summaries.push(RoomSummary::new(record.code, record.created_at, &state, live));
        }

        for (code, managed) in &self.rooms {
            if summaries.iter().any(|s| &s.code == code) {
                continue;
            }
            if let Ok(state) = managed.handle.get_state().await {
                summaries.push(RoomSummary::new(
                    code.clone(),
                    managed.created_at,
                    &state,
                    true,
                ));
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Presence comes from the live actor; stored-only rooms report empty
    /// seats.
    async fn check_capacity(&self, code: &RoomCode) -> Result<RoomCapacity, DraftError> {
        if let Some(managed) = self.rooms.get(code) {
            if let Ok(presence) = managed.handle.presence().await {
                return Ok(RoomCapacity {
                    has_left: presence.left,
                    has_right: presence.right,
                    exists: true,
                });
            }
        }

        let exists = self.context.repository.read_room(code).await?.is_some();
        Ok(RoomCapacity {
            exists,
            ..RoomCapacity::missing()
        })
    }

    fn get_status(&self) -> ControllerStatus {
        ControllerStatus {
            room_count: self.rooms.len(),
            connection_count: self.context.metrics.connection_count(),
            is_draining: !self.accepting_new,
            mailbox_depth: self.receiver.len(),
        }
    }

    /// Wait for a removed room's task and account for it.
    async fn reap_room(&self, code: &RoomCode, managed: ManagedRoom) {
        match tokio::time::timeout(Duration::from_secs(5), managed.task_handle).await {
            Ok(Ok(())) => {
                debug!(
                    target: "draft.actor.controller",
                    service_id = %self.service_id,
                    room_code = %code,
                    "Room actor task completed cleanly"
                );
            }
            Ok(Err(e)) => {
                if e.is_panic() {
                    self.context.metrics.record_panic(ActorType::Room);
                }
                warn!(
                    target: "draft.actor.controller",
                    service_id = %self.service_id,
                    room_code = %code,
                    error = ?e,
                    "Room actor task failed during removal"
                );
            }
            Err(_) => {
                warn!(
                    target: "draft.actor.controller",
                    service_id = %self.service_id,
                    room_code = %code,
                    "Room actor task cleanup timed out"
                );
            }
        }
        self.context.metrics.room_removed();
    }

    async fn graceful_shutdown(&mut self) {
        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            room_count = self.rooms.len(),
            "Performing graceful shutdown"
        );

        self.accepting_new = false;

        for managed in self.rooms.values() {
            managed.handle.cancel();
        }

        for (code, managed) in self.rooms.drain() {
            match tokio::time::timeout(Duration::from_secs(30), managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "draft.actor.controller",
                        service_id = %self.service_id,
                        room_code = %code,
                        "Room actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "draft.actor.controller",
                        service_id = %self.service_id,
                        room_code = %code,
                        error = ?e,
                        "Room actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "draft.actor.controller",
                        service_id = %self.service_id,
                        room_code = %code,
                        "Room actor shutdown timed out"
                    );
                }
            }
            self.context.metrics.room_removed();
        }

        info!(
            target: "draft.actor.controller",
            service_id = %self.service_id,
            "Graceful shutdown complete"
        );
    }

    async fn check_room_health(&mut self) {
        let finished: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(code, _)| code.clone())
            .collect();

        for code in finished {
            if let Some(managed) = self.rooms.remove(&code) {
                match managed.task_handle.await {
                    Ok(()) => {
                        info!(
                            target: "draft.actor.controller",
                            service_id = %self.service_id,
                            room_code = %code,
                            "Room actor exited"
                        );
                    }
                    Err(join_error) => {
                        if join_error.is_panic() {
                            error!(
                                target: "draft.actor.controller",
                                service_id = %self.service_id,
                                room_code = %code,
                                error = ?join_error,
                                "Room actor panicked; room will reload from storage on next access"
                            );
                            self.context.metrics.record_panic(ActorType::Room);
                        }
                    }
                }
                self.context.metrics.room_removed();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::repository::mock::MockRoomRepository;
    use draft_core::{ActionKind, ActionRequest, EntityId, RoomState, Side};

    const IDLE: Duration = Duration::from_secs(600);

    fn code(raw: &str) -> RoomCode {
        RoomCode::parse(raw).unwrap()
    }

    fn controller(
        repo: &Arc<MockRoomRepository>,
        max_rooms: usize,
    ) -> (RoomControllerActorHandle, Arc<ActorMetrics>) {
        let metrics = ActorMetrics::new();
        let handle = RoomControllerActorHandle::new(
            "draft-test".to_string(),
            Arc::clone(repo) as Arc<dyn RoomRepository>,
            Arc::new(DraftEngine::default()),
            ControllerSettings {
                max_rooms,
                persist_retry_interval: Duration::from_secs(5),
                idle_release: IDLE,
            },
            Arc::clone(&metrics),
        );
        (handle, metrics)
    }

    #[tokio::test]
    async fn test_get_room_unknown_without_create() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, _) = controller(&repo, 10);

        let result = controller.get_room(code("NOPE"), false).await;
        assert!(matches!(result, Err(DraftError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_room_create_then_reuse() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, metrics) = controller(&repo, 10);

        let first = controller.get_room(code("R1"), true).await.unwrap();
        let second = controller.get_room(code("R1"), false).await.unwrap();
        assert_eq!(first.code(), second.code());
        assert_eq!(metrics.room_count(), 1);

        let status = controller.get_status().await.unwrap();
        assert_eq!(status.room_count, 1);
        assert!(!status.is_draining);
    }

    #[tokio::test]
    async fn test_stored_room_is_loaded_on_access() {
        let repo = Arc::new(MockRoomRepository::new());
        let mut record = RoomRecord::new(code("STORED"), 5);
        record.state.left_name = Some("Ana".to_string());
        repo.insert(record);
        let (controller, _) = controller(&repo, 10);

        let room = controller.get_room(code("STORED"), false).await.unwrap();
        let state = room.get_state().await.unwrap();
        assert_eq!(state.left_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_room_limit() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, _) = controller(&repo, 1);

        controller.get_room(code("A"), true).await.unwrap();
        let result = controller.get_room(code("B"), true).await;
        assert!(matches!(result, Err(DraftError::CapacityExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_rooms_are_released_and_free_capacity() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, metrics) = controller(&repo, 2);

        for raw in ["A", "B"] {
            let room = controller.get_room(code(raw), true).await.unwrap();
            room.replace_state(RoomState::new()).await.unwrap();
        }
        assert!(matches!(
            controller.get_room(code("C"), true).await,
            Err(DraftError::CapacityExceeded)
        ));

        tokio::time::sleep(IDLE * 2).await;

        controller.get_room(code("C"), true).await.unwrap();
        assert_eq!(metrics.room_count(), 1);
        assert_eq!(controller.get_status().await.unwrap().room_count, 1);

        // Released rooms come back from storage.
        let room = controller.get_room(code("A"), false).await.unwrap();
        assert_eq!(room.get_state().await.unwrap(), RoomState::new());
    }

    #[tokio::test]
    async fn test_delete_room_removes_live_and_stored() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, metrics) = controller(&repo, 10);

        let room = controller.get_room(code("GONE"), true).await.unwrap();
        room.set_name(Side::Left, "Ana".to_string()).await.unwrap();
        assert!(repo.stored(&code("GONE")).is_some());

        controller.delete_room(code("GONE")).await.unwrap();
        assert!(repo.stored(&code("GONE")).is_none());
        assert!(room.is_cancelled());
        assert_eq!(metrics.room_count(), 0);

        let result = controller.get_room(code("GONE"), false).await;
        assert!(matches!(result, Err(DraftError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_overlays_live_state_newest_first() {
        let repo = Arc::new(MockRoomRepository::new());
        repo.insert(RoomRecord::new(code("OLD"), 100));
        repo.insert(RoomRecord::new(code("NEW"), 200));
        let (controller, _) = controller(&repo, 10);

        let old = controller.get_room(code("OLD"), false).await.unwrap();
        old.apply_action(ActionRequest {
            room_code: code("OLD"),
            acting_side: Side::Left,
            kind: ActionKind::Ban,
            entity_id: EntityId(1),
            turn: None,
        })
        .await
        .unwrap();

        let rooms = controller.list_rooms().await.unwrap();
        let codes: Vec<&str> = rooms.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["NEW", "OLD"]);
        let live: Vec<bool> = rooms.iter().map(|r| r.live).collect();
        assert_eq!(live, vec![false, true]);
    }

    #[tokio::test]
    async fn test_check_capacity() {
        let repo = Arc::new(MockRoomRepository::new());
        repo.insert(RoomRecord::new(code("COLD"), 1));
        let (controller, _) = controller(&repo, 10);

        assert_eq!(
            controller.check_capacity(code("MISSING")).await.unwrap(),
            RoomCapacity::missing()
        );

        let cold = controller.check_capacity(code("COLD")).await.unwrap();
        assert!(cold.exists);
        assert!(!cold.has_left && !cold.has_right);

        controller.get_room(code("COLD"), false).await.unwrap();
        let live = controller.check_capacity(code("COLD")).await.unwrap();
        assert!(live.exists);
        assert!(!live.has_left);
    }

    #[tokio::test]
    async fn test_storage_failure_on_load_is_retryable() {
        let repo = Arc::new(MockRoomRepository::failing());
        let (controller, _) = controller(&repo, 10);

        let result = controller.get_room(code("R1"), true).await;
        match result {
            Err(e) => assert!(e.is_retryable()),
            Ok(_) => panic!("load should fail"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains() {
        let repo = Arc::new(MockRoomRepository::new());
        let (controller, metrics) = controller(&repo, 10);

        let room = controller.get_room(code("R1"), true).await.unwrap();
        controller.shutdown(Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(controller.is_cancelled());
        assert!(room.is_cancelled());
        assert_eq!(metrics.room_count(), 0);
    }
}
