//! Session Store facade.
//!
//! [`SessionStore`] is the cloneable entry point used by REST handlers and
//! the websocket layer. Every call resolves the room through the controller
//! and then talks to that room's actor, so all mutations of one room are
//! serialized while different rooms proceed in parallel.

use crate::actors::{RoomActorHandle, RoomCapacity, RoomControllerActorHandle, RoomSummary};
use crate::errors::DraftError;

use common::types::RoomCode;
use draft_core::{ActionRequest, RejectReason, RoomState, Side, TurnStamp};

#[derive(Clone, Debug)]
pub struct SessionStore {
    controller: RoomControllerActorHandle,
}

impl SessionStore {
    #[must_use]
    pub fn new(controller: RoomControllerActorHandle) -> Self {
        Self { controller }
    }

    #[must_use]
    pub fn controller(&self) -> &RoomControllerActorHandle {
        &self.controller
    }

    /// Live handle for an existing room.
    ///
    /// # Errors
    ///
    /// `RoomNotFound` when the code is neither live nor stored.
    pub async fn room(&self, code: &RoomCode) -> Result<RoomActorHandle, DraftError> {
        self.controller.get_room(code.clone(), false).await
    }

    /// Current state, or `None` for an unknown room.
    pub async fn load(&self, code: &RoomCode) -> Result<Option<RoomState>, DraftError> {
        match self.room(code).await {
            Ok(room) => room.get_state().await.map(Some),
            Err(DraftError::RoomNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Overwrite a room's state, creating the room if needed.
    pub async fn save(&self, code: &RoomCode, state: RoomState) -> Result<(), DraftError> {
        let room = self.controller.get_room(code.clone(), true).await?;
        room.replace_state(state).await.map(drop)
    }

    /// Create the room, or reset an existing room to a fresh state.
    pub async fn initialize(&self, code: &RoomCode) -> Result<RoomState, DraftError> {
        let room = self.controller.get_room(code.clone(), true).await?;
        room.replace_state(RoomState::new()).await
    }

    /// Validate and apply one action.
    ///
    /// # Errors
    ///
    /// `Rejected` for engine refusals (including a request naming another
    /// room), `Storage` when the accepted state could not be written.
    pub async fn apply_action(
        &self,
        code: &RoomCode,
        request: ActionRequest,
    ) -> Result<RoomState, DraftError> {
        if &request.room_code != code {
            return Err(DraftError::Rejected(RejectReason::WrongTurn));
        }
        self.room(code).await?.apply_action(request).await
    }

    pub async fn set_ready_to_start(
        &self,
        code: &RoomCode,
        side: Side,
        ready: bool,
    ) -> Result<RoomState, DraftError> {
        self.room(code).await?.set_ready_to_start(side, ready).await
    }

    pub async fn mark_restart_ready(&self, code: &RoomCode, side: Side) -> Result<(), DraftError> {
        self.room(code).await?.mark_restart_ready(side).await.map(drop)
    }

    /// Perform the restart if both sides asked for it.
    pub async fn reset_if_both_ready(&self, code: &RoomCode) -> Result<bool, DraftError> {
        self.room(code).await?.reset_if_both_ready().await
    }

    pub async fn skip_turn(
        &self,
        code: &RoomCode,
        side: Side,
        turn: TurnStamp,
    ) -> Result<RoomState, DraftError> {
        self.room(code).await?.skip_turn(side, turn).await
    }

    pub async fn save_round(&self, code: &RoomCode) -> Result<RoomState, DraftError> {
        self.room(code).await?.save_round().await
    }

    pub async fn set_name(
        &self,
        code: &RoomCode,
        side: Side,
        name: String,
    ) -> Result<RoomState, DraftError> {
        self.room(code).await?.set_name(side, name).await
    }

    pub async fn delete(&self, code: &RoomCode) -> Result<(), DraftError> {
        self.controller.delete_room(code.clone()).await
    }

    /// Rooms, newest first.
    pub async fn list(&self) -> Result<Vec<RoomSummary>, DraftError> {
        self.controller.list_rooms().await
    }

    pub async fn check_capacity(&self, code: &RoomCode) -> Result<RoomCapacity, DraftError> {
        self.controller.check_capacity(code.clone()).await
    }
}
