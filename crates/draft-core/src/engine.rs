//! Draft Engine: validation and state transition for ban/pick actions.
//!
//! The engine is pure. It never mutates the state it is handed; an accepted
//! action yields a new `RoomState` and a rejected one leaves the caller's
//! copy untouched. Locking is the Session Store's problem, not ours.

use crate::phase::PhaseTable;
use crate::roster::RosterEntry;
use crate::state::RoomState;
use crate::types::{ActionKind, EntityId, Side};
use common::types::RoomCode;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Turn position an action was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStamp {
    pub phase_index: usize,
    pub step_in_phase: u32,
}

impl TurnStamp {
    /// Current position of a room.
    #[must_use]
    pub fn of(state: &RoomState) -> Self {
        Self {
            phase_index: state.phase_index,
            step_in_phase: state.step_in_phase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub room_code: RoomCode,
    pub acting_side: Side,
    pub kind: ActionKind,
    pub entity_id: EntityId,
    /// When present, the action only applies at exactly this position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<TurnStamp>,
}

/// Expected outcomes of racing input. None of these are hard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("draft is already complete")]
    DraftComplete,

    #[error("entity has already been banned or picked")]
    AlreadyTaken,

    #[error("not this side's turn or action")]
    WrongTurn,
}

impl RejectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RejectReason::DraftComplete => "draft_complete",
            RejectReason::AlreadyTaken => "already_taken",
            RejectReason::WrongTurn => "wrong_turn",
        }
    }
}

/// What a timed-out turn should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoResolution {
    /// Submit this request on the effective side's behalf.
    Selected(ActionRequest),
    /// Nothing left to choose; advance past the turn without a selection.
    Exhausted(TurnStamp),
    /// No turn pending.
    Complete,
}

#[derive(Debug, Clone, Default)]
pub struct DraftEngine {
    table: PhaseTable,
}

impl DraftEngine {
    #[must_use]
    pub fn new(table: PhaseTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    /// Side expected to act at the room's current position.
    #[must_use]
    pub fn effective_side(&self, room: &RoomState) -> Option<Side> {
        self.table.effective_side(room.phase_index, room.swap_sides)
    }

    /// Validate an action against the room and return the resulting state.
    ///
    /// Rules apply in order: a complete draft rejects everything, a taken
    /// entity is rejected next, and only then is turn ownership checked.
    ///
    /// # Errors
    ///
    /// Returns the first rule the request breaks.
    pub fn validate_and_apply(
        &self,
        room: &RoomState,
        request: &ActionRequest,
    ) -> Result<RoomState, RejectReason> {
        let phase = self
            .table
            .get(room.phase_index)
            .ok_or(RejectReason::DraftComplete)?;

        if room.contains(request.entity_id) {
            return Err(RejectReason::AlreadyTaken);
        }

        let effective = self.table.effective_side(room.phase_index, room.swap_sides);
        if effective != Some(request.acting_side) || request.kind != phase.action {
            return Err(RejectReason::WrongTurn);
        }
        if request.turn.is_some_and(|stamp| stamp != TurnStamp::of(room)) {
            return Err(RejectReason::WrongTurn);
        }

        let mut next = room.clone();
        next.selections_mut(request.acting_side, request.kind)
            .push(request.entity_id);
        self.advance(&mut next);
        Ok(next)
    }

    /// Advance past the current turn without a selection.
    ///
    /// Used when the roster has nothing left to offer. Completion, side and
    /// stamp are checked the same way as for a normal action.
    ///
    /// # Errors
    ///
    /// `DraftComplete` or `WrongTurn`.
    pub fn apply_skip(
        &self,
        room: &RoomState,
        side: Side,
        stamp: TurnStamp,
    ) -> Result<RoomState, RejectReason> {
        if self.table.get(room.phase_index).is_none() {
            return Err(RejectReason::DraftComplete);
        }
        if self.effective_side(room) != Some(side) || stamp != TurnStamp::of(room) {
            return Err(RejectReason::WrongTurn);
        }

        let mut next = room.clone();
        self.advance(&mut next);
        Ok(next)
    }

    /// Choose what a timed-out turn should do.
    pub fn auto_resolve<R: Rng + ?Sized>(
        &self,
        room_code: &RoomCode,
        room: &RoomState,
        roster: &[RosterEntry],
        rng: &mut R,
    ) -> AutoResolution {
        let (Some(phase), Some(side)) = (
            self.table.get(room.phase_index),
            self.effective_side(room),
        ) else {
            return AutoResolution::Complete;
        };

        let stamp = TurnStamp::of(room);
        let available = room.available(roster);
        if available.is_empty() {
            return AutoResolution::Exhausted(stamp);
        }

        let pick = rng.gen_range(0..available.len());
        match available.get(pick) {
            Some(entity_id) => AutoResolution::Selected(ActionRequest {
                room_code: room_code.clone(),
                acting_side: side,
                kind: phase.action,
                entity_id: *entity_id,
                turn: Some(stamp),
            }),
            None => AutoResolution::Exhausted(stamp),
        }
    }

    /// Resolve and apply a timed-out turn in one step.
    ///
    /// # Errors
    ///
    /// `DraftComplete` when no turn is pending.
    pub fn apply_auto_resolution<R: Rng + ?Sized>(
        &self,
        room_code: &RoomCode,
        room: &RoomState,
        roster: &[RosterEntry],
        rng: &mut R,
    ) -> Result<RoomState, RejectReason> {
        match self.auto_resolve(room_code, room, roster, rng) {
            AutoResolution::Selected(request) => self.validate_and_apply(room, &request),
            AutoResolution::Exhausted(stamp) => {
                let side = self
                    .effective_side(room)
                    .ok_or(RejectReason::DraftComplete)?;
                self.apply_skip(room, side, stamp)
            }
            AutoResolution::Complete => Err(RejectReason::DraftComplete),
        }
    }

    fn advance(&self, state: &mut RoomState) {
        let repetitions = self
            .table
            .get(state.phase_index)
            .map_or(0, |phase| phase.repetitions);
        state.step_in_phase += 1;
        if state.step_in_phase >= repetitions {
            state.phase_index += 1;
            state.step_in_phase = 0;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn code() -> RoomCode {
        RoomCode::parse("room-1").unwrap()
    }

    fn request(side: Side, kind: ActionKind, entity: u32) -> ActionRequest {
        ActionRequest {
            room_code: code(),
            acting_side: side,
            kind,
            entity_id: EntityId(entity),
            turn: None,
        }
    }

    fn three_phase_engine() -> DraftEngine {
        DraftEngine::new(
            PhaseTable::new([
                (Side::Left, ActionKind::Ban, 2),
                (Side::Right, ActionKind::Ban, 2),
                (Side::Left, ActionKind::Pick, 1),
            ])
            .unwrap(),
        )
    }

    fn roster(n: u32) -> Vec<RosterEntry> {
        (1..=n).map(|id| RosterEntry::new(id, format!("hero-{id}"))).collect()
    }

    fn assert_invariants(table: &PhaseTable, state: &RoomState) {
        let mut seen = HashSet::new();
        for id in state
            .left_bans
            .iter()
            .chain(&state.right_bans)
            .chain(&state.left_picks)
            .chain(&state.right_picks)
        {
            assert!(seen.insert(*id), "entity {id} appears twice");
        }
        assert_eq!(
            state.selection_count(),
            table.total_actions_before(state.phase_index) + state.step_in_phase as usize
        );
    }

    #[test]
    fn test_three_phase_walkthrough() {
        let engine = three_phase_engine();
        let mut state = RoomState::new();

        state = engine
            .validate_and_apply(&state, &request(Side::Left, ActionKind::Ban, 1))
            .unwrap();
        assert_eq!((state.phase_index, state.step_in_phase), (0, 1));
        state = engine
            .validate_and_apply(&state, &request(Side::Left, ActionKind::Ban, 2))
            .unwrap();
        assert_eq!((state.phase_index, state.step_in_phase), (1, 0));

        state = engine
            .validate_and_apply(&state, &request(Side::Right, ActionKind::Ban, 3))
            .unwrap();
        assert_eq!((state.phase_index, state.step_in_phase), (1, 1));
        state = engine
            .validate_and_apply(&state, &request(Side::Right, ActionKind::Ban, 4))
            .unwrap();
        assert_eq!((state.phase_index, state.step_in_phase), (2, 0));

        state = engine
            .validate_and_apply(&state, &request(Side::Left, ActionKind::Pick, 9))
            .unwrap();
        assert_eq!(state.phase_index, 3);
        assert_eq!(state.step_in_phase, 0);
        assert_eq!(state.left_picks, vec![EntityId(9)]);
        assert!(state.is_complete(engine.table()));
        assert_invariants(engine.table(), &state);
    }

    #[test]
    fn test_replayed_request_is_already_taken() {
        let engine = DraftEngine::default();
        let req = request(Side::Left, ActionKind::Ban, 5);
        let after = engine.validate_and_apply(&RoomState::new(), &req).unwrap();

        assert_eq!(
            engine.validate_and_apply(&after, &req),
            Err(RejectReason::AlreadyTaken)
        );
        assert_eq!(after.left_bans, vec![EntityId(5)]);
    }

    #[test]
    fn test_wrong_side_is_rejected_without_change() {
        let engine = DraftEngine::default();
        let state = RoomState::new();
        let before = state.clone();

        let result = engine.validate_and_apply(&state, &request(Side::Right, ActionKind::Ban, 1));
        assert_eq!(result, Err(RejectReason::WrongTurn));
        assert_eq!(state, before);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let engine = DraftEngine::default();
        let result =
            engine.validate_and_apply(&RoomState::new(), &request(Side::Left, ActionKind::Pick, 1));
        assert_eq!(result, Err(RejectReason::WrongTurn));
    }

    #[test]
    fn test_rule_order_complete_before_taken() {
        let engine = three_phase_engine();
        let mut state = RoomState::new();
        state.phase_index = 3;
        state.left_bans.push(EntityId(1));

        assert_eq!(
            engine.validate_and_apply(&state, &request(Side::Left, ActionKind::Ban, 1)),
            Err(RejectReason::DraftComplete)
        );
    }

    #[test]
    fn test_rule_order_taken_before_turn() {
        let engine = DraftEngine::default();
        let mut state = RoomState::new();
        state.left_bans.push(EntityId(1));
        state.step_in_phase = 1;

        assert_eq!(
            engine.validate_and_apply(&state, &request(Side::Right, ActionKind::Pick, 1)),
            Err(RejectReason::AlreadyTaken)
        );
    }

    #[test]
    fn test_swap_maps_effective_side() {
        let engine = DraftEngine::default();
        let mut state = RoomState::new();
        assert_eq!(engine.effective_side(&state), Some(Side::Left));

        state.swap_sides = true;
        assert_eq!(engine.effective_side(&state), Some(Side::Right));
        assert_eq!(
            engine.validate_and_apply(&state, &request(Side::Left, ActionKind::Ban, 1)),
            Err(RejectReason::WrongTurn)
        );
        let next = engine
            .validate_and_apply(&state, &request(Side::Right, ActionKind::Ban, 1))
            .unwrap();
        assert_eq!(next.right_bans, vec![EntityId(1)]);
    }

    #[test]
    fn test_stale_turn_stamp_is_rejected() {
        let engine = DraftEngine::default();
        let state = RoomState::new();
        let stamp = TurnStamp::of(&state);

        let mut first = request(Side::Left, ActionKind::Ban, 1);
        first.turn = Some(stamp);
        let after = engine.validate_and_apply(&state, &first).unwrap();

        let mut second = request(Side::Left, ActionKind::Ban, 2);
        second.turn = Some(stamp);
        assert_eq!(
            engine.validate_and_apply(&after, &second),
            Err(RejectReason::WrongTurn)
        );
    }

    #[test]
    fn test_full_standard_draft_keeps_invariants() {
        let engine = DraftEngine::default();
        let roster = roster(40);
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = RoomState::new();

        while !state.is_complete(engine.table()) {
            state = engine
                .apply_auto_resolution(&code(), &state, &roster, &mut rng)
                .unwrap();
            assert_invariants(engine.table(), &state);
        }
        assert_eq!(state.selection_count(), engine.table().total_actions());
        assert_eq!(
            engine.apply_auto_resolution(&code(), &state, &roster, &mut rng),
            Err(RejectReason::DraftComplete)
        );
    }

    #[test]
    fn test_auto_resolve_picks_available_entity_for_effective_side() {
        let engine = DraftEngine::default();
        let mut state = RoomState::new();
        state.swap_sides = true;
        state.right_bans.push(EntityId(1));
        state.step_in_phase = 1;
        let mut rng = StdRng::seed_from_u64(1);

        match engine.auto_resolve(&code(), &state, &roster(2), &mut rng) {
            AutoResolution::Selected(req) => {
                assert_eq!(req.acting_side, Side::Right);
                assert_eq!(req.kind, ActionKind::Ban);
                assert_eq!(req.entity_id, EntityId(2));
                assert_eq!(req.turn, Some(TurnStamp::of(&state)));
            }
            other => panic!("expected selection, got {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_roster_advances_without_selection() {
        let engine = three_phase_engine();
        let mut rng = StdRng::seed_from_u64(3);
        let roster = roster(1);

        let mut state = engine
            .apply_auto_resolution(&code(), &RoomState::new(), &roster, &mut rng)
            .unwrap();
        assert_eq!(state.left_bans, vec![EntityId(1)]);

        assert_eq!(
            engine.auto_resolve(&code(), &state, &roster, &mut rng),
            AutoResolution::Exhausted(TurnStamp::of(&state))
        );
        state = engine
            .apply_auto_resolution(&code(), &state, &roster, &mut rng)
            .unwrap();
        assert_eq!((state.phase_index, state.step_in_phase), (1, 0));
        assert_eq!(state.selection_count(), 1);

        // Empty roster drains the remaining turns.
        while !state.is_complete(engine.table()) {
            state = engine
                .apply_auto_resolution(&code(), &state, &[], &mut rng)
                .unwrap();
        }
        assert_eq!(state.selection_count(), 1);
    }

    #[test]
    fn test_skip_requires_effective_side_and_current_stamp() {
        let engine = DraftEngine::default();
        let state = RoomState::new();
        let stamp = TurnStamp::of(&state);

        assert_eq!(
            engine.apply_skip(&state, Side::Right, stamp),
            Err(RejectReason::WrongTurn)
        );
        let stale = TurnStamp {
            phase_index: 0,
            step_in_phase: 1,
        };
        assert_eq!(
            engine.apply_skip(&state, Side::Left, stale),
            Err(RejectReason::WrongTurn)
        );

        let next = engine.apply_skip(&state, Side::Left, stamp).unwrap();
        assert_eq!((next.phase_index, next.step_in_phase), (0, 1));
        assert_eq!(next.selection_count(), 0);
    }

    #[test]
    fn test_skip_on_complete_draft() {
        let engine = three_phase_engine();
        let mut state = RoomState::new();
        state.phase_index = 3;
        assert_eq!(
            engine.apply_skip(&state, Side::Left, TurnStamp::of(&state)),
            Err(RejectReason::DraftComplete)
        );
        assert_eq!(
            engine.auto_resolve(&code(), &state, &roster(3), &mut StdRng::seed_from_u64(0)),
            AutoResolution::Complete
        );
    }

    #[test]
    fn test_restart_after_full_draft() {
        let engine = DraftEngine::default();
        let mut rng = StdRng::seed_from_u64(11);
        let roster = roster(30);
        let mut state = RoomState::new();
        while !state.is_complete(engine.table()) {
            state = engine
                .apply_auto_resolution(&code(), &state, &roster, &mut rng)
                .unwrap();
        }
        state.save_round(engine.table(), 1).unwrap();
        state.ready_to_restart.set(Side::Left, true);
        state.ready_to_restart.set(Side::Right, true);

        state.reset_for_restart();

        assert_eq!(state.selection_count(), 0);
        assert_eq!((state.phase_index, state.step_in_phase), (0, 0));
        assert!(state.swap_sides);
        assert!(!state.has_been_saved);
        assert_eq!(engine.effective_side(&state), Some(Side::Right));
    }

    #[test]
    fn test_reject_reason_labels() {
        assert_eq!(RejectReason::DraftComplete.as_str(), "draft_complete");
        assert_eq!(RejectReason::AlreadyTaken.as_str(), "already_taken");
        assert_eq!(RejectReason::WrongTurn.as_str(), "wrong_turn");
    }
}
