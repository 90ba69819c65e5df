//! Authoritative per-room state.
//!
//! `RoomState` is the only thing that is persisted and broadcast. It is owned
//! by the room's single writer on the server and mutated only through
//! [`crate::engine::DraftEngine`], the readiness setters, and the round log
//! below. Endpoints hold copies purely for diffing.

use crate::phase::PhaseTable;
use crate::roster::RosterEntry;
use crate::types::{ActionKind, EntityId, Side, SidePair};
use common::types::RoomCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Team names longer than this are cut.
pub const MAX_NAME_LEN: usize = 32;

/// Fallback names recorded in the round log when a side never set one.
pub const DEFAULT_LEFT_NAME: &str = "Left";
pub const DEFAULT_RIGHT_NAME: &str = "Right";

/// Frozen snapshot of one completed draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub sequence_number: u32,
    pub left_name: String,
    pub right_name: String,
    pub left_bans: Vec<EntityId>,
    pub right_bans: Vec<EntityId>,
    pub left_picks: Vec<EntityId>,
    pub right_picks: Vec<EntityId>,
    /// Milliseconds since the Unix epoch.
    pub saved_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaveRoundError {
    #[error("draft is not complete")]
    NotComplete,

    #[error("this draft has already been saved")]
    AlreadySaved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomState {
    pub phase_index: usize,
    pub step_in_phase: u32,
    pub left_bans: Vec<EntityId>,
    pub right_bans: Vec<EntityId>,
    pub left_picks: Vec<EntityId>,
    pub right_picks: Vec<EntityId>,
    pub left_name: Option<String>,
    pub right_name: Option<String>,
    pub swap_sides: bool,
    pub ready_to_start: SidePair<bool>,
    pub ready_to_restart: SidePair<bool>,
    pub saved_rounds: Vec<RoundRecord>,
    pub has_been_saved: bool,
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomState {
    /// Fresh, empty room.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase_index: 0,
            step_in_phase: 0,
            left_bans: Vec::new(),
            right_bans: Vec::new(),
            left_picks: Vec::new(),
            right_picks: Vec::new(),
            left_name: None,
            right_name: None,
            swap_sides: false,
            ready_to_start: SidePair::default(),
            ready_to_restart: SidePair::default(),
            saved_rounds: Vec::new(),
            has_been_saved: false,
        }
    }

    #[must_use]
    pub fn is_complete(&self, table: &PhaseTable) -> bool {
        self.phase_index >= table.len()
    }

    #[must_use]
    pub fn selections(&self, side: Side, kind: ActionKind) -> &[EntityId] {
        match (side, kind) {
            (Side::Left, ActionKind::Ban) => &self.left_bans,
            (Side::Right, ActionKind::Ban) => &self.right_bans,
            (Side::Left, ActionKind::Pick) => &self.left_picks,
            (Side::Right, ActionKind::Pick) => &self.right_picks,
        }
    }

    pub(crate) fn selections_mut(&mut self, side: Side, kind: ActionKind) -> &mut Vec<EntityId> {
        match (side, kind) {
            (Side::Left, ActionKind::Ban) => &mut self.left_bans,
            (Side::Right, ActionKind::Ban) => &mut self.right_bans,
            (Side::Left, ActionKind::Pick) => &mut self.left_picks,
            (Side::Right, ActionKind::Pick) => &mut self.right_picks,
        }
    }

    /// Whether the entity is already banned or picked by either side.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.left_bans.contains(&entity)
            || self.right_bans.contains(&entity)
            || self.left_picks.contains(&entity)
            || self.right_picks.contains(&entity)
    }

    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.left_bans.len() + self.right_bans.len() + self.left_picks.len() + self.right_picks.len()
    }

    /// Roster ids still free to ban or pick, in roster order.
    #[must_use]
    pub fn available(&self, roster: &[RosterEntry]) -> Vec<EntityId> {
        roster
            .iter()
            .map(|entry| entry.id)
            .filter(|id| !self.contains(*id))
            .collect()
    }

    #[must_use]
    pub fn name(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left_name.as_deref(),
            Side::Right => self.right_name.as_deref(),
        }
    }

    /// Set or clear a side's display name.
    ///
    /// Whitespace is trimmed, an empty name clears it, and long names are cut
    /// to [`MAX_NAME_LEN`] characters.
    pub fn set_name(&mut self, side: Side, name: &str) {
        let trimmed = name.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.chars().take(MAX_NAME_LEN).collect::<String>())
        };
        match side {
            Side::Left => self.left_name = value,
            Side::Right => self.right_name = value,
        }
    }

    /// Return to a fresh draft after both sides confirmed a restart.
    ///
    /// Selections, position, readiness and the saved flag are cleared and
    /// the side mapping flips. Names and the round log carry over.
    pub fn reset_for_restart(&mut self) {
        self.phase_index = 0;
        self.step_in_phase = 0;
        self.left_bans.clear();
        self.right_bans.clear();
        self.left_picks.clear();
        self.right_picks.clear();
        self.ready_to_start = SidePair::default();
        self.ready_to_restart = SidePair::default();
        self.has_been_saved = false;
        self.swap_sides = !self.swap_sides;
    }

    /// Append the finished draft to the round log.
    ///
    /// # Errors
    ///
    /// Refuses incomplete drafts and a second save of the same draft.
    pub fn save_round(
        &mut self,
        table: &PhaseTable,
        saved_at: i64,
    ) -> Result<&RoundRecord, SaveRoundError> {
        if !self.is_complete(table) {
            return Err(SaveRoundError::NotComplete);
        }
        if self.has_been_saved {
            return Err(SaveRoundError::AlreadySaved);
        }

        let sequence_number = u32::try_from(self.saved_rounds.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.saved_rounds.push(RoundRecord {
            sequence_number,
            left_name: self
                .left_name
                .clone()
                .unwrap_or_else(|| DEFAULT_LEFT_NAME.to_string()),
            right_name: self
                .right_name
                .clone()
                .unwrap_or_else(|| DEFAULT_RIGHT_NAME.to_string()),
            left_bans: self.left_bans.clone(),
            right_bans: self.right_bans.clone(),
            left_picks: self.left_picks.clone(),
            right_picks: self.right_picks.clone(),
            saved_at,
        });
        self.has_been_saved = true;

        self.saved_rounds
            .last()
            .ok_or(SaveRoundError::NotComplete)
    }
}

/// Persisted row for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub code: RoomCode,
    pub owner_side: Side,
    pub state: RoomState,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl RoomRecord {
    #[must_use]
    pub fn new(code: RoomCode, created_at: i64) -> Self {
        Self {
            code,
            owner_side: Side::Left,
            state: RoomState::new(),
            created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn completed_state(table: &PhaseTable) -> RoomState {
        let mut state = RoomState::new();
        state.phase_index = table.len();
        state.left_bans = vec![EntityId(1), EntityId(2)];
        state.right_picks = vec![EntityId(3)];
        state
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = RoomState::new();
        assert_eq!(state.phase_index, 0);
        assert_eq!(state.step_in_phase, 0);
        assert_eq!(state.selection_count(), 0);
        assert!(!state.swap_sides);
        assert!(!state.ready_to_start.left && !state.ready_to_start.right);
        assert!(!state.is_complete(&PhaseTable::standard()));
    }

    #[test]
    fn test_available_excludes_taken_entities() {
        let roster = vec![
            RosterEntry::new(1, "a"),
            RosterEntry::new(2, "b"),
            RosterEntry::new(3, "c"),
        ];
        let mut state = RoomState::new();
        state.right_bans.push(EntityId(2));
        assert_eq!(state.available(&roster), vec![EntityId(1), EntityId(3)]);
    }

    #[test]
    fn test_set_name_trims_and_clears() {
        let mut state = RoomState::new();
        state.set_name(Side::Left, "  Falcons ");
        assert_eq!(state.name(Side::Left), Some("Falcons"));

        state.set_name(Side::Left, "   ");
        assert_eq!(state.name(Side::Left), None);

        state.set_name(Side::Right, &"x".repeat(50));
        assert_eq!(state.name(Side::Right).unwrap().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_reset_for_restart() {
        let table = PhaseTable::standard();
        let mut state = completed_state(&table);
        state.left_name = Some("Falcons".to_string());
        state.ready_to_start = SidePair::new(true, true);
        state.ready_to_restart = SidePair::new(true, true);
        state.save_round(&table, 1_000).unwrap();

        state.reset_for_restart();

        assert_eq!(state.phase_index, 0);
        assert_eq!(state.step_in_phase, 0);
        assert_eq!(state.selection_count(), 0);
        assert!(state.swap_sides);
        assert!(!state.has_been_saved);
        assert_eq!(state.ready_to_start, SidePair::default());
        assert_eq!(state.ready_to_restart, SidePair::default());
        assert_eq!(state.left_name.as_deref(), Some("Falcons"));
        assert_eq!(state.saved_rounds.len(), 1);

        state.reset_for_restart();
        assert!(!state.swap_sides);
    }

    #[test]
    fn test_save_round_once_per_draft() {
        let table = PhaseTable::standard();
        let mut state = completed_state(&table);
        state.right_name = Some("Owls".to_string());

        let record = state.save_round(&table, 42).unwrap().clone();
        assert_eq!(record.sequence_number, 1);
        assert_eq!(record.left_name, DEFAULT_LEFT_NAME);
        assert_eq!(record.right_name, "Owls");
        assert_eq!(record.left_bans, vec![EntityId(1), EntityId(2)]);
        assert_eq!(record.saved_at, 42);
        assert!(state.has_been_saved);

        assert_eq!(
            state.save_round(&table, 43).unwrap_err(),
            SaveRoundError::AlreadySaved
        );
    }

    #[test]
    fn test_save_round_requires_complete_draft() {
        let table = PhaseTable::standard();
        let mut state = RoomState::new();
        assert_eq!(
            state.save_round(&table, 1).unwrap_err(),
            SaveRoundError::NotComplete
        );
        assert!(state.saved_rounds.is_empty());
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let state = RoomState::new();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phaseIndex"], 0);
        assert_eq!(json["stepInPhase"], 0);
        assert_eq!(json["readyToStart"]["left"], false);
        assert_eq!(json["hasBeenSaved"], false);
        assert!(json["leftBans"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let state: RoomState = serde_json::from_str(r#"{"phaseIndex": 3, "leftBans": [7]}"#).unwrap();
        assert_eq!(state.phase_index, 3);
        assert_eq!(state.left_bans, vec![EntityId(7)]);
        assert!(!state.swap_sides);
    }
}
