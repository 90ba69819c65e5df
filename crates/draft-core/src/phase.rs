//! The fixed turn table.
//!
//! A draft walks the table front to back. Each entry names the side that
//! acts (before any swap mapping), the kind of action, and how many times in
//! a row that side performs it. `phase_index == len()` means the draft is
//! complete.

use crate::types::{ActionKind, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the turn table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPhase {
    pub ordinal: usize,
    pub side: Side,
    pub action: ActionKind,
    pub repetitions: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseTableError {
    #[error("phase {0} has zero repetitions")]
    ZeroRepetitions(usize),
}

/// Ordered sequence of draft phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    phases: Vec<DraftPhase>,
}

const STANDARD: [(Side, ActionKind, u32); 10] = [
    (Side::Left, ActionKind::Ban, 2),
    (Side::Right, ActionKind::Ban, 2),
    (Side::Left, ActionKind::Pick, 1),
    (Side::Right, ActionKind::Pick, 2),
    (Side::Left, ActionKind::Pick, 1),
    (Side::Left, ActionKind::Ban, 2),
    (Side::Right, ActionKind::Ban, 2),
    (Side::Right, ActionKind::Pick, 1),
    (Side::Left, ActionKind::Pick, 2),
    (Side::Right, ActionKind::Pick, 1),
];

impl PhaseTable {
    /// Build a table from `(side, action, repetitions)` entries.
    ///
    /// Ordinals and labels (`ban_2`, `pick_1`, ...) are derived from position
    /// and contents.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseTableError::ZeroRepetitions`] if an entry could never be
    /// completed.
    pub fn new(
        entries: impl IntoIterator<Item = (Side, ActionKind, u32)>,
    ) -> Result<Self, PhaseTableError> {
        let mut phases = Vec::new();
        for (ordinal, (side, action, repetitions)) in entries.into_iter().enumerate() {
            if repetitions == 0 {
                return Err(PhaseTableError::ZeroRepetitions(ordinal));
            }
            phases.push(DraftPhase {
                ordinal,
                side,
                action,
                repetitions,
                label: format!("{}_{repetitions}", action.as_str()),
            });
        }
        Ok(Self { phases })
    }

    /// The ten-phase ban/pick table every room uses.
    #[must_use]
    pub fn standard() -> Self {
        let phases = STANDARD
            .iter()
            .enumerate()
            .map(|(ordinal, &(side, action, repetitions))| DraftPhase {
                ordinal,
                side,
                action,
                repetitions,
                label: format!("{}_{repetitions}", action.as_str()),
            })
            .collect();
        Self { phases }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DraftPhase> {
        self.phases.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraftPhase> {
        self.phases.iter()
    }

    /// Total number of actions taken once every phase before `index` is done.
    #[must_use]
    pub fn total_actions_before(&self, index: usize) -> usize {
        self.phases
            .iter()
            .take(index)
            .map(|p| p.repetitions as usize)
            .sum()
    }

    /// Total number of actions in a complete draft.
    #[must_use]
    pub fn total_actions(&self) -> usize {
        self.total_actions_before(self.phases.len())
    }

    /// Side that actually acts in phase `index` under the given swap mapping.
    #[must_use]
    pub fn effective_side(&self, index: usize, swap_sides: bool) -> Option<Side> {
        self.get(index).map(|phase| {
            if swap_sides {
                phase.side.opposite()
            } else {
                phase.side
            }
        })
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self::standard()
    }
}
