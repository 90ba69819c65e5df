//! Endpoint-side reconciliation of authoritative snapshots.
//!
//! An endpoint cannot tell whether a snapshot reflects its own action, the
//! opponent's, or a timeout. The only reliable signal is what was added since
//! the last snapshot it saw, so that is all this module computes. It never
//! submits anything back.

use crate::state::RoomState;
use crate::types::{ActionKind, EntityId, Side};
use std::time::Duration;

/// Gap between successive cues from a single snapshot.
pub const CUE_STAGGER: Duration = Duration::from_millis(80);

/// Swap transition timings, measured from the snapshot that triggered it.
pub const SWAP_FLIP_DELAY: Duration = Duration::from_millis(300);
pub const SWAP_SETTLE_DELAY: Duration = Duration::from_millis(600);

/// Fixed evaluation order for additions.
const DIFF_ORDER: [(Side, ActionKind); 4] = [
    (Side::Left, ActionKind::Ban),
    (Side::Right, ActionKind::Ban),
    (Side::Left, ActionKind::Pick),
    (Side::Right, ActionKind::Pick),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedAction {
    pub side: Side,
    pub kind: ActionKind,
    pub entity: EntityId,
}

/// Elements present in `current` but not in `previous`.
///
/// Sets are visited left bans, right bans, left picks, right picks. Within a
/// set the order follows `current`.
#[must_use]
pub fn diff_additions(previous: &RoomState, current: &RoomState) -> Vec<ObservedAction> {
    DIFF_ORDER
        .iter()
        .flat_map(|&(side, kind)| {
            let before = previous.selections(side, kind);
            current
                .selections(side, kind)
                .iter()
                .filter(move |entity| !before.contains(entity))
                .map(move |&entity| ObservedAction { side, kind, entity })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub action: ObservedAction,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    Shrink,
    /// Store the new flag and re-render.
    Flip(bool),
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSchedule {
    pub target: bool,
}

impl SwapSchedule {
    /// Stages with their delay from the triggering snapshot.
    #[must_use]
    pub fn stages(&self) -> [(Duration, SwapStage); 3] {
        [
            (Duration::ZERO, SwapStage::Shrink),
            (SWAP_FLIP_DELAY, SwapStage::Flip(self.target)),
            (SWAP_SETTLE_DELAY, SwapStage::Settled),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub cues: Vec<Cue>,
    pub recent_action: Option<ObservedAction>,
    pub swap: Option<SwapSchedule>,
}

/// What the endpoint last showed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientViewState {
    pub cached: RoomState,
    pub displayed_swap: bool,
    pub pending_swap: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    view: ClientViewState,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn view(&self) -> &ClientViewState {
        &self.view
    }

    #[must_use]
    pub fn displayed_swap(&self) -> bool {
        self.view.displayed_swap
    }

    /// Adopt a snapshot silently, as on first join.
    pub fn prime(&mut self, snapshot: &RoomState) {
        self.view = ClientViewState {
            cached: snapshot.clone(),
            displayed_swap: snapshot.swap_sides,
            pending_swap: None,
        };
    }

    pub fn reconcile(&mut self, snapshot: &RoomState) -> ReconcileOutcome {
        let additions = diff_additions(&self.view.cached, snapshot);

        let mut delay = Duration::ZERO;
        let cues = additions
            .iter()
            .map(|&action| {
                let cue = Cue { action, delay };
                delay += CUE_STAGGER;
                cue
            })
            .collect();

        let target = snapshot.swap_sides;
        let swap = if target != self.view.displayed_swap && self.view.pending_swap != Some(target) {
            self.view.pending_swap = Some(target);
            Some(SwapSchedule { target })
        } else {
            None
        };

        self.view.cached = snapshot.clone();

        ReconcileOutcome {
            cues,
            recent_action: additions.last().copied(),
            swap,
        }
    }

    /// Called at the flip stage of a swap transition.
    pub fn complete_swap_flip(&mut self, value: bool) {
        self.view.displayed_swap = value;
        if self.view.pending_swap == Some(value) {
            self.view.pending_swap = None;
        }
    }

    /// Forget cached selections after a restart. The displayed swap flag is
    /// kept so the following snapshot still animates the side change.
    pub fn reset(&mut self) {
        self.view.cached = RoomState::new();
        self.view.pending_swap = None;
    }
}
