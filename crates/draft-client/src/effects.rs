//! Presentation hooks.
//!
//! The endpoint driver never renders or plays anything itself. Everything a
//! front end would show is reported through an [`EffectSink`].

use draft_core::reconciler::{ObservedAction, SwapStage};
use draft_core::ActionKind;
use std::sync::{Arc, Mutex};
use tracing::info;

pub trait EffectSink: Send {
    /// A staggered cue for one newly observed selection.
    fn action_observed(&self, action: &ObservedAction);

    /// The most recent selection in a snapshot, reported without delay.
    ///
    /// Unlike cues, `action.side` is the side the selection is shown on:
    /// the acting side mapped through the snapshot's `swap_sides`.
    fn recent_action(&self, action: &ObservedAction);

    /// The phase index moved. `action` is what the new phase does, or
    /// `None` once the draft is complete.
    fn phase_changed(&self, previous: usize, next: usize, action: Option<ActionKind>);

    /// The start countdown ran out.
    fn draft_started(&self);

    fn swap_stage(&self, stage: SwapStage);

    /// Seconds left before the draft starts.
    fn countdown(&self, remaining: u32);

    /// Seconds left in the current turn.
    fn action_timer(&self, remaining: u32);
}

/// Logs every effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEffectSink;

impl EffectSink for TracingEffectSink {
    fn action_observed(&self, action: &ObservedAction) {
        info!(
            target: "draft.client.effects",
            side = %action.side,
            kind = action.kind.as_str(),
            entity = %action.entity,
            "Action observed"
        );
    }

    fn recent_action(&self, action: &ObservedAction) {
        info!(
            target: "draft.client.effects",
            side = %action.side,
            kind = action.kind.as_str(),
            entity = %action.entity,
            "Recent action"
        );
    }

    fn phase_changed(&self, previous: usize, next: usize, action: Option<ActionKind>) {
        info!(
            target: "draft.client.effects",
            previous,
            next,
            action = action.map_or("complete", ActionKind::as_str),
            "Phase changed"
        );
    }

    fn draft_started(&self) {
        info!(target: "draft.client.effects", "Draft started");
    }

    fn swap_stage(&self, stage: SwapStage) {
        info!(target: "draft.client.effects", stage = ?stage, "Swap stage");
    }

    fn countdown(&self, remaining: u32) {
        info!(target: "draft.client.effects", remaining, "Start countdown");
    }

    fn action_timer(&self, remaining: u32) {
        if remaining % 10 == 0 || remaining <= 5 {
            info!(target: "draft.client.effects", remaining, "Action timer");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ActionObserved(ObservedAction),
    RecentAction(ObservedAction),
    PhaseChanged {
        previous: usize,
        next: usize,
        action: Option<ActionKind>,
    },
    DraftStarted,
    SwapStage(SwapStage),
    Countdown(u32),
    ActionTimer(u32),
}

/// Records effects in order, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingEffectSink {
    effects: Arc<Mutex<Vec<Effect>>>,
}

impl RecordingEffectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        self.effects
            .lock()
            .map(|effects| effects.clone())
            .unwrap_or_default()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.clear();
        }
    }

    fn record(&self, effect: Effect) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.push(effect);
        }
    }
}

impl EffectSink for RecordingEffectSink {
    fn action_observed(&self, action: &ObservedAction) {
        self.record(Effect::ActionObserved(*action));
    }

    fn recent_action(&self, action: &ObservedAction) {
        self.record(Effect::RecentAction(*action));
    }

    fn phase_changed(&self, previous: usize, next: usize, action: Option<ActionKind>) {
        self.record(Effect::PhaseChanged {
            previous,
            next,
            action,
        });
    }

    fn draft_started(&self) {
        self.record(Effect::DraftStarted);
    }

    fn swap_stage(&self, stage: SwapStage) {
        self.record(Effect::SwapStage(stage));
    }

    fn countdown(&self, remaining: u32) {
        self.record(Effect::Countdown(remaining));
    }

    fn action_timer(&self, remaining: u32) {
        self.record(Effect::ActionTimer(remaining));
    }
}
