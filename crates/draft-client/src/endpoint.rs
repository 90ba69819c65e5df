//! `DraftEndpoint` - one participant's or observer's view of a room.
//!
//! A single task owns the reconciler and both timers, so nothing here needs
//! a lock. The loop selects over:
//!
//! - inbound [`ServerEvent`]s from the transport
//! - a one-second tick driving the start countdown and the action timer
//! - a `DelayQueue` of staggered cues and swap stages
//! - cancellation
//!
//! The endpoint never edits the room locally. Human input and timer expiry
//! both become [`ClientCommand`]s, and the resulting snapshot comes back
//! through the server like anyone else's.

use crate::effects::EffectSink;
use crate::errors::ClientError;

use common::types::RoomCode;
use draft_core::protocol::{ClientCommand, ServerEvent};
use draft_core::reconciler::{ObservedAction, Reconciler, SwapStage};
use draft_core::roster::RosterEntry;
use draft_core::timers::{
    ActionTick, ActionTimer, StartCountdown, StartTick, ACTION_TIMER_TICKS, START_COUNTDOWN_TICKS,
};
use draft_core::{
    ActionKind, AutoResolution, DraftEngine, EntityId, RoomState, Seat, Side, SidePair, TurnStamp,
};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, info, instrument, warn};

/// Timer resolution.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub room_code: RoomCode,
    pub seat: Seat,
    /// Send `ready-to-start` after joining and after every restart.
    pub auto_ready: bool,
}

#[derive(Debug, Clone, Copy)]
enum Scheduled {
    Cue(ObservedAction),
    Swap(SwapStage),
}

pub struct DraftEndpoint<E> {
    settings: EndpointSettings,
    roster: Vec<RosterEntry>,
    engine: DraftEngine,
    reconciler: Reconciler,
    start_countdown: StartCountdown,
    action_timer: ActionTimer,
    /// Local notion of "draft running"; set when the start countdown expires.
    started: bool,
    state: Option<RoomState>,
    readiness: SidePair<bool>,
    presence: SidePair<bool>,
    effects: E,
    commands: mpsc::Sender<ClientCommand>,
    scheduled: DelayQueue<Scheduled>,
    rng: StdRng,
}

impl<E: EffectSink> DraftEndpoint<E> {
    /// `roster` should come from [`crate::roster::load_roster`], which never
    /// yields an empty list.
    pub fn new(
        settings: EndpointSettings,
        roster: Vec<RosterEntry>,
        commands: mpsc::Sender<ClientCommand>,
        effects: E,
    ) -> Self {
        Self {
            settings,
            roster,
            engine: DraftEngine::default(),
            reconciler: Reconciler::new(),
            start_countdown: StartCountdown::default(),
            action_timer: ActionTimer::default(),
            started: false,
            state: None,
            readiness: SidePair::default(),
            presence: SidePair::default(),
            effects,
            commands,
            scheduled: DelayQueue::new(),
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<&RoomState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn readiness(&self) -> SidePair<bool> {
        self.readiness
    }

    #[must_use]
    pub fn presence(&self) -> SidePair<bool> {
        self.presence
    }

    /// Swap flag as currently shown, which lags the snapshot during a swap.
    #[must_use]
    pub fn displayed_swap(&self) -> bool {
        self.reconciler.displayed_swap()
    }

    /// Ban or pick for this endpoint's side at whatever the current turn is.
    ///
    /// # Errors
    ///
    /// `Config` for observers, `Closed` when the transport is gone.
    pub async fn submit_action(&self, kind: ActionKind, entity: EntityId) -> Result<(), ClientError> {
        let side = self.own_side()?;
        self.send(ClientCommand::Action {
            room_code: self.settings.room_code.clone(),
            side,
            kind,
            entity_id: entity,
            turn: None,
        })
        .await
    }

    pub async fn ready_to_start(&self, ready: bool) -> Result<(), ClientError> {
        let side = self.own_side()?;
        self.send(ClientCommand::ReadyToStart {
            room_code: self.settings.room_code.clone(),
            side,
            ready,
        })
        .await
    }

    pub async fn ready_to_restart(&self) -> Result<(), ClientError> {
        let side = self.own_side()?;
        self.send(ClientCommand::ReadyToRestart {
            room_code: self.settings.room_code.clone(),
            side,
        })
        .await
    }

    pub async fn save_round(&self) -> Result<(), ClientError> {
        self.send(ClientCommand::SaveRound {
            room_code: self.settings.room_code.clone(),
        })
        .await
    }

    pub async fn set_name(&self, name: impl Into<String>) -> Result<(), ClientError> {
        let side = self.own_side()?;
        self.send(ClientCommand::SetName {
            room_code: self.settings.room_code.clone(),
            side,
            name: name.into(),
        })
        .await
    }

    /// Drive the endpoint until cancelled or the transport closes.
    ///
    /// # Errors
    ///
    /// `Closed` when the event stream ends or a command cannot be sent.
    #[instrument(
        skip_all,
        name = "draft.client.endpoint",
        fields(room_code = %self.settings.room_code, seat = %self.settings.seat)
    )]
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ServerEvent>,
        cancel_token: CancellationToken,
    ) -> Result<(), ClientError> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!(target: "draft.client.endpoint", "Endpoint cancelled");
                    return Ok(());
                }

                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        info!(target: "draft.client.endpoint", "Event stream ended");
                        return Err(ClientError::Closed);
                    }
                },

                Some(expired) = self.scheduled.next() => {
                    self.fire(expired.into_inner());
                }

                _ = ticker.tick() => {
                    self.on_tick().await?;
                }
            }
        }
    }

    async fn handle_event(&mut self, event: ServerEvent) -> Result<(), ClientError> {
        match event {
            ServerEvent::Joined {
                side,
                room_state,
                presence,
            } => {
                if self.state.is_none() {
                    self.prime(room_state, presence);
                    if self.settings.auto_ready {
                        self.auto_ready().await?;
                    }
                } else if let Some(side) = side.side() {
                    self.presence.set(side, true);
                }
            }
            ServerEvent::Left { side } => {
                if let Some(side) = side.side() {
                    self.presence.set(side, false);
                }
            }
            ServerEvent::StateUpdated { room_state } => {
                if self.state.is_none() {
                    self.prime(room_state, self.presence);
                } else {
                    self.apply_snapshot(room_state);
                }
            }
            ServerEvent::ReadyToStartStatus {
                ready_left,
                ready_right,
            } => {
                self.readiness = SidePair::new(ready_left, ready_right);
                let was_armed = self.start_countdown.remaining().is_some();
                let armed = self
                    .start_countdown
                    .observe_readiness(self.readiness, self.started);
                if armed && !was_armed {
                    self.effects.countdown(START_COUNTDOWN_TICKS);
                }
            }
            ServerEvent::RestartReadyStatus {
                ready_left,
                ready_right,
            } => {
                debug!(
                    target: "draft.client.endpoint",
                    ready_left,
                    ready_right,
                    "Restart readiness"
                );
            }
            ServerEvent::RestartApproved {} => {
                info!(target: "draft.client.endpoint", "Restart approved");
                self.started = false;
                self.start_countdown.cancel();
                self.action_timer.disarm();
                self.reconciler.reset();
                self.readiness = SidePair::default();
                if self.settings.auto_ready {
                    self.auto_ready().await?;
                }
            }
            ServerEvent::Error {
                code,
                message,
                retryable,
            } => {
                warn!(
                    target: "draft.client.endpoint",
                    code = %code,
                    message = %message,
                    retryable,
                    "Server reported an error"
                );
            }
        }
        Ok(())
    }

    /// Adopt the join snapshot without cues. A draft already under way
    /// counts as started so the action timer runs for late joiners.
    fn prime(&mut self, state: RoomState, presence: SidePair<bool>) {
        self.reconciler.prime(&state);
        self.presence = presence;
        self.readiness = state.ready_to_start;
        self.started = state.phase_index > 0 || state.step_in_phase > 0;
        if self
            .action_timer
            .observe(&state, self.engine.table(), self.started)
        {
            self.effects.action_timer(ACTION_TIMER_TICKS);
        }
        self.state = Some(state);
    }

    fn apply_snapshot(&mut self, state: RoomState) {
        let outcome = self.reconciler.reconcile(&state);

        for cue in &outcome.cues {
            self.scheduled.insert(Scheduled::Cue(cue.action), cue.delay);
        }
        if let Some(action) = outcome.recent_action {
            // Reported on the side it is drawn on, not the side that acted.
            let shown = if state.swap_sides {
                ObservedAction {
                    side: action.side.opposite(),
                    ..action
                }
            } else {
                action
            };
            self.effects.recent_action(&shown);
        }
        if let Some(swap) = outcome.swap {
            for (delay, stage) in swap.stages() {
                self.scheduled.insert(Scheduled::Swap(stage), delay);
            }
        }

        if self
            .action_timer
            .observe(&state, self.engine.table(), self.started)
        {
            self.effects.action_timer(ACTION_TIMER_TICKS);
        }
        if let Some(previous) = self.state.as_ref().map(|prev| prev.phase_index) {
            if previous != state.phase_index {
                let action = self.engine.table().get(state.phase_index).map(|p| p.action);
                self.effects.phase_changed(previous, state.phase_index, action);
            }
        }
        self.state = Some(state);
    }

    fn fire(&mut self, item: Scheduled) {
        match item {
            Scheduled::Cue(action) => self.effects.action_observed(&action),
            Scheduled::Swap(stage) => {
                if let SwapStage::Flip(value) = stage {
                    self.reconciler.complete_swap_flip(value);
                }
                self.effects.swap_stage(stage);
            }
        }
    }

    async fn on_tick(&mut self) -> Result<(), ClientError> {
        let mut just_armed = false;
        match self.start_countdown.tick() {
            StartTick::Idle => {}
            StartTick::Running(remaining) => self.effects.countdown(remaining),
            StartTick::Started => {
                info!(target: "draft.client.endpoint", "Draft started");
                self.started = true;
                self.effects.countdown(0);
                self.effects.draft_started();
                if let Some(state) = self.state.as_ref() {
                    just_armed = self.action_timer.observe(state, self.engine.table(), true);
                }
                if just_armed {
                    self.effects.action_timer(ACTION_TIMER_TICKS);
                }
            }
        }

        if just_armed {
            return Ok(());
        }

        match self.action_timer.tick() {
            ActionTick::Idle => Ok(()),
            ActionTick::Running(remaining) => {
                self.effects.action_timer(remaining);
                Ok(())
            }
            ActionTick::Expired(stamp) => self.resolve_timeout(stamp).await,
        }
    }

    /// Both participants fire on expiry; the turn stamp makes the second
    /// submission a no-op on the server.
    async fn resolve_timeout(&mut self, stamp: TurnStamp) -> Result<(), ClientError> {
        if self.settings.seat.side().is_none() {
            return Ok(());
        }
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        if TurnStamp::of(state) != stamp {
            return Ok(());
        }

        let command = match self.engine.auto_resolve(
            &self.settings.room_code,
            state,
            &self.roster,
            &mut self.rng,
        ) {
            AutoResolution::Selected(request) => {
                info!(
                    target: "draft.client.endpoint",
                    side = %request.acting_side,
                    kind = request.kind.as_str(),
                    entity = %request.entity_id,
                    "Turn timed out, auto-selecting"
                );
                ClientCommand::from(request)
            }
            AutoResolution::Exhausted(turn) => {
                let Some(side) = self.engine.effective_side(state) else {
                    return Ok(());
                };
                info!(
                    target: "draft.client.endpoint",
                    side = %side,
                    "Turn timed out with nothing left to select, skipping"
                );
                ClientCommand::SkipTurn {
                    room_code: self.settings.room_code.clone(),
                    side,
                    turn,
                }
            }
            AutoResolution::Complete => return Ok(()),
        };

        self.send(command).await
    }

    async fn auto_ready(&self) -> Result<(), ClientError> {
        if self.settings.seat.side().is_some() {
            self.ready_to_start(true).await?;
        }
        Ok(())
    }

    fn own_side(&self) -> Result<Side, ClientError> {
        self.settings
            .seat
            .side()
            .ok_or_else(|| ClientError::Config("observers cannot send commands".to_string()))
    }

    async fn send(&self, command: ClientCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Closed)
    }
}
