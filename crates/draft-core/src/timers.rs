//! Endpoint-local countdowns.
//!
//! Both timers tick once per second from the endpoint's own loop. They never
//! touch authoritative state; they only report when something should be sent.

use crate::engine::TurnStamp;
use crate::phase::PhaseTable;
use crate::state::RoomState;
use crate::types::SidePair;

pub const START_COUNTDOWN_TICKS: u32 = 10;
pub const ACTION_TIMER_TICKS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Running(u32),
    Expired,
}

/// One-second resolution countdown.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: Option<u32>,
}

impl Countdown {
    pub fn arm(&mut self, ticks: u32) {
        self.remaining = Some(ticks);
    }

    pub fn disarm(&mut self) {
        self.remaining = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Advance one second. Disarms on expiry.
    pub fn tick(&mut self) -> TickOutcome {
        match self.remaining {
            None => TickOutcome::Idle,
            Some(n) if n <= 1 => {
                self.remaining = None;
                TickOutcome::Expired
            }
            Some(n) => {
                self.remaining = Some(n - 1);
                TickOutcome::Running(n - 1)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTick {
    Idle,
    Running(u32),
    Started,
}

/// Countdown from "both ready" to "draft started".
#[derive(Debug, Clone, Default)]
pub struct StartCountdown {
    countdown: Countdown,
}

impl StartCountdown {
    /// React to a readiness broadcast.
    ///
    /// Arms when both sides are ready and nothing is running yet. A status
    /// with either flag false cancels a running countdown. Returns whether
    /// the countdown is armed afterwards.
    pub fn observe_readiness(&mut self, ready: SidePair<bool>, started: bool) -> bool {
        if started {
            self.countdown.disarm();
        } else if ready.both() {
            if !self.countdown.is_armed() {
                self.countdown.arm(START_COUNTDOWN_TICKS);
            }
        } else {
            self.countdown.disarm();
        }
        self.countdown.is_armed()
    }

    pub fn cancel(&mut self) {
        self.countdown.disarm();
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    pub fn tick(&mut self) -> StartTick {
        match self.countdown.tick() {
            TickOutcome::Idle => StartTick::Idle,
            TickOutcome::Running(n) => StartTick::Running(n),
            TickOutcome::Expired => StartTick::Started,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTick {
    Idle,
    Running(u32),
    /// The turn at this position ran out of time.
    Expired(TurnStamp),
}

/// Per-turn countdown.
#[derive(Debug, Clone, Default)]
pub struct ActionTimer {
    countdown: Countdown,
    armed_for: Option<TurnStamp>,
}

impl ActionTimer {
    /// Re-evaluate against a new snapshot.
    ///
    /// Re-arms on a position change while started, disarms when the draft is
    /// not running or is complete. Returns true when the timer was re-armed.
    pub fn observe(&mut self, state: &RoomState, table: &PhaseTable, started: bool) -> bool {
        if !started || state.is_complete(table) {
            self.disarm();
            return false;
        }
        let stamp = TurnStamp::of(state);
        if self.armed_for == Some(stamp) {
            return false;
        }
        self.armed_for = Some(stamp);
        self.countdown.arm(ACTION_TIMER_TICKS);
        true
    }

    pub fn disarm(&mut self) {
        self.countdown.disarm();
        self.armed_for = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.countdown.is_armed()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// Advance one second. After expiry the timer stays quiet until the
    /// position changes.
    pub fn tick(&mut self) -> ActionTick {
        match self.countdown.tick() {
            TickOutcome::Idle => ActionTick::Idle,
            TickOutcome::Running(n) => ActionTick::Running(n),
            TickOutcome::Expired => match self.armed_for {
                Some(stamp) => ActionTick::Expired(stamp),
                None => ActionTick::Idle,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;

    #[test]
    fn test_countdown_runs_to_expiry() {
        let mut countdown = Countdown::default();
        assert_eq!(countdown.tick(), TickOutcome::Idle);

        countdown.arm(3);
        assert_eq!(countdown.tick(), TickOutcome::Running(2));
        assert_eq!(countdown.tick(), TickOutcome::Running(1));
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        assert!(!countdown.is_armed());
        assert_eq!(countdown.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_start_countdown_arms_when_both_ready() {
        let mut start = StartCountdown::default();
        assert!(!start.observe_readiness(SidePair::new(true, false), false));
        assert!(start.observe_readiness(SidePair::new(true, true), false));
        assert_eq!(start.remaining(), Some(START_COUNTDOWN_TICKS));

        // A repeated status does not restart the countdown.
        start.tick();
        assert!(start.observe_readiness(SidePair::new(true, true), false));
        assert_eq!(start.remaining(), Some(START_COUNTDOWN_TICKS - 1));

        for _ in 0..START_COUNTDOWN_TICKS - 2 {
            assert!(matches!(start.tick(), StartTick::Running(_)));
        }
        assert_eq!(start.tick(), StartTick::Started);
    }

    #[test]
    fn test_start_countdown_cancelled_on_revoked_readiness() {
        let mut start = StartCountdown::default();
        start.observe_readiness(SidePair::new(true, true), false);
        start.tick();

        assert!(!start.observe_readiness(SidePair::new(false, true), false));
        assert_eq!(start.tick(), StartTick::Idle);
    }

    #[test]
    fn test_start_countdown_ignored_once_started() {
        let mut start = StartCountdown::default();
        assert!(!start.observe_readiness(SidePair::new(true, true), true));
    }

    #[test]
    fn test_action_timer_rearms_on_position_change() {
        let table = PhaseTable::standard();
        let mut timer = ActionTimer::default();
        let mut state = RoomState::new();

        assert!(!timer.observe(&state, &table, false));
        assert!(timer.observe(&state, &table, true));
        timer.tick();
        assert!(!timer.observe(&state, &table, true));
        assert_eq!(timer.remaining(), Some(ACTION_TIMER_TICKS - 1));

        state.left_bans.push(EntityId(1));
        state.step_in_phase = 1;
        assert!(timer.observe(&state, &table, true));
        assert_eq!(timer.remaining(), Some(ACTION_TIMER_TICKS));
    }

    #[test]
    fn test_action_timer_expiry_reports_stamp_once() {
        let table = PhaseTable::standard();
        let mut timer = ActionTimer::default();
        let state = RoomState::new();
        timer.observe(&state, &table, true);

        for _ in 0..ACTION_TIMER_TICKS - 1 {
            assert!(matches!(timer.tick(), ActionTick::Running(_)));
        }
        assert_eq!(timer.tick(), ActionTick::Expired(TurnStamp::of(&state)));
        assert_eq!(timer.tick(), ActionTick::Idle);

        // Same position does not re-arm after expiry.
        assert!(!timer.observe(&state, &table, true));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_action_timer_disarms_on_completion() {
        let table = PhaseTable::standard();
        let mut timer = ActionTimer::default();
        let mut state = RoomState::new();
        timer.observe(&state, &table, true);

        state.phase_index = table.len();
        assert!(!timer.observe(&state, &table, true));
        assert!(!timer.is_armed());
    }
}
