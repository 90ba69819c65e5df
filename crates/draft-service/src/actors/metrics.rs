//! Mailbox backlog monitoring and service-wide actor counters.
//!
//! Each actor samples its own channel backlog (`Receiver::len`) every time it
//! takes a message. Crossing a threshold is logged once per transition:
//!
//! | Actor      | Elevated above | Critical above |
//! |------------|----------------|----------------|
//! | Controller | 100            | 500            |
//! | Room       | 100            | 500            |
//! | Connection | 50             | 200            |
//!
//! A connection backlog means a slow socket; a room backlog means a hot room.
//! Live counts are mirrored into the `draft_rooms_active` and
//! `draft_connections_active` gauges.

use crate::observability::metrics as prom;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorType {
    /// `RoomControllerActor` (singleton registry).
    Controller,
    /// `RoomActor`, one per live room code.
    Room,
    /// `ConnectionActor`, one per websocket.
    Connection,
}

/// Backlog sizes at which an actor's mailbox changes level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklogThresholds {
    pub elevated: usize,
    pub critical: usize,
}

impl ActorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActorType::Controller => "controller",
            ActorType::Room => "room",
            ActorType::Connection => "connection",
        }
    }

    #[must_use]
    pub const fn thresholds(self) -> BacklogThresholds {
        match self {
            ActorType::Controller | ActorType::Room => BacklogThresholds {
                elevated: 100,
                critical: 500,
            },
            ActorType::Connection => BacklogThresholds {
                elevated: 50,
                critical: 200,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MailboxLevel {
    Normal,
    Elevated,
    Critical,
}

impl BacklogThresholds {
    #[must_use]
    pub const fn level(self, backlog: usize) -> MailboxLevel {
        if backlog > self.critical {
            MailboxLevel::Critical
        } else if backlog > self.elevated {
            MailboxLevel::Elevated
        } else {
            MailboxLevel::Normal
        }
    }
}

/// Owned by a single actor task, so no atomics.
#[derive(Debug)]
pub struct MailboxMonitor {
    actor_type: ActorType,
    /// Room code, connection id or service id, for log fields.
    actor_id: String,
    level: MailboxLevel,
    peak_backlog: usize,
    processed: u64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
            level: MailboxLevel::Normal,
            peak_backlog: 0,
            processed: 0,
        }
    }

    /// Record one received message and the backlog still queued behind it.
    pub fn observe(&mut self, backlog: usize) -> MailboxLevel {
        self.processed += 1;
        self.peak_backlog = self.peak_backlog.max(backlog);

        let level = self.actor_type.thresholds().level(backlog);
        if level != self.level {
            self.log_transition(level, backlog);
            self.level = level;
        }
        level
    }

    fn log_transition(&self, level: MailboxLevel, backlog: usize) {
        let actor_type = self.actor_type.as_str();
        match level {
            MailboxLevel::Critical => warn!(
                target: "draft.actor.mailbox",
                actor_type,
                actor_id = %self.actor_id,
                backlog,
                "Mailbox backlog critical"
            ),
            MailboxLevel::Elevated if self.level == MailboxLevel::Normal => debug!(
                target: "draft.actor.mailbox",
                actor_type,
                actor_id = %self.actor_id,
                backlog,
                "Mailbox backlog elevated"
            ),
            _ if self.level == MailboxLevel::Critical => info!(
                target: "draft.actor.mailbox",
                actor_type,
                actor_id = %self.actor_id,
                backlog,
                peak_backlog = self.peak_backlog,
                "Mailbox backlog recovered"
            ),
            _ => {}
        }
    }

    #[must_use]
    pub fn level(&self) -> MailboxLevel {
        self.level
    }

    #[must_use]
    pub fn peak_backlog(&self) -> usize {
        self.peak_backlog
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

/// Counters shared by every actor in one service instance.
#[derive(Debug, Default)]
pub struct ActorMetrics {
    rooms: AtomicUsize,
    connections: AtomicUsize,
    panics: AtomicU64,
}

impl ActorMetrics {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn room_created(&self) {
        prom::set_rooms_active(increment(&self.rooms));
    }

    pub fn room_removed(&self) {
        prom::set_rooms_active(decrement(&self.rooms));
    }

    pub fn connection_created(&self) {
        prom::set_connections_active(increment(&self.connections));
    }

    pub fn connection_closed(&self) {
        prom::set_connections_active(decrement(&self.connections));
    }

    /// A supervised task ended with a panic. Always a bug.
    pub fn record_panic(&self, actor_type: ActorType) {
        let total = self.panics.fetch_add(1, Ordering::Relaxed) + 1;
        prom::record_actor_panic(actor_type.as_str());
        error!(
            target: "draft.actor.panic",
            actor_type = actor_type.as_str(),
            total_panics = total,
            "Actor panic detected"
        );
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn panic_count(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }
}

fn increment(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

/// Saturating, so a double close cannot wrap the gauge.
fn decrement(counter: &AtomicUsize) -> usize {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
            Some(c.saturating_sub(1))
        })
        .unwrap_or(0)
        .saturating_sub(1)
}
