//! # Timer Queue
//!
//! Every schedulable job of the appliance is a named timer in one queue.
//! A timer is either armed (with a deadline), suspended (deadline parked)
//! or absent.
//!
//! - `arm` replaces an existing deadline, so a timer never runs twice
//! - `cancel`, `suspend` and `resume` are no-ops when there is nothing to act on
//! - due timers are popped one at a time, earliest first, so a handler
//!   that cancels another due timer prevents it from firing

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    Reconnect,
    ReplenishTick,
    GenerationStep,
    RoundDeadline,
    PacketStreamTick,
    PacketIdleTimeout,
    StatusBlink,
    UpdateCheck,
}

impl TimerId {
    /// Timers that only run while the coordinator link is up.
    pub const LINK_BOUND: [TimerId; 3] = [
        TimerId::ReplenishTick,
        TimerId::GenerationStep,
        TimerId::RoundDeadline,
    ];
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerId::Reconnect => "reconnect",
            TimerId::ReplenishTick => "replenish-tick",
            TimerId::GenerationStep => "generation-step",
            TimerId::RoundDeadline => "round-deadline",
            TimerId::PacketStreamTick => "packet-stream-tick",
            TimerId::PacketIdleTimeout => "packet-idle-timeout",
            TimerId::StatusBlink => "status-blink",
            TimerId::UpdateCheck => "update-check",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    armed: HashMap<TimerId, Instant>,
    suspended: HashMap<TimerId, Instant>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `id` after `delay`, replacing any armed or suspended deadline.
    pub fn arm(&mut self, id: TimerId, delay: Duration) {
        self.arm_at(id, Instant::now() + delay);
    }

    pub fn arm_at(&mut self, id: TimerId, deadline: Instant) {
        self.suspended.remove(&id);
        self.armed.insert(id, deadline);
    }

    /// Returns whether the timer was armed or suspended.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let armed = self.armed.remove(&id).is_some();
        let suspended = self.suspended.remove(&id).is_some();
        armed || suspended
    }

    /// Park an armed timer, keeping its deadline.
    pub fn suspend(&mut self, id: TimerId) -> bool {
        match self.armed.remove(&id) {
            Some(deadline) => {
                self.suspended.insert(id, deadline);
                true
            }
            None => false,
        }
    }

    /// Re-arm a suspended timer at its original deadline. A deadline that
    /// passed meanwhile fires on the next turn.
    pub fn resume(&mut self, id: TimerId) -> bool {
        match self.suspended.remove(&id) {
            Some(deadline) => {
                self.armed.insert(id, deadline);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn is_suspended(&self, id: TimerId) -> bool {
        self.suspended.contains_key(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.armed.get(&id).copied()
    }

    /// Armed timers, earliest first.
    pub fn armed(&self) -> Vec<TimerId> {
        let mut armed: Vec<(Instant, TimerId)> =
            self.armed.iter().map(|(id, at)| (*at, *id)).collect();
        armed.sort();
        armed.into_iter().map(|(_, id)| id).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().min().copied()
    }

    /// Disarm and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerId> {
        let (id, _) = self
            .armed
            .iter()
            .filter(|(_, at)| **at <= now)
            .min_by_key(|(id, at)| (**at, **id))
            .map(|(id, at)| (*id, *at))?;
        self.armed.remove(&id);
        Some(id)
    }

    /// Resolve once the earliest armed timer is due. Never resolves when
    /// nothing is armed.
    pub async fn wait(&self) {
        match self.next_deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
