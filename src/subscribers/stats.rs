//! # Lifecycle counters.
//!
//! [`LifecycleStats`] counts task outcomes as they are published, so a host can show
//! or assert on scheduler activity without wiring callbacks into every task.
//!
//! ## Rules
//! - `live()` is `scheduled + restarted - terminal`; a task dropped at the ceiling
//!   was never scheduled and is counted under `dropped` only.
//! - A restart that re-registers an evicted task publishes `TaskRestarted` only, so
//!   it is counted once.
//! - Counters only grow; call [`LifecycleStats::reset`] between measurements.

use std::cell::Cell;

use crate::Subscribe;
use crate::events::{Event, EventKind};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Tasks registered into a collection (restarts excluded).
    pub scheduled: u64,
    /// Tasks whose delay elapsed.
    pub started: u64,
    /// Tasks that completed.
    pub completed: u64,
    /// Tasks that were killed.
    pub killed: u64,
    /// Tasks that exceeded their max duration.
    pub timed_out: u64,
    /// Calls to `restart()` that succeeded.
    pub restarted: u64,
    /// Tasks refused at the capacity ceiling.
    pub dropped: u64,
}

impl StatsSnapshot {
    /// Tasks scheduled (or restarted) that have not terminated yet.
    pub fn live(&self) -> u64 {
        (self.scheduled + self.restarted)
            .saturating_sub(self.completed + self.killed + self.timed_out)
    }
}

/// Subscriber that counts lifecycle events.
///
/// Share it with the scheduler as an `Rc` and keep a clone for reading.
#[derive(Debug, Default)]
pub struct LifecycleStats {
    scheduled: Cell<u64>,
    started: Cell<u64>,
    completed: Cell<u64>,
    killed: Cell<u64>,
    timed_out: Cell<u64>,
    restarted: Cell<u64>,
    dropped: Cell<u64>,
}

impl LifecycleStats {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            scheduled: self.scheduled.get(),
            started: self.started.get(),
            completed: self.completed.get(),
            killed: self.killed.get(),
            timed_out: self.timed_out.get(),
            restarted: self.restarted.get(),
            dropped: self.dropped.get(),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for c in [
            &self.scheduled,
            &self.started,
            &self.completed,
            &self.killed,
            &self.timed_out,
            &self.restarted,
            &self.dropped,
        ] {
            c.set(0);
        }
    }
}

impl Subscribe for LifecycleStats {
    fn on_event(&self, ev: &Event) {
        let counter = match ev.kind {
            EventKind::TaskScheduled => &self.scheduled,
            EventKind::TaskStarted => &self.started,
            EventKind::TaskCompleted => &self.completed,
            EventKind::TaskKilled => &self.killed,
            EventKind::TaskTimedOut => &self.timed_out,
            EventKind::TaskRestarted => &self.restarted,
            EventKind::TaskDropped => &self.dropped,
            _ => return,
        };
        counter.set(counter.get() + 1);
    }

    fn name(&self) -> &'static str {
        "lifecycle-stats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_live() {
        let stats = LifecycleStats::new();
        for kind in [
            EventKind::TaskScheduled,
            EventKind::TaskScheduled,
            EventKind::TaskStarted,
            EventKind::TaskCompleted,
            EventKind::TaskDropped,
            EventKind::CollectionGrown,
        ] {
            stats.on_event(&Event::new(kind));
        }

        let snap = stats.snapshot();
        assert_eq!(snap.scheduled, 2);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.live(), 1);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
