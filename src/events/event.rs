//! # Diagnostic events emitted by the scheduler and its tasks.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task lifecycle**: scheduled, started, completed, killed, timed out, restarted, evicted
//! - **Collection events**: capacity growth and tasks dropped at the ceiling
//! - **Scheduler events**: global pause/resume and disposal
//!
//! The [`Event`] struct carries additional metadata such as the task id/name,
//! phase, reasons and capacities.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Since delivery is synchronous, subscribers observe events in `seq` order.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind, Phase};
//!
//! let ev = Event::new(EventKind::TaskDropped)
//!     .with_phase(Phase::Update)
//!     .with_capacity(64)
//!     .with_reason("capacity_exceeded");
//!
//! assert_eq!(ev.kind, EventKind::TaskDropped);
//! assert_eq!(ev.capacity, Some(64));
//! assert_eq!(ev.reason.as_deref(), Some("capacity_exceeded"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::TaskId;
use crate::ticks::Phase;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// Task registered in a collection.
    ///
    /// Sets:
    /// - `task`, `name`: task identity
    /// - `phase`: collection phase
    TaskScheduled,

    /// Task delay elapsed; the task became active.
    ///
    /// Sets: `task`, `name`, `phase`
    TaskStarted,

    /// Task completed (action invoked, `on_complete` fired).
    ///
    /// Sets: `task`, `name`, `phase`
    TaskCompleted,

    /// Task was killed (action not invoked, `on_kill` fired).
    ///
    /// Sets: `task`, `name`, `phase`
    TaskKilled,

    /// Task exceeded its max duration (action not invoked, `on_timeout` fired).
    ///
    /// Sets: `task`, `name`, `phase`
    TaskTimedOut,

    /// Task state was reset by `restart()`.
    ///
    /// Sets: `task`, `name`, `phase`
    TaskRestarted,

    /// Finished task's slot was reclaimed by its collection.
    ///
    /// Sets: `task`, `name`, `phase`
    TaskEvicted,

    // === Collection events ===
    /// Task rejected because the collection reached its hard maximum.
    ///
    /// Sets:
    /// - `task`, `name`: the dropped task
    /// - `phase`: collection phase
    /// - `capacity`: configured maximum
    /// - `reason`: error label
    TaskDropped,

    /// Collection capacity grew by one step.
    ///
    /// Sets:
    /// - `phase`: collection phase
    /// - `capacity`: new capacity
    CollectionGrown,

    // === Scheduler events ===
    /// `pause_all()` took effect.
    SchedulerPaused,

    /// `resume_all()` took effect.
    SchedulerResumed,

    /// `dispose()` killed and released every task.
    ///
    /// Sets:
    /// - `capacity`: number of tasks released
    SchedulerDisposed,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::TaskScheduled => "task_scheduled",
            EventKind::TaskStarted => "task_started",
            EventKind::TaskCompleted => "task_completed",
            EventKind::TaskKilled => "task_killed",
            EventKind::TaskTimedOut => "task_timed_out",
            EventKind::TaskRestarted => "task_restarted",
            EventKind::TaskEvicted => "task_evicted",
            EventKind::TaskDropped => "task_dropped",
            EventKind::CollectionGrown => "collection_grown",
            EventKind::SchedulerPaused => "scheduler_paused",
            EventKind::SchedulerResumed => "scheduler_resumed",
            EventKind::SchedulerDisposed => "scheduler_disposed",
        }
    }
}

/// Scheduler event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the task, if applicable.
    pub task: Option<TaskId>,
    /// Name of the task, if it has one.
    pub name: Option<Arc<str>>,
    /// Phase of the collection involved.
    pub phase: Option<Phase>,
    /// Capacity figure (new capacity, ceiling, or task count).
    pub capacity: Option<usize>,
    /// Human-readable reason (error labels etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            name: None,
            phase: None,
            capacity: None,
            reason: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, id: TaskId) -> Self {
        self.task = Some(id);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a capacity figure.
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for the three terminal task events.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted | EventKind::TaskKilled | EventKind::TaskTimedOut
        )
    }
}
