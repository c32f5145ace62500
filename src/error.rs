//! Error types used by the tickvisor scheduler.
//!
//! A single enum, [`ScheduleError`], covers everything the scheduler can refuse:
//!
//! - settings rejected at factory-call time ([`ScheduleError::InvalidSettings`]);
//! - a collection that reached its hard ceiling ([`ScheduleError::CapacityExceeded`]);
//! - a task registered in a second collection ([`ScheduleError::AlreadyScheduled`]);
//! - a malformed tick from the host ([`ScheduleError::InvalidTick`]);
//! - a restart on a task whose collection is gone ([`ScheduleError::Detached`]).
//!
//! Like the rest of the crate it provides helper methods (`as_label`, `as_message`)
//! for logs and diagnostics.
//!
//! Terminating a task twice (`kill`/`complete` on a finished task) is **not** an error:
//! both operations are idempotent no-ops once the task is done.

use thiserror::Error;

use crate::ticks::Phase;

/// # Errors produced by the scheduler.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// A settings bundle failed validation; the task was not created.
    #[error("invalid task settings: {field} {reason}")]
    InvalidSettings {
        /// Name of the offending setting (e.g. `"interval"`).
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The collection for `phase` is at its hard maximum; the task was dropped.
    #[error("task collection for {phase} is full (max {max} tasks)")]
    CapacityExceeded {
        /// Phase whose collection rejected the task.
        phase: Phase,
        /// Configured hard ceiling.
        max: usize,
    },

    /// The task is already registered in the collection of `phase`.
    #[error("task is already scheduled in the {phase} collection")]
    AlreadyScheduled {
        /// Phase of the collection holding the task.
        phase: Phase,
    },

    /// The host delivered a negative or non-finite delta.
    #[error("invalid tick delta {delta}")]
    InvalidTick {
        /// The rejected delta, in seconds.
        delta: f32,
    },

    /// The task's home collection no longer exists (scheduler dropped).
    #[error("task is detached from its scheduler")]
    Detached,
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::{Phase, ScheduleError};
    ///
    /// let err = ScheduleError::CapacityExceeded { phase: Phase::Update, max: 8 };
    /// assert_eq!(err.as_label(), "capacity_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::InvalidSettings { .. } => "invalid_settings",
            ScheduleError::CapacityExceeded { .. } => "capacity_exceeded",
            ScheduleError::AlreadyScheduled { .. } => "already_scheduled",
            ScheduleError::InvalidTick { .. } => "invalid_tick",
            ScheduleError::Detached => "task_detached",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ScheduleError::InvalidSettings { field, reason } => format!("{field}: {reason}"),
            ScheduleError::CapacityExceeded { phase, max } => {
                format!("phase={phase} max={max}")
            }
            ScheduleError::AlreadyScheduled { phase } => format!("phase={phase}"),
            ScheduleError::InvalidTick { delta } => format!("delta={delta}"),
            ScheduleError::Detached => "home collection dropped".to_string(),
        }
    }

    /// Shorthand for building [`ScheduleError::InvalidSettings`].
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ScheduleError::InvalidSettings {
            field,
            reason: reason.into(),
        }
    }
}
