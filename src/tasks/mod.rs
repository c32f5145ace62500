//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`TaskSettings`] / [`TaskSettingsBuilder`] - validated construction parameters
//! - [`TaskHandle`] - shared handle to a live task (state machine, control, inspection)
//! - [`LifecycleEvent`] / [`SubscriptionId`] - per-task callback subscriptions
//! - [`TaskState`] / [`TaskVariant`] / [`TaskId`] - inspection types

mod callbacks;
mod settings;
mod task;

pub use callbacks::{Callback, LifecycleEvent, SubscriptionId};
pub use settings::{Action, Condition, TaskSettings, TaskSettingsBuilder, TaskVariant};
pub use task::{TaskHandle, TaskId, TaskState};
