//! Scheduler events: types and bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish diagnostic events emitted by the scheduler, its collections and tasks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] synchronous fan-out to the [`SubscriberSet`](crate::SubscriberSet)
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (pause/resume/dispose, dropped tasks), `TaskCollection`
//!   (registration, growth, eviction), `Task` (start/complete/kill/timeout/restart).
//! - **Consumers**: user [`Subscribe`](crate::Subscribe) implementations.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
