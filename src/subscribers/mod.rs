//! # Event subscribers for the tickvisor scheduler.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling events published through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler / TaskCollection / Task ── publish(Event) ──► Bus ──► SubscriberSet
//!                                                                       │
//!                                                     ┌─────────────────┼──────────┐
//!                                                     ▼                 ▼          ▼
//!                                                 LogWriter      LifecycleStats  Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, alerts)
//! - **Stateful subscribers** - maintain counters based on events ([`LifecycleStats`])

#[cfg(feature = "logging")]
mod log;
mod set;
mod stats;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use stats::{LifecycleStats, StatsSnapshot};
pub use subscribe::Subscribe;
