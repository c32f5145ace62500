//! # Event bus for diagnostic events.
//!
//! [`Bus`] hands every published [`Event`] to the [`SubscriberSet`] built by the
//! [`SchedulerBuilder`](crate::SchedulerBuilder).
//!
//! ## Architecture
//! ```text
//! Publishers:                          Subscribers (fixed at build time):
//!   Scheduler      ──┐
//!   TaskCollection ──┼──► Bus ──► SubscriberSet ──► LogWriter / LifecycleStats / custom
//!   Task           ──┘
//! ```
//!
//! ## Rules
//! - **Synchronous**: `publish()` delivers to every subscriber before returning; there is
//!   no queue and no background worker (the scheduler is single-threaded).
//! - **Isolated**: a panicking subscriber is logged and skipped (see [`SubscriberSet`]).
//! - **No persistence**: with no subscribers, events are dropped.

use std::rc::Rc;

use super::event::Event;
use crate::subscribers::SubscriberSet;

/// Synchronous fan-out channel for scheduler events.
///
/// Cheap to clone (shares one `Rc`-backed subscriber set). `Bus::default()`
/// has no subscribers and drops every event.
#[derive(Clone, Default)]
pub struct Bus {
    subs: Rc<SubscriberSet>,
}

impl Bus {
    /// Creates a bus delivering to `subs`.
    pub fn new(subs: SubscriberSet) -> Self {
        Self {
            subs: Rc::new(subs),
        }
    }

    /// Publishes an event to all subscribers.
    pub fn publish(&self, ev: Event) {
        if !self.subs.is_empty() {
            self.subs.emit(&ev);
        }
    }

    /// True if nobody listens (publishing is a no-op).
    pub fn is_silent(&self) -> bool {
        self.subs.is_empty()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subs.len())
            .finish()
    }
}
