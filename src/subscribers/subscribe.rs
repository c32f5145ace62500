//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! scheduler. Subscribers are fixed when the scheduler is built and receive every
//! [`Event`] synchronously, on the ticking thread, in `seq` order.
//!
//! ## Contract
//! - `on_event` runs inside `tick()` / factory calls: keep it short.
//! - Do not call back into the scheduler from `on_event`; use task callbacks
//!   (`on_complete`, ...) for reactions that schedule work.
//! - A panic inside `on_event` is caught and logged; other subscribers still run.
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use tickvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct DropCounter(Cell<usize>);
//!
//! impl Subscribe for DropCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskDropped {
//!             self.0.set(self.0.get() + 1);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "drop-counter" }
//! }
//! ```

use crate::events::Event;

/// Contract for event subscribers.
pub trait Subscribe: 'static {
    /// Handle a single event for this subscriber.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
