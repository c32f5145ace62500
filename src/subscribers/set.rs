//! # SubscriberSet: synchronous fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::Event) to every subscriber
//! in registration order.
//!
//! ## What it guarantees
//! - `emit(&Event)` has delivered to every subscriber when it returns.
//! - Subscribers see events in the order they were emitted.
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├──► S1.on_event()   (catch_unwind)
//!        ├──► S2.on_event()   (catch_unwind)
//!        └──► SN.on_event()   (catch_unwind)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::error;

use crate::events::Event;

use super::Subscribe;

/// Composite fan-out over a fixed list of subscribers.
#[derive(Default)]
pub struct SubscriberSet {
    subs: Vec<Rc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set.
    #[must_use]
    pub fn new(subs: Vec<Rc<dyn Subscribe>>) -> Self {
        Self { subs }
    }

    /// Delivers one event to all subscribers.
    ///
    /// A subscriber that panics is logged with its name and skipped; the panic does
    /// not reach the scheduler.
    pub fn emit(&self, event: &Event) {
        for sub in &self.subs {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                error!(
                    subscriber = sub.name(),
                    event = event.kind.as_label(),
                    "subscriber panicked: {}",
                    panic_message(panic_err.as_ref())
                );
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::events::EventKind;

    struct Recorder(Rc<RefCell<Vec<EventKind>>>);

    impl Subscribe for Recorder {
        fn on_event(&self, ev: &Event) {
            self.0.borrow_mut().push(ev.kind);
        }
    }

    struct Panicker;

    impl Subscribe for Panicker {
        fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let set = SubscriberSet::new(vec![
            Rc::new(Panicker) as Rc<dyn Subscribe>,
            Rc::new(Recorder(seen.clone())),
        ]);

        set.emit(&Event::new(EventKind::SchedulerPaused));
        set.emit(&Event::new(EventKind::SchedulerResumed));

        assert_eq!(
            *seen.borrow(),
            vec![EventKind::SchedulerPaused, EventKind::SchedulerResumed]
        );
    }

    #[test]
    fn test_len_and_empty() {
        assert!(SubscriberSet::default().is_empty());
        let set = SubscriberSet::new(vec![Rc::new(Panicker) as Rc<dyn Subscribe>]);
        assert_eq!(set.len(), 1);
    }
}
