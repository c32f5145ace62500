//! # Per-task lifecycle callbacks.
//!
//! Every task keeps one ordered [`CallbackList`] per [`LifecycleEvent`]. Firing an
//! event invokes a snapshot of the list, in subscription order, so callbacks may
//! subscribe or unsubscribe (themselves included) without disturbing the firing
//! in progress. Changes take effect on the next firing.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::task::TaskHandle;

/// Global counter for subscription ids, so an id never matches another task's callback.
static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Lifecycle callback; receives the task that raised the event.
pub type Callback = Rc<dyn Fn(&TaskHandle)>;

/// Events a task callback can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Delay elapsed; the task became active.
    Start,
    /// Fired on every advance of a live task, including the one that finishes it.
    Update,
    /// Task completed (action invoked).
    Complete,
    /// Task was killed (action not invoked).
    Kill,
    /// Task exceeded its max duration (action not invoked).
    Timeout,
}

impl LifecycleEvent {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            LifecycleEvent::Start => 0,
            LifecycleEvent::Update => 1,
            LifecycleEvent::Complete => 2,
            LifecycleEvent::Kill => 3,
            LifecycleEvent::Timeout => 4,
        }
    }
}

/// Handle returned by [`TaskHandle::subscribe`]; pass it to
/// [`TaskHandle::unsubscribe`] to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    event: LifecycleEvent,
    seq: u64,
}

impl SubscriptionId {
    /// Event the subscription is attached to.
    pub fn event(&self) -> LifecycleEvent {
        self.event
    }
}

/// Ordered list of callbacks for one event.
#[derive(Default)]
struct CallbackList {
    entries: RefCell<Vec<(u64, Callback)>>,
}

impl CallbackList {
    fn snapshot(&self) -> Vec<Callback> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect()
    }
}

/// All callback lists of one task.
#[derive(Default)]
pub(crate) struct Callbacks {
    lists: [CallbackList; LifecycleEvent::COUNT],
}

impl Callbacks {
    pub(crate) fn subscribe(&self, event: LifecycleEvent, cb: Callback) -> SubscriptionId {
        let seq = SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed);
        self.lists[event.index()]
            .entries
            .borrow_mut()
            .push((seq, cb));
        SubscriptionId { event, seq }
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lists[id.event.index()].entries.borrow_mut();
        match entries.iter().position(|(seq, _)| *seq == id.seq) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn fire(&self, event: LifecycleEvent, task: &TaskHandle) {
        let list = &self.lists[event.index()];
        if list.entries.borrow().is_empty() {
            return;
        }
        for cb in list.snapshot() {
            cb(task);
        }
    }

    pub(crate) fn len(&self, event: LifecycleEvent) -> usize {
        self.lists[event.index()].entries.borrow().len()
    }
}
