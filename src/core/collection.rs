//! # Per-phase task collection.
//!
//! [`TaskCollection`] owns the tasks of one [`Phase`] and advances them once per tick.
//!
//! ## Architecture
//! ```text
//! add(task) ──► reserve() ──► slots (idle) / pending (mid-pass) ──► attach(home)
//!
//! advance(dt):
//!   advancing = true                       (nested advance → warn, return 0)
//!   for i in 0..slots.len():               (length re-read every step)
//!       slot[i] live? → task.advance(dt)
//!   PassGuard::drop:                        (also runs on panic)
//!       compact: slots + pending → slots, done tasks evicted (detach + TaskEvicted)
//!       advancing = false
//! ```
//!
//! ## Rules
//! - Each task registered when a pass begins is visited exactly once by that pass.
//! - Tasks added during a pass go to `pending` and are first advanced by the next pass.
//! - Removal during a pass leaves a tombstone, so indices stay stable until compaction;
//!   outside a pass the last slot is swapped into the removed one.
//! - Finished tasks are reclaimed at the end of the pass that sees them.
//! - The registered count never exceeds the ceiling; growth publishes `CollectionGrown`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskHandle;
use crate::ticks::Phase;

use super::config::CollectionConfig;

/// Growable set of tasks driven by one phase.
///
/// Built behind an `Rc` (see [`TaskCollection::new`]) so tasks can find their way back
/// to it on [`TaskHandle::restart`].
pub struct TaskCollection {
    me: Weak<TaskCollection>,
    phase: Phase,
    cfg: CollectionConfig,
    bus: Bus,

    slots: RefCell<Vec<Option<TaskHandle>>>,
    pending: RefCell<Vec<TaskHandle>>,
    capacity: Cell<usize>,
    used: Cell<usize>,
    advancing: Cell<bool>,
}

/// Ends a pass on drop, including when a task panics mid-pass.
struct PassGuard<'a> {
    owner: &'a TaskCollection,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.owner.finish_pass();
    }
}

impl TaskCollection {
    /// Creates an empty collection for `phase`.
    pub fn new(phase: Phase, cfg: CollectionConfig, bus: Bus) -> Rc<Self> {
        let capacity = cfg.initial_capacity_clamped();
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            phase,
            cfg,
            bus,
            slots: RefCell::new(Vec::with_capacity(capacity)),
            pending: RefCell::new(Vec::new()),
            capacity: Cell::new(capacity),
            used: Cell::new(0),
            advancing: Cell::new(false),
        })
    }

    /// Phase this collection serves.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Sizing this collection was built with.
    pub fn config(&self) -> &CollectionConfig {
        &self.cfg
    }

    /// Number of registered tasks (finished tasks included until reclaimed).
    pub fn len(&self) -> usize {
        self.used.get()
    }

    /// True if no task is registered.
    pub fn is_empty(&self) -> bool {
        self.used.get() == 0
    }

    /// Number of registered tasks that are not done yet.
    pub fn live_count(&self) -> usize {
        let in_slots = self
            .slots
            .borrow()
            .iter()
            .flatten()
            .filter(|t| !t.is_done())
            .count();
        let in_pending = self.pending.borrow().iter().filter(|t| !t.is_done()).count();
        in_slots + in_pending
    }

    /// Current logical capacity (grows up to the configured ceiling).
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// True while a pass is running.
    pub fn is_advancing(&self) -> bool {
        self.advancing.get()
    }

    /// True if `task` is registered here.
    pub fn contains(&self, task: &TaskHandle) -> bool {
        self.slots.borrow().iter().flatten().any(|t| t.ptr_eq(task))
            || self.pending.borrow().iter().any(|t| t.ptr_eq(task))
    }

    /// Clones of every registered task, in advance order.
    pub fn snapshot(&self) -> Vec<TaskHandle> {
        let mut out: Vec<TaskHandle> = self.slots.borrow().iter().flatten().cloned().collect();
        out.extend(self.pending.borrow().iter().cloned());
        out
    }

    /// Registers `task`.
    ///
    /// Adding a task already registered here is a no-op. During a pass the task is
    /// parked and first advanced by the next pass.
    ///
    /// ### Errors
    /// - [`ScheduleError::AlreadyScheduled`] if the task is registered in another
    ///   collection.
    /// - [`ScheduleError::CapacityExceeded`] if the collection is at its ceiling; the
    ///   task is left unregistered.
    pub fn add(&self, task: TaskHandle) -> Result<(), ScheduleError> {
        self.insert(task, true)
    }

    /// Registers a restarted task again; `TaskRestarted` stands in for `TaskScheduled`.
    pub(crate) fn readmit(&self, task: TaskHandle) -> Result<(), ScheduleError> {
        self.insert(task, false)
    }

    fn insert(&self, task: TaskHandle, announce: bool) -> Result<(), ScheduleError> {
        if task.is_scheduled() {
            if self.contains(&task) {
                return Ok(());
            }
            let elsewhere = task
                .home()
                .filter(|home| !std::ptr::eq(home.as_ref(), self));
            if let Some(other) = elsewhere {
                return Err(ScheduleError::AlreadyScheduled {
                    phase: other.phase(),
                });
            }
        }
        self.reserve()?;

        task.attach(self.me.clone());
        self.used.set(self.used.get() + 1);
        debug!(
            phase = self.phase.as_label(),
            task = %task.id(),
            name = task.name().unwrap_or(""),
            variant = task.variant().as_label(),
            deferred = self.advancing.get(),
            "task scheduled"
        );
        if announce && !self.bus.is_silent() {
            self.bus.publish(task.event(EventKind::TaskScheduled));
        }

        if self.advancing.get() {
            self.pending.borrow_mut().push(task);
        } else {
            self.slots.borrow_mut().push(Some(task));
        }
        Ok(())
    }

    /// Unregisters `task` without touching its state. Returns `false` if it was not here.
    pub fn remove(&self, task: &TaskHandle) -> bool {
        let found = if self.advancing.get() {
            self.tombstone(task)
        } else {
            let mut slots = self.slots.borrow_mut();
            match slots
                .iter()
                .position(|s| s.as_ref().is_some_and(|t| t.ptr_eq(task)))
            {
                Some(pos) => {
                    slots.swap_remove(pos);
                    true
                }
                None => false,
            }
        };

        if found {
            task.detach();
            self.used.set(self.used.get() - 1);
            trace!(phase = self.phase.as_label(), task = %task.id(), "task removed");
        }
        found
    }

    /// Unregisters every task and returns them. Safe to call mid-pass.
    pub fn clear(&self) -> Vec<TaskHandle> {
        let mut drained: Vec<TaskHandle> = self.slots.borrow_mut().drain(..).flatten().collect();
        drained.extend(self.pending.borrow_mut().drain(..));
        for task in &drained {
            task.detach();
        }
        self.used.set(0);
        drained
    }

    /// Advances every live task by `delta` seconds. Returns how many were advanced.
    ///
    /// A nested call (from inside an action or callback of this collection) is
    /// rejected with a warning and returns 0.
    pub fn advance(&self, delta: f32) -> usize {
        if self.advancing.replace(true) {
            warn!(phase = self.phase.as_label(), "nested advance ignored");
            return 0;
        }
        let _guard = PassGuard { owner: self };

        let mut advanced = 0;
        let mut i = 0;
        loop {
            let slot = match self.slots.borrow().get(i) {
                Some(slot) => slot.clone(),
                None => break,
            };
            i += 1;

            if let Some(task) = slot {
                if !task.is_done() {
                    task.advance(delta);
                    advanced += 1;
                }
            }
        }
        advanced
    }

    fn tombstone(&self, task: &TaskHandle) -> bool {
        for slot in self.slots.borrow_mut().iter_mut() {
            if slot.as_ref().is_some_and(|t| t.ptr_eq(task)) {
                *slot = None;
                return true;
            }
        }
        let mut pending = self.pending.borrow_mut();
        match pending.iter().position(|t| t.ptr_eq(task)) {
            Some(pos) => {
                pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Makes room for one more task, growing by one step if full.
    fn reserve(&self) -> Result<(), ScheduleError> {
        let used = self.used.get();
        let cap = self.capacity.get();
        if used < cap {
            return Ok(());
        }

        let max = self.cfg.max_capacity_resolved();
        if cap >= max {
            return Err(ScheduleError::CapacityExceeded {
                phase: self.phase,
                max,
            });
        }

        let grown = cap.saturating_add(self.cfg.growth_step_clamped()).min(max);
        self.capacity.set(grown);
        if !self.advancing.get() {
            let mut slots = self.slots.borrow_mut();
            let extra = grown.saturating_sub(slots.len());
            slots.reserve(extra);
        }

        debug!(
            phase = self.phase.as_label(),
            from = cap,
            to = grown,
            "task collection grown"
        );
        self.bus.publish(
            Event::new(EventKind::CollectionGrown)
                .with_phase(self.phase)
                .with_capacity(grown),
        );
        Ok(())
    }

    /// Compacts slots, merges tasks added mid-pass and reclaims finished tasks.
    fn finish_pass(&self) {
        let evicted = {
            let mut slots = self.slots.borrow_mut();
            let mut pending = self.pending.borrow_mut();

            let mut all: Vec<TaskHandle> = slots.drain(..).flatten().collect();
            all.append(&mut pending);

            let mut evicted = Vec::new();
            for task in all {
                if task.is_done() {
                    evicted.push(task);
                } else {
                    slots.push(Some(task));
                }
            }
            evicted
        };
        self.advancing.set(false);

        for task in evicted {
            task.detach();
            self.used.set(self.used.get() - 1);
            trace!(
                phase = self.phase.as_label(),
                task = %task.id(),
                state = ?task.state(),
                "task evicted"
            );
            if !self.bus.is_silent() {
                self.bus.publish(task.event(EventKind::TaskEvicted));
            }
        }
    }
}

impl std::fmt::Debug for TaskCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCollection")
            .field("phase", &self.phase)
            .field("len", &self.used.get())
            .field("capacity", &self.capacity.get())
            .field("advancing", &self.advancing.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::subscribers::{LifecycleStats, Subscribe, SubscriberSet};
    use crate::tasks::{TaskSettings, TaskState};

    fn collection(cfg: CollectionConfig) -> Rc<TaskCollection> {
        TaskCollection::new(Phase::Update, cfg, Bus::default())
    }

    fn repeating() -> TaskHandle {
        TaskHandle::detached(TaskSettings::builder(|| {}).repeating(1.0).build().unwrap())
    }

    fn count_updates(task: &TaskHandle) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        task.on_update(move |_| h.set(h.get() + 1));
        hits
    }

    #[test]
    fn test_each_task_advanced_once_when_tasks_die_mid_pass() {
        let coll = collection(CollectionConfig::default());
        let tasks: Vec<TaskHandle> = (0..5).map(|_| repeating()).collect();
        let hits: Vec<_> = tasks.iter().map(count_updates).collect();

        // task 2 kills an already visited task and a not yet visited one
        let (visited, ahead) = (tasks[0].clone(), tasks[4].clone());
        tasks[2].on_update(move |_| {
            visited.kill();
            ahead.kill();
        });
        for t in &tasks {
            coll.add(t.clone()).unwrap();
        }

        assert_eq!(coll.advance(0.1), 4);
        let counts: Vec<u32> = hits.iter().map(|h| h.get()).collect();
        assert_eq!(counts, vec![1, 1, 1, 1, 0]);

        assert_eq!(coll.len(), 3);
        assert!(!tasks[0].is_scheduled());
        assert!(!tasks[4].is_scheduled());
        assert_eq!(tasks[0].state(), TaskState::Killed);

        assert_eq!(coll.advance(0.1), 3);
        assert_eq!(hits[1].get(), 2);
        assert_eq!(hits[0].get(), 1);
    }

    #[test]
    fn test_grows_by_step_until_ceiling() {
        let stats = Rc::new(LifecycleStats::new());
        let grown = Rc::new(Cell::new(0));
        struct Grown(Rc<Cell<u32>>);
        impl Subscribe for Grown {
            fn on_event(&self, ev: &Event) {
                if ev.kind == EventKind::CollectionGrown {
                    self.0.set(self.0.get() + 1);
                }
            }
        }
        let subs: Vec<Rc<dyn Subscribe>> = vec![stats.clone(), Rc::new(Grown(grown.clone()))];
        let bus = Bus::new(SubscriberSet::new(subs));
        let coll = TaskCollection::new(Phase::Update, CollectionConfig::new(1, 2, 4), bus);

        assert_eq!(coll.capacity(), 1);
        for _ in 0..4 {
            coll.add(repeating()).unwrap();
        }
        assert_eq!(coll.capacity(), 4);
        assert_eq!(grown.get(), 2);

        let err = coll.add(repeating()).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::CapacityExceeded {
                phase: Phase::Update,
                max: 4
            }
        );
        assert_eq!(coll.len(), 4);
        assert_eq!(stats.snapshot().scheduled, 4);
    }

    #[test]
    fn test_reclaimed_slots_are_reused() {
        let coll = collection(CollectionConfig::new(0, 1, 2));
        let a = repeating();
        coll.add(a.clone()).unwrap();
        coll.add(repeating()).unwrap();
        assert!(coll.add(repeating()).is_err());

        a.kill();
        coll.advance(0.1);
        assert_eq!(coll.len(), 1);
        assert!(coll.add(repeating()).is_ok());
    }

    #[test]
    fn test_task_lives_in_one_collection_only() {
        let update = collection(CollectionConfig::default());
        let late =
            TaskCollection::new(Phase::LateUpdate, CollectionConfig::default(), Bus::default());
        let task = repeating();
        let hits = count_updates(&task);

        update.add(task.clone()).unwrap();
        assert_eq!(
            late.add(task.clone()),
            Err(ScheduleError::AlreadyScheduled {
                phase: Phase::Update
            })
        );
        assert!(!late.contains(&task));
        assert_eq!(late.len(), 0);

        update.advance(0.1);
        late.advance(0.1);
        assert_eq!(hits.get(), 1);

        // free to move once the first collection lets go
        assert!(update.remove(&task));
        late.add(task.clone()).unwrap();
        assert!(task.is_scheduled());
        late.advance(0.1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_add_during_pass_runs_next_pass() {
        let coll = collection(CollectionConfig::default());
        let late = repeating();
        let late_hits = count_updates(&late);

        let weak = Rc::downgrade(&coll);
        let to_add = late.clone();
        let spawner = TaskHandle::detached(
            TaskSettings::builder(move || {
                if let Some(coll) = weak.upgrade() {
                    coll.add(to_add.clone()).unwrap();
                }
            })
            .build()
            .unwrap(),
        );
        coll.add(spawner).unwrap();

        assert_eq!(coll.advance(0.1), 1);
        assert_eq!(late_hits.get(), 0);
        assert!(late.is_scheduled());
        assert_eq!(coll.len(), 1, "spawner reclaimed, late task merged");

        assert_eq!(coll.advance(0.1), 1);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_remove_during_pass_skips_task() {
        let coll = collection(CollectionConfig::default());
        let first = repeating();
        let second = repeating();
        let second_hits = count_updates(&second);

        let weak = Rc::downgrade(&coll);
        let target = second.clone();
        first.on_update(move |_| {
            if let Some(coll) = weak.upgrade() {
                assert!(coll.remove(&target));
            }
        });
        coll.add(first).unwrap();
        coll.add(second.clone()).unwrap();

        assert_eq!(coll.advance(0.1), 1);
        assert_eq!(second_hits.get(), 0);
        assert!(!second.is_scheduled());
        assert!(!second.is_done());
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_nested_advance_is_rejected() {
        let coll = collection(CollectionConfig::default());
        let nested = Rc::new(Cell::new(usize::MAX));
        let (weak, n) = (Rc::downgrade(&coll), nested.clone());
        let task = TaskHandle::detached(
            TaskSettings::builder(move || {
                if let Some(coll) = weak.upgrade() {
                    n.set(coll.advance(0.1));
                }
            })
            .build()
            .unwrap(),
        );
        coll.add(task).unwrap();
        coll.advance(0.1);
        assert_eq!(nested.get(), 0);
        assert!(!coll.is_advancing());
    }

    #[test]
    fn test_panicking_task_leaves_collection_usable() {
        let coll = collection(CollectionConfig::default());
        let survivor = repeating();
        let hits = count_updates(&survivor);
        coll.add(
            TaskHandle::detached(TaskSettings::builder(|| panic!("boom")).build().unwrap()),
        )
        .unwrap();
        coll.add(survivor).unwrap();

        let res = catch_unwind(AssertUnwindSafe(|| coll.advance(0.1)));
        assert!(res.is_err());
        assert!(!coll.is_advancing());

        coll.advance(0.1);
        assert!(hits.get() >= 1);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let coll = collection(CollectionConfig::default());
        let a = repeating();
        coll.add(a.clone()).unwrap();
        coll.add(a.clone()).unwrap();
        assert_eq!(coll.len(), 1, "double add is a no-op");

        let drained = coll.clear();
        assert_eq!(drained.len(), 1);
        assert!(coll.is_empty());
        assert!(!a.is_scheduled());
        assert!(!a.is_done());
    }
}
