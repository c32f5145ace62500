//! # Scheduler: the host-owned entry point.
//!
//! [`Scheduler`] owns one [`TaskCollection`] per [`Phase`], the global pause switch and
//! the diagnostic [`Bus`]. The host builds it once, registers tasks through the
//! factories and forwards every tick to it.
//!
//! ## Architecture
//! ```text
//! host / TickSource / FrameClock
//!     │ tick(phase, dt)
//!     ▼
//! Scheduler ── paused? ──► drop tick
//!     │
//!     ├─► collections[Update].advance(dt)
//!     ├─► collections[LateUpdate].advance(dt)
//!     └─► collections[FixedUpdate].advance(dt)
//!
//! do_after / do_repeating / do_until / do_when / do_after_frames / do_times
//!     └─► TaskSettings::builder(..).build()? ──► schedule(settings)
//!             ├─► collections[phase].add(task)
//!             └─► CapacityExceeded → warn! + TaskDropped, handle returned unscheduled
//! ```
//!
//! ## Rules
//! - Factories are safe to call from inside any task callback.
//! - While paused no collection receives ticks; per-task pause flags are untouched.
//! - `Scheduler` is a cheap `Rc` handle; clone it (or [`Scheduler::downgrade`] it)
//!   into callbacks that need it.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{TaskHandle, TaskSettings};
use crate::ticks::{Phase, TickSource};

use super::builder::SchedulerBuilder;
use super::collection::TaskCollection;
use super::config::Config;

struct SchedulerInner {
    cfg: Config,
    bus: Bus,
    collections: [Rc<TaskCollection>; 3],
    paused: Cell<bool>,
}

/// Frame-driven task scheduler.
///
/// ## Example
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tickvisor::{Phase, Scheduler, ScriptedTicks};
///
/// let scheduler = Scheduler::default();
/// let counter = Rc::new(Cell::new(0));
///
/// let c = counter.clone();
/// let task = scheduler
///     .do_after(move || c.set(c.get() + 1), 3.0, Phase::Update)
///     .unwrap();
///
/// scheduler.drive(&mut ScriptedTicks::updates([1.0, 1.0, 1.0])).unwrap();
/// assert_eq!(counter.get(), 0);
///
/// scheduler.tick(Phase::Update, 0.1).unwrap();
/// assert_eq!(counter.get(), 1);
/// assert!(task.is_done());
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

/// Non-owning handle to a [`Scheduler`], for callbacks that must not keep it alive.
#[derive(Clone, Debug, Default)]
pub struct WeakScheduler {
    inner: Weak<SchedulerInner>,
}

impl WeakScheduler {
    /// Returns the scheduler if it still exists.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }
}

impl Scheduler {
    /// Creates a scheduler without subscribers.
    pub fn new(cfg: Config) -> Self {
        Self::with_bus(cfg, Bus::default())
    }

    /// Returns a builder for attaching event subscribers.
    pub fn builder(cfg: Config) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn with_bus(cfg: Config, bus: Bus) -> Self {
        let collections =
            Phase::ALL.map(|phase| TaskCollection::new(phase, cfg.collection(phase), bus.clone()));
        debug!(
            update_cap = collections[0].capacity(),
            late_update_cap = collections[1].capacity(),
            fixed_update_cap = collections[2].capacity(),
            subscribers = !bus.is_silent(),
            "scheduler created"
        );
        Self {
            inner: Rc::new(SchedulerInner {
                cfg,
                bus,
                collections,
                paused: Cell::new(false),
            }),
        }
    }

    /// Returns a non-owning handle.
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Configuration the scheduler was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Collection serving `phase`.
    pub fn collection(&self, phase: Phase) -> &Rc<TaskCollection> {
        &self.inner.collections[phase.index()]
    }

    /// Registered tasks in `phase` (finished ones included until reclaimed).
    pub fn len(&self, phase: Phase) -> usize {
        self.collection(phase).len()
    }

    /// True if no phase has a registered task.
    pub fn is_empty(&self) -> bool {
        self.inner.collections.iter().all(|c| c.is_empty())
    }

    // ---------------------------
    // Factories
    // ---------------------------

    /// Fires `action` once, `after` seconds from now.
    pub fn do_after(
        &self,
        action: impl Fn() + 'static,
        after: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .start_after(after)
                .phase(phase)
                .build()?,
        )
    }

    /// Fires `action` every `every` seconds after `start_after`, until killed or
    /// `max_duration` active seconds have passed (`<= 0` = forever).
    pub fn do_repeating(
        &self,
        action: impl Fn() + 'static,
        every: f32,
        start_after: f32,
        max_duration: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .repeating(every)
                .start_after(start_after)
                .max_duration(max_duration)
                .phase(phase)
                .build()?,
        )
    }

    /// Fires `action` every `every` seconds until `condition` holds, then completes.
    ///
    /// `every = 0` fires on every active tick; `timeout <= 0` never times out.
    pub fn do_until(
        &self,
        action: impl Fn() + 'static,
        condition: impl Fn() -> bool + 'static,
        every: f32,
        start_after: f32,
        timeout: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .until(condition, every)
                .start_after(start_after)
                .max_duration(timeout)
                .phase(phase)
                .build()?,
        )
    }

    /// Fires `action` once, on the first active tick where `condition` holds.
    pub fn do_when(
        &self,
        action: impl Fn() + 'static,
        condition: impl Fn() -> bool + 'static,
        start_after: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .when(condition)
                .start_after(start_after)
                .phase(phase)
                .build()?,
        )
    }

    /// Fires `action` once after `frames` active ticks.
    pub fn do_after_frames(
        &self,
        action: impl Fn() + 'static,
        frames: u32,
        start_after: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .after_frames(frames)
                .start_after(start_after)
                .phase(phase)
                .build()?,
        )
    }

    /// Fires `action` `times` times, `every` seconds apart, then completes.
    pub fn do_times(
        &self,
        action: impl Fn() + 'static,
        times: u32,
        every: f32,
        start_after: f32,
        max_duration: f32,
        phase: Phase,
    ) -> Result<TaskHandle, ScheduleError> {
        self.schedule(
            TaskSettings::builder(action)
                .times(times, every)
                .start_after(start_after)
                .max_duration(max_duration)
                .phase(phase)
                .build()?,
        )
    }

    /// Registers a task built from hand-made settings.
    ///
    /// A task rejected at the capacity ceiling is still returned, with
    /// [`TaskHandle::is_scheduled`] false; the drop is logged and published as
    /// [`EventKind::TaskDropped`].
    pub fn schedule(&self, settings: TaskSettings) -> Result<TaskHandle, ScheduleError> {
        let task = TaskHandle::new(settings, self.inner.bus.clone());
        let phase = task.phase();

        match self.collection(phase).add(task.clone()) {
            Ok(()) => {}
            Err(err @ ScheduleError::CapacityExceeded { .. }) => {
                warn!(
                    phase = phase.as_label(),
                    task = %task.id(),
                    name = task.name().unwrap_or(""),
                    "task dropped: {err}"
                );
                let max = self.collection(phase).config().max_capacity_resolved();
                self.inner.bus.publish(
                    task.event(EventKind::TaskDropped)
                        .with_capacity(max)
                        .with_reason(err.as_label()),
                );
            }
            Err(err) => return Err(err),
        }
        Ok(task)
    }

    // ---------------------------
    // Dispatch
    // ---------------------------

    /// Advances the collection of `phase` by `delta` seconds.
    ///
    /// Returns the number of tasks advanced (0 while globally paused).
    ///
    /// ### Errors
    /// [`ScheduleError::InvalidTick`] for a negative or non-finite delta; nothing is
    /// advanced.
    pub fn tick(&self, phase: Phase, delta: f32) -> Result<usize, ScheduleError> {
        if !delta.is_finite() || delta < 0.0 {
            warn!(phase = phase.as_label(), delta, "tick rejected");
            return Err(ScheduleError::InvalidTick { delta });
        }
        if self.inner.paused.get() {
            return Ok(0);
        }
        let advanced = self.collection(phase).advance(delta);
        trace!(phase = phase.as_label(), delta, advanced, "tick");
        Ok(advanced)
    }

    /// Runs one frame: [`Phase::Update`] then [`Phase::LateUpdate`] with the same delta.
    pub fn frame(&self, delta: f32) -> Result<usize, ScheduleError> {
        let update = self.tick(Phase::Update, delta)?;
        let late = self.tick(Phase::LateUpdate, delta)?;
        Ok(update + late)
    }

    /// Dispatches every tick `source` yields until it returns `None`.
    ///
    /// Returns the number of ticks dispatched. Stops at the first invalid tick.
    pub fn drive(&self, source: &mut impl TickSource) -> Result<usize, ScheduleError> {
        let mut dispatched = 0;
        while let Some(tick) = source.next_tick() {
            self.tick(tick.phase, tick.delta)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    // ---------------------------
    // Global control
    // ---------------------------

    /// Stops delivering ticks to every phase.
    pub fn pause_all(&self) {
        if !self.inner.paused.replace(true) {
            debug!("scheduler paused");
            self.inner.bus.publish(Event::new(EventKind::SchedulerPaused));
        }
    }

    /// Undoes [`pause_all`](Self::pause_all).
    pub fn resume_all(&self) {
        if self.inner.paused.replace(false) {
            debug!("scheduler resumed");
            self.inner.bus.publish(Event::new(EventKind::SchedulerResumed));
        }
    }

    /// True while globally paused.
    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    /// Kills every registered task and empties all collections.
    ///
    /// Returns the number of tasks released. The scheduler stays usable.
    pub fn dispose(&self) -> usize {
        let mut released = 0;
        for coll in &self.inner.collections {
            for task in coll.clear() {
                task.kill();
                released += 1;
            }
        }
        debug!(released, "scheduler disposed");
        self.inner
            .bus
            .publish(Event::new(EventKind::SchedulerDisposed).with_capacity(released));
        released
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("paused", &self.inner.paused.get())
            .field("collections", &self.inner.collections)
            .field("bus", &self.inner.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::core::CollectionConfig;
    use crate::subscribers::{LifecycleStats, Subscribe};
    use crate::tasks::TaskState;
    use crate::ticks::ScriptedTicks;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    struct Recorder(RefCell<Vec<EventKind>>);

    impl Subscribe for Recorder {
        fn on_event(&self, ev: &Event) {
            self.0.borrow_mut().push(ev.kind);
        }
    }

    #[test]
    fn test_do_after_fires_on_fourth_tick() {
        let scheduler = Scheduler::default();
        let (count, action) = counter();
        scheduler.do_after(action, 3.0, Phase::Update).unwrap();

        let mut fired_on = Vec::new();
        for (n, dt) in [1.0, 1.0, 1.0, 0.1, 1.0].into_iter().enumerate() {
            let before = count.get();
            scheduler.tick(Phase::Update, dt).unwrap();
            if count.get() > before {
                fired_on.push(n + 1);
            }
        }
        assert_eq!(fired_on, vec![4]);
        assert_eq!(scheduler.len(Phase::Update), 0);
    }

    #[test]
    fn test_after_frames_fires_on_third_tick() {
        let scheduler = Scheduler::default();
        let (count, action) = counter();
        let task = scheduler.do_after_frames(action, 3, 0.0, Phase::Update).unwrap();

        scheduler.drive(&mut ScriptedTicks::updates([0.0, 7.0])).unwrap();
        assert_eq!(count.get(), 0);
        scheduler.tick(Phase::Update, 0.01).unwrap();
        assert_eq!(count.get(), 1);
        assert!(task.is_done());
    }

    #[test]
    fn test_until_counter_completes_on_third_tick() {
        let scheduler = Scheduler::default();
        let count = Rc::new(Cell::new(0));
        let (c1, c2) = (count.clone(), count.clone());
        let task = scheduler
            .do_until(
                move || c1.set(c1.get() + 1),
                move || c2.get() >= 3,
                1.0,
                0.0,
                -1.0,
                Phase::Update,
            )
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            scheduler.tick(Phase::Update, 1.0).unwrap();
            seen.push(count.get());
        }
        assert_eq!(seen, vec![1, 2, 3, 3, 3]);
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[test]
    fn test_do_times_and_do_when() {
        let scheduler = Scheduler::default();
        let (times, action) = counter();
        scheduler
            .do_times(action, 2, 0.0, 0.0, 0.0, Phase::Update)
            .unwrap();

        let ready = Rc::new(Cell::new(false));
        let r = ready.clone();
        let (whens, action) = counter();
        scheduler
            .do_when(action, move || r.get(), 0.0, Phase::Update)
            .unwrap();

        scheduler.drive(&mut ScriptedTicks::updates([0.1; 4])).unwrap();
        assert_eq!(times.get(), 2);
        assert_eq!(whens.get(), 0);

        ready.set(true);
        scheduler.tick(Phase::Update, 0.1).unwrap();
        assert_eq!(whens.get(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_phases_are_independent() {
        let scheduler = Scheduler::default();
        let (fixed, action) = counter();
        scheduler
            .do_repeating(action, 0.02, 0.0, -1.0, Phase::FixedUpdate)
            .unwrap();
        let (late, action) = counter();
        scheduler
            .do_repeating(action, 0.0, 0.0, -1.0, Phase::LateUpdate)
            .unwrap();

        scheduler.frame(0.016).unwrap();
        scheduler.frame(0.016).unwrap();
        assert_eq!(fixed.get(), 0);
        assert_eq!(late.get(), 2);

        let mut ticks = ScriptedTicks::new().repeat(Phase::FixedUpdate, 0.02, 5);
        scheduler.drive(&mut ticks).unwrap();
        assert_eq!(fixed.get(), 5);
    }

    #[test]
    fn test_pause_all_blocks_every_phase() {
        let rec = Rc::new(Recorder(RefCell::new(Vec::new())));
        let subs: Vec<Rc<dyn Subscribe>> = vec![rec.clone()];
        let scheduler = Scheduler::builder(Config::default())
            .with_subscribers(subs)
            .build();
        let (count, action) = counter();
        let task = scheduler.do_repeating(action, 1.0, 0.0, -1.0, Phase::Update).unwrap();
        task.pause();

        scheduler.pause_all();
        scheduler.pause_all();
        assert_eq!(scheduler.tick(Phase::Update, 5.0).unwrap(), 0);
        scheduler.resume_all();
        assert!(task.is_paused(), "per-task pause survives global resume");

        task.resume();
        scheduler.tick(Phase::Update, 1.0).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(task.elapsed_since_creation(), 1.0);

        let kinds = rec.0.borrow();
        let paused = kinds.iter().filter(|k| **k == EventKind::SchedulerPaused).count();
        assert_eq!(paused, 1);
        assert!(kinds.contains(&EventKind::SchedulerResumed));
    }

    #[test]
    fn test_invalid_tick_is_rejected() {
        let scheduler = Scheduler::default();
        let (count, action) = counter();
        scheduler.do_after(action, 0.0, Phase::Update).unwrap();

        for bad in [-0.1, f32::NAN, f32::INFINITY] {
            let err = scheduler.tick(Phase::Update, bad).unwrap_err();
            assert_eq!(err.as_label(), "invalid_tick");
        }
        assert_eq!(count.get(), 0);

        let mut ticks = ScriptedTicks::updates([0.1, -1.0, 0.1]);
        assert!(scheduler.drive(&mut ticks).is_err());
        assert_eq!(ticks.remaining(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_invalid_settings_are_rejected_synchronously() {
        let scheduler = Scheduler::default();
        let err = scheduler
            .do_repeating(|| {}, -1.0, 0.0, -1.0, Phase::Update)
            .unwrap_err();
        assert_eq!(err.as_label(), "invalid_settings");
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_capacity_drop_returns_unscheduled_handle() {
        let stats = Rc::new(LifecycleStats::new());
        let rec = Rc::new(Recorder(RefCell::new(Vec::new())));
        let cfg = Config::default().with_collection(Phase::Update, CollectionConfig::new(1, 1, 2));
        let subs: Vec<Rc<dyn Subscribe>> = vec![stats.clone(), rec.clone()];
        let scheduler = Scheduler::builder(cfg).with_subscribers(subs).build();

        let a = scheduler.do_repeating(|| {}, 1.0, 0.0, -1.0, Phase::Update).unwrap();
        let b = scheduler.do_repeating(|| {}, 1.0, 0.0, -1.0, Phase::Update).unwrap();
        let (count, action) = counter();
        let dropped = scheduler.do_after(action, 0.0, Phase::Update).unwrap();

        assert!(a.is_scheduled() && b.is_scheduled());
        assert!(!dropped.is_scheduled());
        scheduler.tick(Phase::Update, 1.0).unwrap();
        assert_eq!(count.get(), 0);

        let snap = stats.snapshot();
        assert_eq!(snap.scheduled, 2);
        assert_eq!(snap.dropped, 1);
        assert!(rec.0.borrow().contains(&EventKind::CollectionGrown));
    }

    #[test]
    fn test_factories_work_from_callbacks() {
        let scheduler = Scheduler::default();
        let weak = scheduler.downgrade();
        let (count, action) = counter();
        let action = Rc::new(action);

        let parent = scheduler
            .do_repeating(
                move || {
                    if let Some(s) = weak.upgrade() {
                        let a = action.clone();
                        s.do_after(move || a(), 0.0, Phase::Update).unwrap();
                    }
                },
                1.0,
                0.0,
                -1.0,
                Phase::Update,
            )
            .unwrap();

        scheduler.tick(Phase::Update, 1.0).unwrap();
        assert_eq!(count.get(), 0, "child not advanced in the pass that created it");
        assert_eq!(scheduler.len(Phase::Update), 2);

        parent.kill();
        scheduler.tick(Phase::Update, 0.5).unwrap();
        assert_eq!(count.get(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_restart_after_eviction_reschedules() {
        let scheduler = Scheduler::default();
        let (count, action) = counter();
        let task = scheduler.do_after(action, 0.5, Phase::LateUpdate).unwrap();

        scheduler.frame(1.0).unwrap();
        assert_eq!(count.get(), 1);
        assert!(!task.is_scheduled());

        task.restart().unwrap();
        assert!(task.is_scheduled());
        assert_eq!(scheduler.len(Phase::LateUpdate), 1);
        scheduler.frame(1.0).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_restart_after_eviction_counts_one_live_task() {
        let stats = Rc::new(LifecycleStats::new());
        let subs: Vec<Rc<dyn Subscribe>> = vec![stats.clone()];
        let scheduler = Scheduler::builder(Config::default())
            .with_subscribers(subs)
            .build();
        let task = scheduler.do_after(|| {}, 0.0, Phase::Update).unwrap();
        scheduler.tick(Phase::Update, 0.1).unwrap();
        assert!(!task.is_scheduled());
        assert_eq!(stats.snapshot().live(), 0);

        task.restart().unwrap();
        let snap = stats.snapshot();
        assert_eq!(snap.scheduled, 1);
        assert_eq!(snap.restarted, 1);
        assert_eq!(snap.live(), 1);
        assert_eq!(scheduler.collection(Phase::Update).live_count(), 1);
    }

    #[test]
    fn test_restart_without_scheduler_is_detached() {
        let scheduler = Scheduler::default();
        let task = scheduler.do_after(|| {}, 0.0, Phase::Update).unwrap();
        scheduler.tick(Phase::Update, 0.1).unwrap();
        drop(scheduler);

        assert_eq!(task.restart(), Err(ScheduleError::Detached));
        assert!(task.is_done());
    }

    #[test]
    fn test_dispose_kills_everything() {
        let rec = Rc::new(Recorder(RefCell::new(Vec::new())));
        let subs: Vec<Rc<dyn Subscribe>> = vec![rec.clone()];
        let scheduler = Scheduler::builder(Config::default())
            .with_subscribers(subs)
            .build();
        let kills = Rc::new(Cell::new(0));
        let mut tasks = Vec::new();
        for phase in Phase::ALL {
            let t = scheduler.do_repeating(|| {}, 1.0, 0.0, -1.0, phase).unwrap();
            let k = kills.clone();
            t.on_kill(move |_| k.set(k.get() + 1));
            tasks.push(t);
        }

        assert_eq!(scheduler.dispose(), 3);
        assert_eq!(kills.get(), 3);
        assert!(scheduler.is_empty());
        assert!(tasks.iter().all(|t| t.state() == TaskState::Killed && !t.is_scheduled()));
        assert_eq!(rec.0.borrow().last(), Some(&EventKind::SchedulerDisposed));
    }
}
