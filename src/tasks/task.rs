//! # Task state machine and the shared task handle.
//!
//! A task is a schedulable unit built from [`TaskSettings`]. It is shared through a
//! [`TaskHandle`] (an `Rc`): the caller keeps one clone for control and inspection,
//! the [`TaskCollection`](crate::TaskCollection) of its phase keeps another while the
//! task is registered.
//!
//! ## Lifecycle
//! ```text
//!                 delay elapsed                 action done / condition true
//! WaitingForDelay ─────────────► Active ───┬──────────────────────────────► Completed
//!        │                           │     ├── elapsed_since_start > max ─► TimedOut
//!        └──────────── kill() ───────┴─────┴── kill() ────────────────────► Killed
//! ```
//! Paused is an orthogonal flag: a paused task ignores advances and keeps all timers.
//!
//! ## One advance
//! ```text
//! advance(dt)
//!   ├─ paused or done?               → no-op
//!   ├─ elapsed_since_creation += dt
//!   ├─ WaitingForDelay and delay elapsed (delay <= 0 or elapsed > delay)
//!   │     → Active, elapsed_since_start = 0, fire Start, continue with the part of dt past the delay
//!   ├─ Active step:
//!   │     elapsed_since_start > max? → TimedOut (action not invoked)
//!   │     else variant update        → may invoke the action, may complete
//!   │     elapsed_since_start += active_dt
//!   ├─ fire Update
//!   └─ fire Complete / Timeout raised by this advance
//! ```
//!
//! Timers are kept as `f64`, so tiny intervals against large deltas stay exact
//! enough to terminate.
//!
//! ## Rules
//! - `is_done` is one-way; only [`TaskHandle::restart`] resets it.
//! - `kill()` / `complete()` on a finished task are no-ops.
//! - If an action or callback kills, completes or restarts the task mid-advance,
//!   the variant update stops; `Update` still fires for that advance.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tracing::trace;

use crate::core::TaskCollection;
use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::ticks::Phase;

use super::callbacks::{Callbacks, LifecycleEvent, SubscriptionId};
use super::settings::{Condition, TaskKind, TaskSettings, TaskVariant, Until};

/// Global counter for task ids.
static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created; the start delay has not elapsed yet.
    WaitingForDelay,
    /// Delay elapsed; the variant update runs on every advance.
    Active,
    /// Finished normally (action invoked).
    Completed,
    /// Stopped by `kill()` (action not invoked).
    Killed,
    /// Ran longer than its max duration (action not invoked).
    TimedOut,
}

impl TaskState {
    /// True for `Completed`, `Killed` and `TimedOut`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Killed | TaskState::TimedOut
        )
    }
}

struct TaskInner {
    id: TaskId,
    settings: TaskSettings,
    bus: Bus,

    state: Cell<TaskState>,
    paused: Cell<bool>,
    since_creation: Cell<f64>,
    since_start: Cell<f64>,
    /// Interval-local accumulator of repeating variants.
    since_fire: Cell<f64>,
    frames: Cell<u32>,
    fires: Cell<u32>,
    /// Bumped by `restart()`; lets an advance notice a restart from inside a callback.
    generation: Cell<u64>,

    callbacks: Callbacks,

    /// Collection the task was scheduled into (kept after eviction for `restart`).
    home: RefCell<Option<Weak<TaskCollection>>>,
    registered: Cell<bool>,
}

/// Shared handle to a task.
///
/// Cloning is cheap and every clone refers to the same task. Handles are `!Send`:
/// tasks live on the thread that ticks the scheduler.
///
/// ## Example
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tickvisor::{TaskHandle, TaskSettings, TaskState};
///
/// let fired = Rc::new(Cell::new(0));
/// let f = fired.clone();
/// let task = TaskHandle::detached(
///     TaskSettings::builder(move || f.set(f.get() + 1)).start_after(1.0).build().unwrap(),
/// );
///
/// task.advance(0.5);
/// assert_eq!(task.state(), TaskState::WaitingForDelay);
/// task.advance(0.75);
/// assert!(task.is_done());
/// assert_eq!(fired.get(), 1);
/// ```
#[derive(Clone)]
pub struct TaskHandle(Rc<TaskInner>);

impl TaskHandle {
    /// Sentinel returned by [`progress`](Self::progress) for variants without a
    /// meaningful notion of progress (condition-based tasks).
    pub const NO_PROGRESS: f32 = -1.0;

    pub(crate) fn new(settings: TaskSettings, bus: Bus) -> Self {
        Self(Rc::new(TaskInner {
            id: TaskId::next(),
            settings,
            bus,
            state: Cell::new(TaskState::WaitingForDelay),
            paused: Cell::new(false),
            since_creation: Cell::new(0.0),
            since_start: Cell::new(0.0),
            since_fire: Cell::new(0.0),
            frames: Cell::new(0),
            fires: Cell::new(0),
            generation: Cell::new(0),
            callbacks: Callbacks::default(),
            home: RefCell::new(None),
            registered: Cell::new(false),
        }))
    }

    /// Creates a task that belongs to no collection.
    ///
    /// The caller drives it with [`advance`](Self::advance); it emits no events.
    pub fn detached(settings: TaskSettings) -> Self {
        Self::new(settings, Bus::default())
    }

    // ---------------------------
    // Inspection
    // ---------------------------

    /// Process-unique id.
    pub fn id(&self) -> TaskId {
        self.0.id
    }

    /// Diagnostic name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.0.settings.name()
    }

    /// Settings the task was built from.
    pub fn settings(&self) -> &TaskSettings {
        &self.0.settings
    }

    /// Variant tag.
    pub fn variant(&self) -> TaskVariant {
        self.0.settings.variant()
    }

    /// Phase whose collection drives the task.
    pub fn phase(&self) -> Phase {
        self.0.settings.phase()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.0.state.get()
    }

    /// True once the task completed, was killed or timed out.
    pub fn is_done(&self) -> bool {
        self.0.state.get().is_terminal()
    }

    /// True while the task ignores advances.
    pub fn is_paused(&self) -> bool {
        self.0.paused.get()
    }

    /// True while the task occupies a slot (or pending slot) of a collection.
    ///
    /// `false` for a task dropped at the capacity ceiling and for finished tasks
    /// whose slot was reclaimed.
    pub fn is_scheduled(&self) -> bool {
        self.0.registered.get()
    }

    /// Seconds advanced since creation (paused ticks excluded).
    pub fn elapsed_since_creation(&self) -> f32 {
        self.0.since_creation.get() as f32
    }

    /// Seconds advanced since the delay elapsed (0 while waiting).
    pub fn elapsed_since_start(&self) -> f32 {
        self.0.since_start.get() as f32
    }

    /// Active ticks counted so far (frame-counted variant only; 0 otherwise).
    pub fn elapsed_frames(&self) -> u32 {
        self.0.frames.get()
    }

    /// Number of times the action has been invoked.
    pub fn fire_count(&self) -> u32 {
        self.0.fires.get()
    }

    /// Variant-specific progress, roughly in `[0, 1]`.
    ///
    /// - `Do`: fraction of the delay elapsed (1 once active when there is no delay)
    /// - `Repeating` / `RepeatUntil`: fraction of the current interval elapsed
    ///   (1 while active with a zero interval)
    /// - `AfterFrames`: fraction of the frame target reached
    /// - `OnCondition`: always [`TaskHandle::NO_PROGRESS`]; do not rely on it
    pub fn progress(&self) -> f32 {
        let inner = &*self.0;
        let started = inner.state.get() != TaskState::WaitingForDelay;
        match &inner.settings.kind {
            TaskKind::Do => {
                let delay = inner.settings.delay();
                if delay <= 0.0 {
                    if started { 1.0 } else { 0.0 }
                } else {
                    (inner.since_creation.get() / f64::from(delay)).clamp(0.0, 1.0) as f32
                }
            }
            TaskKind::Repeating { interval } | TaskKind::RepeatUntil { interval, .. } => {
                if *interval <= 0.0 {
                    if started { 1.0 } else { 0.0 }
                } else {
                    (inner.since_fire.get() / f64::from(*interval)).clamp(0.0, 1.0) as f32
                }
            }
            TaskKind::AfterFrames { target } => {
                (inner.frames.get() as f32 / *target as f32).min(1.0)
            }
            TaskKind::OnCondition { .. } => {
                trace!(task = %inner.id, "progress requested for a condition task");
                Self::NO_PROGRESS
            }
        }
    }

    /// True if both handles refer to the same task.
    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ---------------------------
    // Control
    // ---------------------------

    /// Freezes the task: advances are ignored and timers keep their values.
    pub fn pause(&self) {
        self.0.paused.set(true);
    }

    /// Undoes [`pause`](Self::pause).
    pub fn resume(&self) {
        self.0.paused.set(false);
    }

    /// Stops the task without invoking the action; fires `on_kill`.
    ///
    /// No-op if the task is already done.
    pub fn kill(&self) {
        if self.is_done() {
            return;
        }
        self.0.state.set(TaskState::Killed);
        self.raise(LifecycleEvent::Kill);
    }

    /// Finishes the task now: invokes the action and fires `on_complete`.
    ///
    /// No-op if the task is already done.
    pub fn complete(&self) {
        if self.is_done() {
            return;
        }
        let generation = self.0.generation.get();
        if let Some(event) = self.finish_completed(true, generation) {
            self.raise(event);
        }
    }

    /// Resets every counter and the done flag as if the task had just been created.
    ///
    /// Subscriptions are kept. If the task's slot was already reclaimed, the task is
    /// registered again in the collection it was originally scheduled into. A
    /// detached task (see [`TaskHandle::detached`]) is only reset.
    ///
    /// ### Errors
    /// - [`ScheduleError::Detached`] if the original collection no longer exists.
    /// - [`ScheduleError::CapacityExceeded`] if re-registration hits the ceiling;
    ///   the task is left untouched.
    pub fn restart(&self) -> Result<(), ScheduleError> {
        if !self.0.registered.get() {
            let home = self.0.home.borrow().clone();
            if let Some(home) = home {
                let collection = home.upgrade().ok_or(ScheduleError::Detached)?;
                collection.readmit(self.clone())?;
            }
        }

        let inner = &*self.0;
        inner.generation.set(inner.generation.get() + 1);
        inner.state.set(TaskState::WaitingForDelay);
        inner.paused.set(false);
        inner.since_creation.set(0.0);
        inner.since_start.set(0.0);
        inner.since_fire.set(0.0);
        inner.frames.set(0);
        inner.fires.set(0);

        trace!(task = %inner.id, "restarted");
        self.publish(EventKind::TaskRestarted);
        Ok(())
    }

    // ---------------------------
    // Subscriptions
    // ---------------------------

    /// Registers a callback for `event`, returning an id for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(
        &self,
        event: LifecycleEvent,
        callback: impl Fn(&TaskHandle) + 'static,
    ) -> SubscriptionId {
        self.0.callbacks.subscribe(event, Rc::new(callback))
    }

    /// Removes a callback. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.callbacks.unsubscribe(id)
    }

    /// Number of callbacks currently registered for `event`.
    pub fn subscriber_count(&self, event: LifecycleEvent) -> usize {
        self.0.callbacks.len(event)
    }

    /// Registers a callback fired when the delay elapses.
    pub fn on_start(&self, callback: impl Fn(&TaskHandle) + 'static) -> &Self {
        self.subscribe(LifecycleEvent::Start, callback);
        self
    }

    /// Registers a callback fired on every advance of the live task.
    pub fn on_update(&self, callback: impl Fn(&TaskHandle) + 'static) -> &Self {
        self.subscribe(LifecycleEvent::Update, callback);
        self
    }

    /// Registers a callback fired when the task completes.
    pub fn on_complete(&self, callback: impl Fn(&TaskHandle) + 'static) -> &Self {
        self.subscribe(LifecycleEvent::Complete, callback);
        self
    }

    /// Registers a callback fired when the task is killed.
    pub fn on_kill(&self, callback: impl Fn(&TaskHandle) + 'static) -> &Self {
        self.subscribe(LifecycleEvent::Kill, callback);
        self
    }

    /// Registers a callback fired when the task times out.
    pub fn on_timeout(&self, callback: impl Fn(&TaskHandle) + 'static) -> &Self {
        self.subscribe(LifecycleEvent::Timeout, callback);
        self
    }

    // ---------------------------
    // Advance
    // ---------------------------

    /// Advances the task by `delta` seconds.
    ///
    /// Collections call this once per pass; call it directly only for
    /// [detached](Self::detached) tasks; a scheduled task advanced by hand is
    /// advanced twice per tick.
    pub fn advance(&self, delta: f32) {
        let inner = &*self.0;
        if inner.paused.get() || self.is_done() {
            return;
        }
        let generation = inner.generation.get();

        let delta = f64::from(delta);
        let since_creation = inner.since_creation.get() + delta;
        inner.since_creation.set(since_creation);

        let active_delta = match inner.state.get() {
            TaskState::WaitingForDelay => {
                let delay = f64::from(inner.settings.delay());
                if delay <= 0.0 || since_creation > delay {
                    inner.state.set(TaskState::Active);
                    inner.since_start.set(0.0);
                    trace!(task = %inner.id, "started");
                    self.publish(EventKind::TaskStarted);
                    inner.callbacks.fire(LifecycleEvent::Start, self);
                    Some((since_creation - delay).min(delta).max(0.0))
                } else {
                    None
                }
            }
            _ => Some(delta),
        };

        // `on_start` may already have ended or restarted the task
        let raised = match active_delta {
            Some(dt) if !self.interrupted(generation) => self.step_active(dt, generation),
            _ => None,
        };

        inner.callbacks.fire(LifecycleEvent::Update, self);

        if let Some(event) = raised {
            if inner.generation.get() == generation {
                self.raise(event);
            }
        }
    }

    /// Runs the active part of an advance. Returns the terminal event to raise
    /// once `Update` has fired, if the task finished.
    ///
    /// The timeout is measured against the active time accumulated by previous
    /// advances; this advance's share is added after the variant update.
    fn step_active(&self, dt: f64, generation: u64) -> Option<LifecycleEvent> {
        let inner = &*self.0;
        let since_start = inner.since_start.get();

        if let Some(limit) = inner.settings.timeout() {
            if since_start > f64::from(limit) {
                inner.state.set(TaskState::TimedOut);
                return Some(LifecycleEvent::Timeout);
            }
        }

        let raised = self.update_variant(dt, generation);
        if inner.generation.get() == generation {
            inner.since_start.set(since_start + dt);
        }
        raised
    }

    fn update_variant(&self, dt: f64, generation: u64) -> Option<LifecycleEvent> {
        let inner = &*self.0;
        match &inner.settings.kind {
            TaskKind::Do => self.finish_completed(true, generation),
            TaskKind::Repeating { interval } => {
                self.fire_due(f64::from(*interval), dt, None, generation)
            }
            TaskKind::RepeatUntil { interval, until } => {
                self.fire_due(f64::from(*interval), dt, Some(until), generation)
            }
            TaskKind::OnCondition { condition } => {
                if self.check(condition, generation)? {
                    self.finish_completed(true, generation)
                } else {
                    None
                }
            }
            TaskKind::AfterFrames { target } => {
                let frames = inner.frames.get() + 1;
                inner.frames.set(frames);
                if frames >= *target {
                    self.finish_completed(true, generation)
                } else {
                    None
                }
            }
        }
    }

    /// Fires the action for every whole interval accumulated (once per tick for a
    /// zero interval), carrying the remainder forward.
    ///
    /// The number of firings is fixed up front from the accumulator, so the loop
    /// ends even when the interval is tiny next to the accumulated time.
    ///
    /// With an `until` rule the rule is checked after each firing; if no firing
    /// happened this tick it is checked once at the end, and a `true` there fires
    /// the action one last time.
    fn fire_due(
        &self,
        interval: f64,
        dt: f64,
        until: Option<&Until>,
        generation: u64,
    ) -> Option<LifecycleEvent> {
        let inner = &*self.0;
        let mut fired = false;

        if interval <= 0.0 {
            self.invoke_action();
            if self.interrupted(generation) {
                return None;
            }
            fired = true;
        } else {
            let acc = inner.since_fire.get() + dt;
            inner.since_fire.set(acc);
            let due = (acc / interval).floor() as u64;
            for n in 1..=due {
                inner.since_fire.set((acc - n as f64 * interval).max(0.0));
                self.invoke_action();
                if self.interrupted(generation) {
                    return None;
                }
                fired = true;
                if let Some(until) = until {
                    if self.until_met(until, generation)? {
                        return self.finish_completed(false, generation);
                    }
                }
            }
        }

        let until = until?;
        if interval <= 0.0 && self.until_met(until, generation)? {
            return self.finish_completed(false, generation);
        }
        if !fired && self.until_met(until, generation)? {
            return self.finish_completed(true, generation);
        }
        None
    }

    /// Evaluates the stop rule; `None` if the evaluation interrupted the task.
    fn until_met(&self, until: &Until, generation: u64) -> Option<bool> {
        match until {
            Until::Condition(condition) => self.check(condition, generation),
            Until::Times(times) => Some(self.0.fires.get() >= *times),
        }
    }

    /// Evaluates a predicate; `None` if the predicate itself killed/restarted the task.
    fn check(&self, condition: &Condition, generation: u64) -> Option<bool> {
        let met = condition();
        if self.interrupted(generation) {
            None
        } else {
            Some(met)
        }
    }

    /// Marks the task completed, optionally invoking the action first.
    ///
    /// Returns the event to raise, or `None` if the action restarted the task.
    fn finish_completed(&self, invoke: bool, generation: u64) -> Option<LifecycleEvent> {
        self.0.state.set(TaskState::Completed);
        if invoke {
            self.invoke_action();
        }
        if self.0.generation.get() == generation {
            Some(LifecycleEvent::Complete)
        } else {
            None
        }
    }

    fn invoke_action(&self) {
        let inner = &*self.0;
        inner.fires.set(inner.fires.get() + 1);
        (inner.settings.action)();
    }

    /// True if something terminated or restarted the task since `generation` was read.
    #[inline]
    fn interrupted(&self, generation: u64) -> bool {
        self.is_done() || self.0.generation.get() != generation
    }

    /// Publishes the terminal event and fires its callbacks.
    fn raise(&self, event: LifecycleEvent) {
        let kind = match event {
            LifecycleEvent::Complete => EventKind::TaskCompleted,
            LifecycleEvent::Kill => EventKind::TaskKilled,
            LifecycleEvent::Timeout => EventKind::TaskTimedOut,
            LifecycleEvent::Start => EventKind::TaskStarted,
            LifecycleEvent::Update => {
                self.0.callbacks.fire(event, self);
                return;
            }
        };
        trace!(task = %self.0.id, event = kind.as_label(), "finished");
        self.publish(kind);
        self.0.callbacks.fire(event, self);
    }

    pub(crate) fn publish(&self, kind: EventKind) {
        let inner = &*self.0;
        if inner.bus.is_silent() {
            return;
        }
        inner.bus.publish(self.event(kind));
    }

    /// Builds an event pre-filled with this task's id, name and phase.
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        let inner = &*self.0;
        let ev = Event::new(kind)
            .with_task(inner.id)
            .with_phase(inner.settings.phase());
        match inner.settings.name_arc() {
            Some(name) => ev.with_name(name.clone()),
            None => ev,
        }
    }

    // ---------------------------
    // Collection bookkeeping
    // ---------------------------

    pub(crate) fn attach(&self, home: Weak<TaskCollection>) {
        *self.0.home.borrow_mut() = Some(home);
        self.0.registered.set(true);
    }

    pub(crate) fn detach(&self) {
        self.0.registered.set(false);
    }

    /// Collection the task was last scheduled into, if it still exists.
    pub(crate) fn home(&self) -> Option<Rc<TaskCollection>> {
        self.0.home.borrow().as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &*self.0;
        f.debug_struct("TaskHandle")
            .field("id", &inner.id)
            .field("name", &inner.settings.name())
            .field("variant", &inner.settings.variant())
            .field("phase", &inner.settings.phase())
            .field("state", &inner.state.get())
            .field("paused", &inner.paused.get())
            .field("elapsed_since_creation", &inner.since_creation.get())
            .field("elapsed_since_start", &inner.since_start.get())
            .finish()
    }
}
