//! # tickvisor
//!
//! **Tickvisor** is a lightweight, frame-driven task scheduler for Rust.
//!
//! Callers register deferred, repeating or conditional units of work ("tasks") that
//! are advanced once per external tick (frame) and fire lifecycle callbacks, without
//! threads, timers or coroutine suspension. It is meant for game loops, simulations
//! and any host that already owns a frame loop.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!    host frame loop / FrameClock / ScriptedTicks
//!                  │ tick(phase, dt)
//!                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (host-owned context object)                            │
//! │  - global pause switch                                            │
//! │  - factories: do_after, do_repeating, do_until, do_when, ...      │
//! │  - Bus (synchronous fan-out to subscribers)                       │
//! └──────┬──────────────────────┬─────────────────────────┬───────────┘
//!        ▼                      ▼                         ▼
//! ┌───────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │ TaskCollection│     │  TaskCollection  │     │  TaskCollection   │
//! │   (Update)    │     │   (LateUpdate)   │     │   (FixedUpdate)   │
//! └──┬────────────┘     └──┬───────────────┘     └──┬────────────────┘
//!    │ advance(dt)         │                        │
//!    ▼                     ▼                        ▼
//!  TaskHandle ...        TaskHandle ...          TaskHandle ...
//!    │ state machine: WaitingForDelay → Active → Completed | Killed | TimedOut
//!    │ callbacks: on_start → on_update → on_complete | on_kill | on_timeout
//!    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Bus ──► SubscriberSet ──► LogWriter / LifecycleStats / custom    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### One pass
//! ```text
//! Scheduler::tick(phase, dt)
//!   ├─► rejected if dt < 0 or not finite (InvalidTick)
//!   ├─► dropped while paused
//!   └─► collection.advance(dt)
//!          ├─ every live task advanced exactly once
//!          ├─ tasks added by callbacks wait for the next pass
//!          └─ finished tasks reclaimed when the pass ends
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Scheduling**    | Factories per task variant, dispatch, global pause            | [`Scheduler`], [`SchedulerBuilder`]         |
//! | **Tasks**         | State machine, control, progress, lifecycle callbacks         | [`TaskHandle`], [`TaskSettings`]            |
//! | **Collections**   | Per-phase storage with growth policy and mid-pass safety      | [`TaskCollection`]                          |
//! | **Ticks**         | Tick contract, scripted ticks, tokio frame clock              | [`TickSource`], [`ScriptedTicks`], [`FrameClock`] |
//! | **Subscriber API**| Hook into scheduler events (logging, counters, custom)        | [`Subscribe`], [`LifecycleStats`]           |
//! | **Errors**        | Typed scheduling errors                                       | [`ScheduleError`]                           |
//! | **Configuration** | Per-phase collection sizing                                   | [`Config`], [`CollectionConfig`]            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tickvisor::{Config, LifecycleStats, Phase, Scheduler, ScriptedTicks, Subscribe};
//!
//! let stats = Rc::new(LifecycleStats::new());
//! let subs: Vec<Rc<dyn Subscribe>> = vec![stats.clone()];
//! let scheduler = Scheduler::builder(Config::default())
//!     .with_subscribers(subs)
//!     .build();
//!
//! // Fire every 0.5s until three shots went off.
//! let shots = Rc::new(Cell::new(0));
//! let s = shots.clone();
//! let volley = scheduler
//!     .do_times(move || s.set(s.get() + 1), 3, 0.5, 0.0, -1.0, Phase::Update)
//!     .unwrap();
//! volley.on_complete(|task| println!("volley {} done", task.id()));
//!
//! scheduler.drive(&mut ScriptedTicks::updates([0.25; 8])).unwrap();
//!
//! assert_eq!(shots.get(), 3);
//! assert!(volley.is_done());
//! assert_eq!(stats.snapshot().completed, 1);
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;
mod ticks;

// ---- Public re-exports ----

pub use crate::core::{
    CollectionConfig, Config, Scheduler, SchedulerBuilder, TaskCollection, WeakScheduler,
};
pub use error::ScheduleError;
pub use events::{Bus, Event, EventKind};
pub use subscribers::{LifecycleStats, StatsSnapshot, Subscribe, SubscriberSet};
pub use tasks::{
    Action, Callback, Condition, LifecycleEvent, SubscriptionId, TaskHandle, TaskId,
    TaskSettings, TaskSettingsBuilder, TaskState, TaskVariant,
};
pub use ticks::{
    FrameClock, Phase, ScriptedTicks, ShutdownSignal, Tick, TickSource, wait_for_shutdown_signal,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
