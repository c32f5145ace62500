//! # Tick source contract.
//!
//! The scheduler never produces frames itself. Something in the host (a game loop,
//! an engine callback, [`FrameClock`](crate::FrameClock), a test script) hands it
//! `(phase, delta)` pairs through [`TickSource`], or calls
//! [`Scheduler::tick`](crate::Scheduler::tick) directly.

use std::collections::VecDeque;

use super::phase::{Phase, Tick};

/// Supplier of ticks consumed by [`Scheduler::drive`](crate::Scheduler::drive).
pub trait TickSource {
    /// Returns the next pending tick, or `None` when the source has nothing to deliver now.
    fn next_tick(&mut self) -> Option<Tick>;
}

/// Queue-backed tick source for replays and tests.
///
/// ## Example
/// ```rust
/// use tickvisor::{Phase, ScriptedTicks, TickSource};
///
/// let mut ticks = ScriptedTicks::updates([1.0, 1.0, 0.5]).then(Phase::FixedUpdate, 0.02);
/// assert_eq!(ticks.remaining(), 4);
/// assert_eq!(ticks.next_tick().map(|t| t.delta), Some(1.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedTicks {
    queue: VecDeque<Tick>,
}

impl ScriptedTicks {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a script of [`Phase::Update`] ticks with the given deltas.
    pub fn updates(deltas: impl IntoIterator<Item = f32>) -> Self {
        Self {
            queue: deltas.into_iter().map(Tick::update).collect(),
        }
    }

    /// Appends one tick.
    pub fn then(mut self, phase: Phase, delta: f32) -> Self {
        self.push(Tick::new(phase, delta));
        self
    }

    /// Appends `count` identical ticks.
    pub fn repeat(mut self, phase: Phase, delta: f32, count: usize) -> Self {
        for _ in 0..count {
            self.push(Tick::new(phase, delta));
        }
        self
    }

    /// Appends one tick in place.
    pub fn push(&mut self, tick: Tick) {
        self.queue.push_back(tick);
    }

    /// Number of ticks not yet delivered.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl TickSource for ScriptedTicks {
    fn next_tick(&mut self) -> Option<Tick> {
        self.queue.pop_front()
    }
}
