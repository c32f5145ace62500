//! # Tick phases and the tick payload.
//!
//! A host advances the scheduler in up to three stages per frame:
//! ```text
//! frame N:  Update(dt) ──► LateUpdate(dt)      FixedUpdate(fixed_dt) × k
//! ```
//! Each stage owns its own task collection; a task lives in exactly one of them.

use std::fmt;

/// Update stage a task is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Per-frame stage (default).
    #[default]
    Update,
    /// Post-frame stage, after every `Update` of the same frame.
    LateUpdate,
    /// Fixed-step stage (physics-style), driven with a constant delta.
    FixedUpdate,
}

impl Phase {
    /// All phases, in per-frame dispatch order.
    pub const ALL: [Phase; 3] = [Phase::Update, Phase::LateUpdate, Phase::FixedUpdate];

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Phase::Update => "update",
            Phase::LateUpdate => "late_update",
            Phase::FixedUpdate => "fixed_update",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Phase::Update => 0,
            Phase::LateUpdate => 1,
            Phase::FixedUpdate => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One tick delivered by a [`TickSource`](crate::TickSource).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Stage being advanced.
    pub phase: Phase,
    /// Seconds elapsed since the previous tick of this phase (`>= 0`).
    pub delta: f32,
}

impl Tick {
    /// Creates a tick for `phase` carrying `delta` seconds.
    pub fn new(phase: Phase, delta: f32) -> Self {
        Self { phase, delta }
    }

    /// Shorthand for an [`Phase::Update`] tick.
    pub fn update(delta: f32) -> Self {
        Self::new(Phase::Update, delta)
    }
}
