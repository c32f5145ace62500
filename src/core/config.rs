//! # Scheduler configuration.
//!
//! Provides [`Config`], the per-phase sizing of task collections, and
//! [`CollectionConfig`], the sizing of one collection.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::new(config)` / `Scheduler::builder(config)`
//! 2. **Standalone collections**: `TaskCollection::new(phase, config, bus)`
//!
//! ## Sentinel values
//! - `max_capacity = 0` → no ceiling (see [`CollectionConfig::max_capacity_resolved`])
//! - `growth_step = 0` → treated as 1 (see [`CollectionConfig::growth_step_clamped`])

use crate::ticks::Phase;

/// Sizing of one task collection.
///
/// ## Field semantics
/// - `initial_capacity`: slots reserved up front (clamped to the ceiling)
/// - `growth_step`: slots added each time the collection is full (min 1)
/// - `max_capacity`: hard ceiling; adding past it drops the task (`0` = none)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Slots reserved when the collection is created.
    pub initial_capacity: usize,

    /// Slots added on each growth.
    ///
    /// Growth never goes past `max_capacity`; the last step may be partial.
    pub growth_step: usize,

    /// Hard maximum number of registered tasks.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = the `n + 1`-th concurrent task is dropped with a warning
    pub max_capacity: usize,
}

impl CollectionConfig {
    /// Creates a config with explicit values.
    pub const fn new(initial_capacity: usize, growth_step: usize, max_capacity: usize) -> Self {
        Self {
            initial_capacity,
            growth_step,
            max_capacity,
        }
    }

    /// Returns the growth step clamped to a minimum of 1.
    #[inline]
    pub fn growth_step_clamped(&self) -> usize {
        self.growth_step.max(1)
    }

    /// Returns the ceiling with the `0` sentinel resolved to `usize::MAX`.
    #[inline]
    pub fn max_capacity_resolved(&self) -> usize {
        if self.max_capacity == 0 {
            usize::MAX
        } else {
            self.max_capacity
        }
    }

    /// Returns the initial capacity clamped to the ceiling.
    #[inline]
    pub fn initial_capacity_clamped(&self) -> usize {
        self.initial_capacity.min(self.max_capacity_resolved())
    }
}

impl Default for CollectionConfig {
    /// `initial = 0`, `growth_step = 16`, `max = 4096`.
    fn default() -> Self {
        Self::new(0, 16, 4096)
    }
}

/// Configuration of a [`Scheduler`](crate::Scheduler): one [`CollectionConfig`]
/// per [`Phase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Sizing of the [`Phase::Update`] collection.
    pub update: CollectionConfig,
    /// Sizing of the [`Phase::LateUpdate`] collection.
    pub late_update: CollectionConfig,
    /// Sizing of the [`Phase::FixedUpdate`] collection.
    pub fixed_update: CollectionConfig,
}

impl Config {
    /// Returns the collection config of `phase`.
    pub fn collection(&self, phase: Phase) -> CollectionConfig {
        match phase {
            Phase::Update => self.update,
            Phase::LateUpdate => self.late_update,
            Phase::FixedUpdate => self.fixed_update,
        }
    }

    /// Replaces the collection config of `phase`.
    pub fn with_collection(mut self, phase: Phase, cfg: CollectionConfig) -> Self {
        match phase {
            Phase::Update => self.update = cfg,
            Phase::LateUpdate => self.late_update = cfg,
            Phase::FixedUpdate => self.fixed_update = cfg,
        }
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `update = 64 / +64 / max 16384` (most tasks live here)
    /// - `late_update = 0 / +16 / max 4096` (allocated on first use)
    /// - `fixed_update = 0 / +16 / max 4096` (allocated on first use)
    fn default() -> Self {
        Self {
            update: CollectionConfig::new(64, 64, 16_384),
            late_update: CollectionConfig::default(),
            fixed_update: CollectionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_resolve() {
        let cfg = CollectionConfig::new(10, 0, 0);
        assert_eq!(cfg.growth_step_clamped(), 1);
        assert_eq!(cfg.max_capacity_resolved(), usize::MAX);
        assert_eq!(cfg.initial_capacity_clamped(), 10);

        let cfg = CollectionConfig::new(100, 8, 32);
        assert_eq!(cfg.initial_capacity_clamped(), 32);
    }

    #[test]
    fn test_per_phase_lookup() {
        let small = CollectionConfig::new(1, 1, 2);
        let cfg = Config::default().with_collection(Phase::FixedUpdate, small);
        assert_eq!(cfg.collection(Phase::FixedUpdate), small);
        assert_eq!(cfg.collection(Phase::Update).max_capacity, 16_384);
    }
}
