//! # Task settings bundle.
//!
//! Defines [`TaskSettings`], the immutable configuration a task is built from:
//! action, variant (with its interval / condition / frame target), start delay,
//! max duration, phase and an optional name.
//!
//! Settings are created through [`TaskSettings::builder`] and validated by
//! [`TaskSettingsBuilder::build`]; the scheduler factories
//! ([`Scheduler::do_after`](crate::Scheduler::do_after) and friends) are thin wrappers
//! around this builder.
//!
//! ## Sentinel values
//! - `max_duration <= 0` → no timeout (see [`TaskSettings::timeout`])
//! - `interval = 0` → repeating variants fire once per active tick

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::ScheduleError;
use crate::ticks::Phase;

/// Work invoked when a task fires.
pub type Action = Rc<dyn Fn()>;

/// Predicate polled by conditional tasks.
pub type Condition = Rc<dyn Fn() -> bool>;

/// Variant tag of a task (see [`TaskHandle::variant`](crate::TaskHandle::variant)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskVariant {
    /// Fire once after a delay.
    Do,
    /// Fire every interval until killed or timed out.
    Repeating,
    /// Fire every interval until a condition holds (or a repeat count is reached).
    RepeatUntil,
    /// Fire once when a condition holds.
    OnCondition,
    /// Fire once after a number of active ticks.
    AfterFrames,
}

impl TaskVariant {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskVariant::Do => "do",
            TaskVariant::Repeating => "repeating",
            TaskVariant::RepeatUntil => "repeat_until",
            TaskVariant::OnCondition => "on_condition",
            TaskVariant::AfterFrames => "after_frames",
        }
    }
}

/// Stop rule of a [`TaskKind::RepeatUntil`] task.
#[derive(Clone)]
pub(crate) enum Until {
    /// Stop once the predicate returns `true`.
    Condition(Condition),
    /// Stop once the action has fired this many times.
    Times(u32),
}

/// Variant payload: everything variant-specific that never changes after build.
#[derive(Clone)]
pub(crate) enum TaskKind {
    Do,
    Repeating { interval: f32 },
    RepeatUntil { interval: f32, until: Until },
    OnCondition { condition: Condition },
    AfterFrames { target: u32 },
}

impl TaskKind {
    pub(crate) fn variant(&self) -> TaskVariant {
        match self {
            TaskKind::Do => TaskVariant::Do,
            TaskKind::Repeating { .. } => TaskVariant::Repeating,
            TaskKind::RepeatUntil { .. } => TaskVariant::RepeatUntil,
            TaskKind::OnCondition { .. } => TaskVariant::OnCondition,
            TaskKind::AfterFrames { .. } => TaskVariant::AfterFrames,
        }
    }
}

/// Immutable construction parameters of a task.
///
/// Bundles together:
/// - The action ([`Action`])
/// - The variant with its interval / condition / frame target
/// - The start delay and max duration, in seconds
/// - The phase whose collection will drive it
/// - An optional name used in diagnostics
///
/// ## Example
/// ```rust
/// use tickvisor::{Phase, TaskSettings, TaskVariant};
///
/// let settings = TaskSettings::builder(|| println!("tick"))
///     .repeating(0.5)
///     .start_after(1.0)
///     .max_duration(10.0)
///     .phase(Phase::FixedUpdate)
///     .name("heartbeat")
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.variant(), TaskVariant::Repeating);
/// assert_eq!(settings.timeout(), Some(10.0));
/// assert_eq!(settings.interval(), Some(0.5));
/// ```
#[derive(Clone)]
pub struct TaskSettings {
    pub(crate) action: Action,
    pub(crate) kind: TaskKind,
    delay: f32,
    max_duration: f32,
    phase: Phase,
    name: Option<Arc<str>>,
}

impl TaskSettings {
    /// Creates a builder for a task that runs `action`.
    ///
    /// The builder starts as a fire-once task with no delay, no timeout, on
    /// [`Phase::Update`].
    pub fn builder(action: impl Fn() + 'static) -> TaskSettingsBuilder {
        TaskSettingsBuilder::new(Rc::new(action))
    }

    /// Returns the variant tag.
    pub fn variant(&self) -> TaskVariant {
        self.kind.variant()
    }

    /// Returns the start delay in seconds.
    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// Returns the raw max duration (`<= 0` means none).
    pub fn max_duration(&self) -> f32 {
        self.max_duration
    }

    /// Returns the max duration as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(s)` → the task times out once more than `s` active seconds have passed
    #[inline]
    pub fn timeout(&self) -> Option<f32> {
        if self.max_duration > 0.0 {
            Some(self.max_duration)
        } else {
            None
        }
    }

    /// Returns the firing interval for repeating variants.
    pub fn interval(&self) -> Option<f32> {
        match &self.kind {
            TaskKind::Repeating { interval } | TaskKind::RepeatUntil { interval, .. } => {
                Some(*interval)
            }
            _ => None,
        }
    }

    /// Returns the frame target for [`TaskVariant::AfterFrames`].
    pub fn target_frames(&self) -> Option<u32> {
        match self.kind {
            TaskKind::AfterFrames { target } => Some(target),
            _ => None,
        }
    }

    /// Returns the phase whose collection drives the task.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the diagnostic name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn name_arc(&self) -> Option<&Arc<str>> {
        self.name.as_ref()
    }
}

impl fmt::Debug for TaskSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSettings")
            .field("variant", &self.variant())
            .field("delay", &self.delay)
            .field("max_duration", &self.max_duration)
            .field("interval", &self.interval())
            .field("target_frames", &self.target_frames())
            .field("phase", &self.phase)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TaskSettings`] with fluent API.
#[derive(Clone)]
pub struct TaskSettingsBuilder {
    action: Action,
    kind: TaskKind,
    delay: f32,
    max_duration: f32,
    phase: Phase,
    name: Option<Arc<str>>,
}

impl TaskSettingsBuilder {
    fn new(action: Action) -> Self {
        Self {
            action,
            kind: TaskKind::Do,
            delay: 0.0,
            max_duration: -1.0,
            phase: Phase::Update,
            name: None,
        }
    }

    /// Fire once, as soon as the delay has elapsed (default).
    pub fn fire_once(mut self) -> Self {
        self.kind = TaskKind::Do;
        self
    }

    /// Fire every `interval` seconds until killed or timed out.
    pub fn repeating(mut self, interval: f32) -> Self {
        self.kind = TaskKind::Repeating { interval };
        self
    }

    /// Fire every `interval` seconds until `condition` returns `true`.
    pub fn until(mut self, condition: impl Fn() -> bool + 'static, interval: f32) -> Self {
        self.kind = TaskKind::RepeatUntil {
            interval,
            until: Until::Condition(Rc::new(condition)),
        };
        self
    }

    /// Fire every `interval` seconds, `times` times in total.
    pub fn times(mut self, times: u32, interval: f32) -> Self {
        self.kind = TaskKind::RepeatUntil {
            interval,
            until: Until::Times(times),
        };
        self
    }

    /// Fire once, on the first active tick where `condition` returns `true`.
    pub fn when(mut self, condition: impl Fn() -> bool + 'static) -> Self {
        self.kind = TaskKind::OnCondition {
            condition: Rc::new(condition),
        };
        self
    }

    /// Fire once after `frames` active ticks.
    pub fn after_frames(mut self, frames: u32) -> Self {
        self.kind = TaskKind::AfterFrames { target: frames };
        self
    }

    /// Seconds to wait before the task becomes active.
    pub fn start_after(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Active seconds after which the task times out (`<= 0` = never).
    pub fn max_duration(mut self, seconds: f32) -> Self {
        self.max_duration = seconds;
        self
    }

    /// Phase whose collection drives the task.
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Diagnostic name carried by events.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validates and freezes the settings.
    ///
    /// ### Errors
    /// [`ScheduleError::InvalidSettings`] when:
    /// - the delay is negative or not finite;
    /// - the max duration is NaN or infinite;
    /// - an interval is negative or not finite;
    /// - a frame target or repeat count is zero.
    pub fn build(self) -> Result<TaskSettings, ScheduleError> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(ScheduleError::invalid(
                "delay",
                format!("must be a finite value >= 0, got {}", self.delay),
            ));
        }
        if !self.max_duration.is_finite() {
            return Err(ScheduleError::invalid(
                "max_duration",
                format!("must be finite, got {}", self.max_duration),
            ));
        }
        match &self.kind {
            TaskKind::Repeating { interval } | TaskKind::RepeatUntil { interval, .. }
                if !interval.is_finite() || *interval < 0.0 =>
            {
                return Err(ScheduleError::invalid(
                    "interval",
                    format!("must be a finite value >= 0, got {interval}"),
                ));
            }
            TaskKind::RepeatUntil {
                until: Until::Times(0),
                ..
            } => {
                return Err(ScheduleError::invalid("times", "must be at least 1"));
            }
            TaskKind::AfterFrames { target: 0 } => {
                return Err(ScheduleError::invalid("frames", "must be at least 1"));
            }
            _ => {}
        }

        Ok(TaskSettings {
            action: self.action,
            kind: self.kind,
            delay: self.delay,
            max_duration: self.max_duration,
            phase: self.phase,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_fire_once_on_update() {
        let settings = TaskSettings::builder(|| {}).build().unwrap();
        assert_eq!(settings.variant(), TaskVariant::Do);
        assert_eq!(settings.delay(), 0.0);
        assert_eq!(settings.timeout(), None);
        assert_eq!(settings.phase(), Phase::Update);
        assert!(settings.name().is_none());
    }

    #[test]
    fn test_non_positive_max_duration_means_no_timeout() {
        for raw in [-1.0, 0.0] {
            let settings = TaskSettings::builder(|| {})
                .max_duration(raw)
                .build()
                .unwrap();
            assert_eq!(settings.timeout(), None, "max_duration={raw}");
        }
    }

    #[test]
    fn test_rejects_negative_interval() {
        let err = TaskSettings::builder(|| {})
            .repeating(-0.5)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidSettings {
                field: "interval",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_delay_and_counts() {
        assert!(TaskSettings::builder(|| {}).start_after(-1.0).build().is_err());
        assert!(
            TaskSettings::builder(|| {})
                .start_after(f32::NAN)
                .build()
                .is_err()
        );
        assert!(TaskSettings::builder(|| {}).after_frames(0).build().is_err());
        assert!(TaskSettings::builder(|| {}).times(0, 1.0).build().is_err());
        assert!(
            TaskSettings::builder(|| {})
                .max_duration(f32::INFINITY)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_zero_interval_is_allowed() {
        let settings = TaskSettings::builder(|| {})
            .until(|| true, 0.0)
            .build()
            .unwrap();
        assert_eq!(settings.variant(), TaskVariant::RepeatUntil);
        assert_eq!(settings.interval(), Some(0.0));
    }
}
