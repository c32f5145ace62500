//! # Frame clock: a tokio-driven tick source.
//!
//! [`FrameClock`] turns wall-clock time into ticks for a [`Scheduler`]:
//!
//! ```text
//! every `frame`:
//!   dt = now - last frame
//!   Update(dt) ──► LateUpdate(dt)
//!   acc += dt
//!   while acc >= fixed_delta and steps < max_fixed_steps:
//!       FixedUpdate(fixed_delta); acc -= fixed_delta
//!   steps hit the cap → backlog dropped (acc = 0)
//! ```
//!
//! The loop stops when the stop future resolves: a [`CancellationToken`]
//! ([`FrameClock::run`]), an OS signal ([`FrameClock::run_until_signal`]) or anything
//! else ([`FrameClock::run_until`]). The stop future is polled first on every wake-up.
//!
//! The scheduler is `!Send`, so the clock runs on the current thread
//! (`#[tokio::main(flavor = "current_thread")]` or a `LocalSet`).

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::Scheduler;
use crate::error::ScheduleError;

use super::phase::Phase;
use super::shutdown::wait_for_shutdown_signal;

/// Smallest accepted frame interval.
const MIN_FRAME: Duration = Duration::from_millis(1);

/// Drives a [`Scheduler`] from a tokio interval.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame: Duration,
    fixed_delta: Option<Duration>,
    max_fixed_steps: u32,
}

impl FrameClock {
    /// Creates a clock ticking every `frame` (at least 1ms), without fixed updates.
    pub fn new(frame: Duration) -> Self {
        Self {
            frame: frame.max(MIN_FRAME),
            fixed_delta: None,
            max_fixed_steps: 8,
        }
    }

    /// Enables [`Phase::FixedUpdate`] ticks of `fixed_delta` (a zero delta disables them).
    pub fn with_fixed_delta(mut self, fixed_delta: Duration) -> Self {
        self.fixed_delta = (!fixed_delta.is_zero()).then_some(fixed_delta);
        self
    }

    /// Caps fixed ticks per frame (min 1); excess backlog is dropped.
    pub fn with_max_fixed_steps(mut self, steps: u32) -> Self {
        self.max_fixed_steps = steps.max(1);
        self
    }

    /// Frame interval.
    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Runs until `token` is cancelled. Returns the number of frames delivered.
    pub async fn run(
        &self,
        scheduler: &Scheduler,
        token: CancellationToken,
    ) -> Result<u64, ScheduleError> {
        self.run_until(scheduler, token.cancelled()).await
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows).
    ///
    /// If signal listeners cannot be registered the failure is logged and the
    /// clock stops.
    pub async fn run_until_signal(&self, scheduler: &Scheduler) -> Result<u64, ScheduleError> {
        let stop = async {
            match wait_for_shutdown_signal().await {
                Ok(signal) => info!(signal = signal.as_label(), "shutdown signal received"),
                Err(err) => error!("failed to listen for shutdown signals: {err}"),
            }
        };
        self.run_until(scheduler, stop).await
    }

    /// Runs until `stop` resolves. Returns the number of frames delivered.
    pub async fn run_until<F>(&self, scheduler: &Scheduler, stop: F) -> Result<u64, ScheduleError>
    where
        F: Future,
    {
        tokio::pin!(stop);

        let mut interval = tokio::time::interval(self.frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Instant = interval.tick().await;

        let mut acc = Duration::ZERO;
        let mut frames: u64 = 0;
        debug!(
            frame_ms = self.frame.as_millis() as u64,
            fixed_ms = self.fixed_delta.map(|d| d.as_millis() as u64),
            "frame clock started"
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break,
                now = interval.tick() => {
                    let dt = now.saturating_duration_since(last);
                    last = now;

                    scheduler.frame(dt.as_secs_f32())?;
                    if let Some(fixed) = self.fixed_delta {
                        acc += dt;
                        acc = self.run_fixed(scheduler, fixed, acc)?;
                    }
                    frames += 1;
                }
            }
        }

        debug!(frames, "frame clock stopped");
        Ok(frames)
    }

    /// Delivers the fixed ticks `acc` covers; returns the carried remainder.
    fn run_fixed(
        &self,
        scheduler: &Scheduler,
        fixed: Duration,
        mut acc: Duration,
    ) -> Result<Duration, ScheduleError> {
        let mut steps = 0;
        while acc >= fixed {
            if steps == self.max_fixed_steps {
                debug!(
                    steps,
                    dropped_ms = acc.as_millis() as u64,
                    "fixed update backlog dropped"
                );
                return Ok(Duration::ZERO);
            }
            scheduler.tick(Phase::FixedUpdate, fixed.as_secs_f32())?;
            acc -= fixed;
            steps += 1;
        }
        Ok(acc)
    }
}

impl Default for FrameClock {
    /// 60 frames per second, 50 fixed steps per second.
    fn default() -> Self {
        Self::new(Duration::from_micros(16_667)).with_fixed_delta(Duration::from_millis(20))
    }
}
