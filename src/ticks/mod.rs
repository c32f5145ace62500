//! # Tick phases, tick sources and the frame clock.
//!
//! - [`Phase`] / [`Tick`] - the `(phase, delta)` pairs the scheduler consumes
//! - [`TickSource`] - pull-based supplier of ticks ([`ScriptedTicks`] for tests and replays)
//! - [`FrameClock`] - tokio interval that drives a scheduler in real time
//! - [`wait_for_shutdown_signal`] - OS signal helper used by the clock

mod clock;
mod phase;
mod shutdown;
mod source;

pub use clock::FrameClock;
pub use phase::{Phase, Tick};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
pub use source::{ScriptedTicks, TickSource};
