//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] forwards events to `tracing` in a human-readable format. Install a
//! `tracing` subscriber in the host to see the output.
//!
//! ## Output format
//! ```text
//! [scheduled] task=3 name=respawn phase=update
//! [started] task=3 name=respawn
//! [completed] task=3 name=respawn
//! [dropped] task=9 phase=update max=64 reason=capacity_exceeded
//! [paused]
//! ```

use tracing::{debug, info, warn};

use crate::Subscribe;
use crate::events::{Event, EventKind};

/// `tracing`-backed logging subscriber.
///
/// Enabled via the `logging` feature. Lifecycle events go to `info`, slot
/// bookkeeping to `debug`, dropped tasks to `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let task = e.task.map(|id| id.get());
        let name = e.name.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskScheduled => {
                debug!("[scheduled] task={task:?} name={name} phase={:?}", e.phase);
            }
            EventKind::TaskStarted => info!("[started] task={task:?} name={name}"),
            EventKind::TaskCompleted => info!("[completed] task={task:?} name={name}"),
            EventKind::TaskKilled => info!("[killed] task={task:?} name={name}"),
            EventKind::TaskTimedOut => info!("[timeout] task={task:?} name={name}"),
            EventKind::TaskRestarted => info!("[restarted] task={task:?} name={name}"),
            EventKind::TaskEvicted => debug!("[evicted] task={task:?} name={name}"),
            EventKind::TaskDropped => {
                warn!(
                    "[dropped] task={task:?} phase={:?} max={:?} reason={:?}",
                    e.phase, e.capacity, e.reason
                );
            }
            EventKind::CollectionGrown => {
                debug!("[grown] phase={:?} capacity={:?}", e.phase, e.capacity);
            }
            EventKind::SchedulerPaused => info!("[paused]"),
            EventKind::SchedulerResumed => info!("[resumed]"),
            EventKind::SchedulerDisposed => info!("[disposed] released={:?}", e.capacity),
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
