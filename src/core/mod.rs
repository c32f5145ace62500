//! Scheduler core: configuration, per-phase collections and the scheduler itself.
//!
//! Modules:
//! - [`config`]: per-phase sizing ([`Config`], [`CollectionConfig`]);
//! - [`collection`]: growable, mutation-safe task set advanced once per tick;
//! - [`scheduler`]: factories, dispatch, global pause and disposal;
//! - [`builder`]: attaches event subscribers before construction.

mod builder;
mod collection;
mod config;
mod scheduler;

pub use builder::SchedulerBuilder;
pub use collection::TaskCollection;
pub use config::{CollectionConfig, Config};
pub use scheduler::{Scheduler, WeakScheduler};
