use std::rc::Rc;

use crate::{
    core::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::scheduler::Scheduler;

/// Builder for constructing a Scheduler with optional event subscribers.
pub struct SchedulerBuilder {
    cfg: Config,
    subscribers: Vec<Rc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scheduler events (task lifecycle, capacity growth,
    /// drops, pause/resume) synchronously, in publication order.
    pub fn with_subscribers(mut self, subscribers: Vec<Rc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber to the list.
    pub fn with_subscriber(mut self, subscriber: Rc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds and returns the Scheduler instance.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus over the subscriber set (silent when there are none)
    /// - One task collection per phase, sized from the config
    pub fn build(self) -> Scheduler {
        let bus = if self.subscribers.is_empty() {
            Bus::default()
        } else {
            Bus::new(SubscriberSet::new(self.subscribers))
        };
        Scheduler::with_bus(self.cfg, bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::LifecycleStats;
    use crate::ticks::Phase;

    #[test]
    fn test_subscribers_receive_task_events() {
        let stats = Rc::new(LifecycleStats::new());
        let scheduler = Scheduler::builder(Config::default())
            .with_subscriber(stats.clone())
            .build();

        scheduler.do_after(|| {}, 0.0, Phase::Update).unwrap();
        scheduler.tick(Phase::Update, 0.016).unwrap();

        let snap = stats.snapshot();
        assert_eq!(snap.scheduled, 1);
        assert_eq!(snap.started, 1);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.live(), 0);
    }
}
