use std::sync::Arc;

use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::config::SupervisorConfig;
use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the event subscribers.
    ///
    /// Subscribers receive supervisor events (spawns, crashes, reload
    /// progress) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Creates the bus and the subscriber workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Supervisor::new_internal(self.cfg, bus, subs)
    }
}
