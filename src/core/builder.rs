use std::sync::Arc;

use crate::{
    config::{ConfigStore, SupervisorConfig},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{registry::Registry, supervisor::Supervisor};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    store: ConfigStore,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and server store.
    pub fn new(cfg: SupervisorConfig, store: ConfigStore) -> Self {
        Self {
            cfg,
            store,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (server lifecycle, shutdown, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// Spawns subscriber workers, so it must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let registry = Registry::new(Arc::new(self.store), bus.clone());

        Arc::new(Supervisor::new_internal(self.cfg, bus, registry, subs))
    }
}
