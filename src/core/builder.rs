use std::sync::Arc;

use crate::{
    core::SupervisorConfig,
    events::Bus,
    launcher::Launcher,
    subscribers::{Subscribe, SubscriberSet},
};

use super::supervisor::Supervisor;

/// Builder for constructing a Supervisor with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    launcher: Arc<dyn Launcher>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and launcher.
    pub fn new(cfg: SupervisorConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            cfg,
            launcher,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (transitions, crashes, readiness, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// Spawns the subscriber workers, so it must be called inside a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        Arc::new(Supervisor::new_internal(self.cfg, bus, subs, self.launcher))
    }
}
