//! # LogWriter: events as `tracing` records.
//!
//! Maps every [`Event`] to one structured record under the `nodevisor` target.
//! Routine lifecycle traffic is logged at `info`, recoverable trouble at `warn`,
//! terminal failures at `error`.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  nodevisor: transition worker="controller_server" from=inactive to=activating
//! WARN  nodevisor: worker crashed worker="planner_server" exit_code=Some(139) restarts=0
//! INFO  nodevisor: respawn scheduled worker="planner_server" delay_ms=2000 restarts=0
//! ERROR nodevisor: respawn budget exhausted worker="planner_server" exit_code=Some(139) restarts=3
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards events to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerTransition => {
                let from = e.from.map(|s| s.as_str()).unwrap_or("-");
                let to = e.to.map(|s| s.as_str()).unwrap_or("-");
                info!(target: "nodevisor", worker, from, to, "transition");
            }
            EventKind::ConfigurationFailed => {
                error!(target: "nodevisor", worker, reason, "configuration failed");
            }
            EventKind::ActivationFailed => {
                error!(target: "nodevisor", worker, reason, "activation failed");
            }
            EventKind::WorkerCrashed => {
                warn!(target: "nodevisor", worker, exit_code = ?e.exit_code, restarts = ?e.restarts, "worker crashed");
            }
            EventKind::RespawnScheduled => {
                info!(target: "nodevisor", worker, delay_ms = ?e.delay_ms, restarts = ?e.restarts, "respawn scheduled");
            }
            EventKind::RespawnExhausted => {
                error!(target: "nodevisor", worker, exit_code = ?e.exit_code, restarts = ?e.restarts, "respawn budget exhausted");
            }
            EventKind::WorkerForced => {
                error!(target: "nodevisor", worker, "worker killed after shutdown timeout");
            }
            EventKind::ReadinessChanged => {
                let readiness = e.readiness.map(|r| r.as_str()).unwrap_or("-");
                info!(target: "nodevisor", readiness, "readiness changed");
            }
            EventKind::BringUpStarted => {
                info!(target: "nodevisor", "bring-up started");
            }
            EventKind::BringUpFinished => {
                info!(target: "nodevisor", outcome = reason, failed_worker = worker, "bring-up finished");
            }
            EventKind::ShutdownRequested => {
                info!(target: "nodevisor", "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "nodevisor", "all workers stopped");
            }
            EventKind::ShutdownTimeout => {
                error!(target: "nodevisor", stuck = reason, "shutdown timeout exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "nodevisor", subscriber = worker, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "nodevisor", subscriber = worker, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
