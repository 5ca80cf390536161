//! # Global supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for one supervisor run.
//!
//! ## Sentinel values
//! - `respawn_ceiling = None` → unlimited automatic restarts
//! - `shutdown_timeout = 0s` → force-terminate immediately on shutdown
//! - `backoff_factor <= 1.0` → fixed respawn delay (no growth)

use std::time::Duration;

use crate::policies::{BringUpPolicy, RespawnPolicy};
use crate::registry::WorkerSpec;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `autostart`: run the ordered bring-up as soon as `run` starts
/// - `namespace`: opaque prefix handed to the launcher with every request
/// - `respawn_ceiling`: maximum automatic restarts per worker (`None` = unlimited)
/// - `shutdown_timeout`: bound on graceful shutdown before force-termination
/// - `on_failure`: halt or continue the bring-up when a worker fails terminally
/// - `backoff_factor` / `max_respawn_delay`: optional growth of the respawn delay
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `handle_signals`: start shutdown on SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Drive configure/activate automatically at startup.
    ///
    /// When `false`, workers stay `Unconfigured` until
    /// [`Supervisor::startup`](crate::Supervisor::startup) or
    /// [`Supervisor::request_launch`](crate::Supervisor::request_launch) is called.
    pub autostart: bool,

    /// Namespace passed through to the launcher (opaque to the core).
    pub namespace: String,

    /// Maximum number of automatic restarts per worker.
    pub respawn_ceiling: Option<u32>,

    /// Maximum time to wait for all workers to finalize on shutdown.
    pub shutdown_timeout: Duration,

    /// Bring-up behaviour when a worker fails terminally.
    pub on_failure: BringUpPolicy,

    /// Multiplicative growth of the respawn delay per restart (`1.0` = fixed).
    pub backoff_factor: f64,

    /// Cap for grown respawn delays.
    pub max_respawn_delay: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// React to OS termination signals inside [`Supervisor::run`](crate::Supervisor::run).
    pub handle_signals: bool,
}

impl SupervisorConfig {
    /// Builds the respawn policy for one worker.
    ///
    /// The per-worker delay comes from the worker declaration; ceiling and growth are global.
    pub fn respawn_policy(&self, spec: &WorkerSpec) -> RespawnPolicy {
        RespawnPolicy::fixed(spec.respawn_delay())
            .with_ceiling(self.respawn_ceiling)
            .with_growth(self.backoff_factor, self.max_respawn_delay)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `autostart = true`
    /// - `namespace = ""`
    /// - `respawn_ceiling = None` (unlimited)
    /// - `shutdown_timeout = 30s`
    /// - `on_failure = BringUpPolicy::Halt`
    /// - `backoff_factor = 1.0` (fixed delay), `max_respawn_delay = 30s`
    /// - `bus_capacity = 1024`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            autostart: true,
            namespace: String::new(),
            respawn_ceiling: None,
            shutdown_timeout: Duration::from_secs(30),
            on_failure: BringUpPolicy::default(),
            backoff_factor: 1.0,
            max_respawn_delay: Duration::from_secs(30),
            bus_capacity: 1024,
            handle_signals: true,
        }
    }
}
