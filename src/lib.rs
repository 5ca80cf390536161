//! # nodevisor
//!
//! **Nodevisor** supervises a fixed set of long-running worker processes:
//! it brings them up in a declared order through a managed lifecycle
//! (configure, then activate), watches for crashes, respawns them with a
//! bounded budget and publishes an aggregate readiness signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerSpec  │   │  WorkerSpec  │   │  WorkerSpec  │
//!     │  (order 1)   │   │  (order 1)   │   │  (order 2)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └──────────► WorkerRegistry ◄─────────┘   (validated, stable-sorted)
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - control API: startup / request_launch / request_stop / shutdown│
//! │  - readiness watch, bring-up outcome, status snapshot             │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼ inbound queue (commands, launcher results, exits, timers)
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (single writer)                                      │
//! │  ProcessHandle × N ── BringUp cursor ── ReadinessAggregator       │
//! └──────┬─────────────────────────────────────────┬──────────────────┘
//!        │ spawned calls                           │ publish(Event)
//!        ▼                                         ▼
//!   Launcher (ProcessLauncher, fakes)      Bus ──► SubscriberSet ──► LogWriter, ...
//!        │
//!        └── ExitNotifier::notify(code) ──► inbound queue
//! ```
//!
//! ### Lifecycle
//! ```text
//! Unconfigured ─► Configuring ─► Inactive ─► Activating ─► Active ─► Deactivating ─► Finalized
//!                                                            │
//!                                          crash ─► Exited ──┴─ respawn delay ─► Configuring
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                           |
//! |-------------------|----------------------------------------------------------|----------------------------------------------|
//! | **Supervision**   | Ordered bring-up, crash respawn, reverse-order shutdown  | [`Supervisor`], [`SupervisorBuilder`]        |
//! | **Registry**      | Validated worker declarations, TOML loader               | [`WorkerSpec`], [`WorkerRegistry`], [`registry::loader`] |
//! | **Launchers**     | Process effects behind a trait                           | [`Launcher`], [`ProcessLauncher`]            |
//! | **Policies**      | Respawn budget and bring-up failure handling             | [`RespawnPolicy`], [`BringUpPolicy`]         |
//! | **Observability** | Events, readiness, per-worker status                     | [`Event`], [`Subscribe`], [`Readiness`]      |
//! | **Errors**        | Typed errors with stable labels                          | [`ConfigError`], [`ControlError`], [`RuntimeError`] |
//!
//! ## Example
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! use async_trait::async_trait;
//! use nodevisor::{
//!     BringUpOutcome, ExitNotifier, LaunchDescriptor, LaunchError, LaunchRequest, LaunchToken,
//!     Launcher, Readiness, Supervisor, SupervisorConfig, WorkerRegistry, WorkerSpec,
//! };
//!
//! /// Pretends to run workers; a stop makes the "process" exit cleanly.
//! #[derive(Default)]
//! struct InMemory {
//!     live: Mutex<HashMap<LaunchToken, ExitNotifier>>,
//! }
//!
//! #[async_trait]
//! impl Launcher for InMemory {
//!     async fn start(&self, _req: LaunchRequest, exits: ExitNotifier) -> Result<LaunchToken, LaunchError> {
//!         let mut live = self.live.lock().unwrap();
//!         let token = LaunchToken::new(live.len() as u64 + 1);
//!         live.insert(token, exits);
//!         Ok(token)
//!     }
//!     async fn stop(&self, token: LaunchToken) -> Result<(), LaunchError> {
//!         if let Some(exits) = self.live.lock().unwrap().remove(&token) {
//!             exits.notify(Some(0));
//!         }
//!         Ok(())
//!     }
//!     async fn kill(&self, token: LaunchToken) {
//!         self.live.lock().unwrap().remove(&token);
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = WorkerRegistry::new(vec![
//!         WorkerSpec::new("map_server", LaunchDescriptor::new("map_server")).with_order(1),
//!         WorkerSpec::new("amcl", LaunchDescriptor::new("amcl")).with_order(2),
//!     ])?;
//!
//!     let cfg = SupervisorConfig { handle_signals: false, ..SupervisorConfig::default() };
//!     let sup = Supervisor::builder(cfg, Arc::new(InMemory::default())).build();
//!
//!     let runner = Arc::clone(&sup);
//!     let run = tokio::spawn(async move { runner.run(registry).await });
//!
//!     assert_eq!(sup.bring_up().await, BringUpOutcome::Success);
//!     assert_eq!(sup.readiness(), Readiness::Ready);
//!
//!     sup.shutdown();
//!     run.await??;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod launcher;
mod policies;
pub mod registry;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    BringUpOutcome, LifecycleState, Readiness, Supervisor, SupervisorBuilder, SupervisorConfig,
    WorkerStatus,
};
pub use error::{ConfigError, ControlError, LaunchError, RuntimeError, WorkerFailure};
pub use events::{Bus, Event, EventKind};
pub use launcher::{ExitNotifier, LaunchRequest, LaunchToken, Launcher, ProcessLauncher, process};
pub use policies::{BringUpPolicy, RespawnPolicy};
pub use registry::{LaunchDescriptor, LoadedConfig, WorkerRegistry, WorkerSpec};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
