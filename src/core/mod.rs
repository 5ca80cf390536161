//! Runtime core: lifecycle state machine, coordination and shutdown.
//!
//! The public API from this module is [`Supervisor`] (built with
//! [`SupervisorBuilder`]) and the value types it reports.
//!
//! Internal modules:
//! - `handle`: per-worker state machine (no I/O);
//! - `bring_up`: ordered configure/activate cursor;
//! - `readiness`: readiness aggregate over required workers;
//! - `coordinator`: single-writer loop applying launcher results, exits, timers, commands;
//! - `supervisor`: public control/observation API;
//! - `shutdown`: cross-platform shutdown signal handling.

mod bring_up;
mod builder;
mod config;
mod coordinator;
mod handle;
mod inbound;
mod readiness;
mod shutdown;
mod state;
mod supervisor;

pub(crate) use inbound::Inbound;

pub use bring_up::BringUpOutcome;
pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use handle::WorkerStatus;
pub use readiness::Readiness;
pub use state::LifecycleState;
pub use supervisor::Supervisor;
