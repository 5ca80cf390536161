//! # Launcher capability.
//!
//! The supervisor never spawns processes itself. Every effect goes through a
//! [`Launcher`]: start a worker, run its setup and activation steps, stop it,
//! kill it. Exits are reported asynchronously through the [`ExitNotifier`]
//! handed to [`Launcher::start`].
//!
//! ## Architecture
//! ```text
//! Coordinator ──spawn──► launcher.start(request, notifier) ─► LaunchToken
//!             ──spawn──► launcher.configure(token) / activate(token) / stop(token)
//!                                     │
//!         inbound queue ◄─────────────┘ (results)
//!         inbound queue ◄──── notifier.notify(code) (process exit, any time)
//! ```
//!
//! ## Rules
//! - Calls are made from spawned tasks; a slow launcher never blocks the coordinator.
//! - At most one call per worker is in flight at any time.
//! - Each `start` gets a fresh notifier; exits reported through an old one are ignored.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use nodevisor::{ExitNotifier, LaunchError, LaunchRequest, LaunchToken, Launcher};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl Launcher for Noop {
//!     async fn start(&self, _req: LaunchRequest, _exits: ExitNotifier) -> Result<LaunchToken, LaunchError> {
//!         Ok(LaunchToken::new(1))
//!     }
//!     async fn stop(&self, _token: LaunchToken) -> Result<(), LaunchError> {
//!         Ok(())
//!     }
//!     async fn kill(&self, _token: LaunchToken) {}
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::Inbound;
use crate::error::LaunchError;
use crate::registry::{LaunchDescriptor, WorkerSpec};

/// Opaque identifier of one launched process instance, issued by the launcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaunchToken(u64);

impl LaunchToken {
    /// Wraps a launcher-chosen identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LaunchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a launcher needs to start one worker instance.
#[derive(Clone, Debug)]
pub struct LaunchRequest {
    spec: Arc<WorkerSpec>,
    namespace: Arc<str>,
    restarts: u32,
}

impl LaunchRequest {
    pub(crate) fn new(spec: Arc<WorkerSpec>, namespace: Arc<str>, restarts: u32) -> Self {
        Self {
            spec,
            namespace,
            restarts,
        }
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// The worker declaration.
    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Launch descriptor of the worker.
    pub fn descriptor(&self) -> &LaunchDescriptor {
        self.spec.launch()
    }

    /// Namespace configured on the supervisor (may be empty).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Automatic restarts performed before this launch (`0` for the first one).
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Worker name prefixed with the namespace (`/ns/name`, or `name` without namespace).
    pub fn qualified_name(&self) -> String {
        let ns = self.namespace.trim_matches('/');
        if ns.is_empty() {
            self.name().to_string()
        } else {
            format!("/{ns}/{}", self.name())
        }
    }
}

/// Reports the exit of one launched process back to the supervisor.
///
/// Cheap to clone; keyed to the launch it was created for.
#[derive(Clone)]
pub struct ExitNotifier {
    worker: usize,
    generation: u64,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl ExitNotifier {
    pub(crate) fn new(worker: usize, generation: u64, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self {
            worker,
            generation,
            tx,
        }
    }

    /// Reports that the process exited with `code` (`None` when killed by a signal).
    ///
    /// Safe to call after the supervisor is gone; the notification is dropped.
    pub fn notify(&self, code: Option<i32>) {
        let _ = self.tx.send(Inbound::Exited {
            worker: self.worker,
            generation: self.generation,
            code,
        });
    }
}

impl fmt::Debug for ExitNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitNotifier")
            .field("worker", &self.worker)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Capability that starts, drives and stops worker processes.
///
/// ### Implementation requirements
/// - Report every exit of a started process exactly once through its [`ExitNotifier`],
///   whether it was requested (`stop`/`kill`) or not.
/// - `configure` returning `Err` means a non-transient setup failure.
/// - `stop` should return promptly; completion is signalled by the exit notification.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Starts a worker process and returns its token.
    async fn start(
        &self,
        request: LaunchRequest,
        exits: ExitNotifier,
    ) -> Result<LaunchToken, LaunchError>;

    /// Runs the setup step of a started worker.
    async fn configure(&self, _token: LaunchToken) -> Result<(), LaunchError> {
        Ok(())
    }

    /// Runs the activation step of a configured worker.
    async fn activate(&self, _token: LaunchToken) -> Result<(), LaunchError> {
        Ok(())
    }

    /// Requests a graceful stop.
    async fn stop(&self, token: LaunchToken) -> Result<(), LaunchError>;

    /// Terminates the process without waiting for it to cooperate.
    async fn kill(&self, token: LaunchToken);

    /// Returns the launcher name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LaunchDescriptor;

    fn request(namespace: &str) -> LaunchRequest {
        let spec = WorkerSpec::new("bt_navigator", LaunchDescriptor::new("bt_navigator"));
        LaunchRequest::new(Arc::new(spec), Arc::from(namespace), 0)
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(request("").qualified_name(), "bt_navigator");
        assert_eq!(request("robot1").qualified_name(), "/robot1/bt_navigator");
        assert_eq!(request("/robot1/").qualified_name(), "/robot1/bt_navigator");
    }

    #[test]
    fn test_token_display() {
        assert_eq!(LaunchToken::new(7).to_string(), "#7");
    }
}
