//! Error types used by the nodevisor runtime, the worker registry and launchers.
//!
//! This module defines the error taxonomy of the supervisor:
//!
//! - [`ConfigError`] malformed worker registry or supervisor settings (fatal at load).
//! - [`LaunchError`] failures reported by a [`Launcher`](crate::Launcher) implementation.
//! - [`ControlError`] misuse of the control API (duplicate launch, unknown worker, ...).
//! - [`WorkerFailure`] terminal, non-transient failure of one worker.
//! - [`RuntimeError`] failures of the supervisor run itself (forced shutdown, signals).
//!
//! All types provide `as_label` for logs/metrics, following one convention:
//! short stable snake_case strings.

use std::time::Duration;

use thiserror::Error;

use crate::core::LifecycleState;
use crate::launcher::LaunchToken;

/// # Errors produced while loading or validating the worker registry.
///
/// Raised before any worker is created; a registry that fails validation
/// never reaches the supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A worker declaration has an empty name.
    #[error("worker #{index} has an empty name")]
    EmptyName {
        /// Declaration position (0-based).
        index: usize,
    },

    /// Two worker declarations share the same name.
    #[error("duplicate worker name {name:?}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// The `order` value is not a finite integer.
    #[error("worker {name:?} has invalid order {value}")]
    InvalidOrder {
        /// Worker name.
        name: String,
        /// Rendered offending value.
        value: String,
    },

    /// The respawn delay is negative or not finite.
    #[error("worker {name:?} has invalid respawn delay {value}")]
    InvalidDelay {
        /// Worker name.
        name: String,
        /// Offending value in seconds.
        value: f64,
    },

    /// The registry file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the registry file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The registry document is not valid TOML or has the wrong shape.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyName { .. } => "config_empty_name",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
            ConfigError::InvalidOrder { .. } => "config_invalid_order",
            ConfigError::InvalidDelay { .. } => "config_invalid_delay",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse(_) => "config_parse",
        }
    }
}

/// # Errors reported by a launcher capability.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The worker process could not be spawned.
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The setup step reported a non-zero result.
    #[error("setup failed with exit code {code:?}")]
    SetupFailed {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The activation step was refused by the worker.
    #[error("activation failed: {reason}")]
    ActivationFailed {
        /// Launcher-provided reason.
        reason: String,
    },

    /// The token does not belong to a process known by this launcher.
    #[error("unknown launch token {token}")]
    UnknownToken {
        /// Offending token.
        token: LaunchToken,
    },

    /// Delivering a signal to the worker process failed.
    #[error("failed to signal worker: {source}")]
    Signal {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Launcher-specific refusal.
    #[error("launch rejected: {reason}")]
    Rejected {
        /// Launcher-provided reason.
        reason: String,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Spawn { .. } => "launch_spawn",
            LaunchError::SetupFailed { .. } => "launch_setup_failed",
            LaunchError::ActivationFailed { .. } => "launch_activation_failed",
            LaunchError::UnknownToken { .. } => "launch_unknown_token",
            LaunchError::Signal { .. } => "launch_signal",
            LaunchError::Rejected { .. } => "launch_rejected",
        }
    }
}

/// # Errors returned by the supervisor control API.
///
/// These never change handle state: the request is refused as a whole.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// A launch was requested for a worker that already has a live instance.
    #[error("worker {worker:?} is already running (state {state})")]
    AlreadyRunning {
        /// Worker name.
        worker: String,
        /// State at the time of the request.
        state: LifecycleState,
    },

    /// The requested operation is not valid from the worker's current state.
    #[error("cannot {op} worker {worker:?} from state {state}")]
    InvalidTransition {
        /// Worker name.
        worker: String,
        /// State at the time of the request.
        state: LifecycleState,
        /// Requested operation.
        op: &'static str,
    },

    /// No worker with the given name exists in the registry.
    #[error("unknown worker {name:?}")]
    UnknownWorker {
        /// Requested name.
        name: String,
    },

    /// The supervisor loop is not running any more.
    #[error("supervisor is closed")]
    Closed,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::AlreadyRunning { .. } => "control_already_running",
            ControlError::InvalidTransition { .. } => "control_invalid_transition",
            ControlError::UnknownWorker { .. } => "control_unknown_worker",
            ControlError::Closed => "control_closed",
        }
    }
}

/// # Terminal failure of a single worker.
///
/// Recorded on the worker's handle and reported to the readiness aggregator
/// and the bring-up outcome. Transient crashes that are respawned never
/// produce a `WorkerFailure`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    /// The setup step failed; not retried.
    #[error("configuration failed: {reason}")]
    ConfigurationError {
        /// Launcher-provided reason.
        reason: String,
    },

    /// The activation step failed; not retried.
    #[error("activation failed: {reason}")]
    ActivationError {
        /// Launcher-provided reason.
        reason: String,
    },

    /// The worker exited unexpectedly and its respawn budget is exhausted.
    #[error("exited unexpectedly with code {code:?} after {restarts} restarts")]
    CrashExit {
        /// Last exit code.
        code: Option<i32>,
        /// Automatic restarts performed before giving up.
        restarts: u32,
    },

    /// The worker did not stop within the shutdown timeout and was killed.
    #[error("forced shutdown")]
    ForcedShutdown,
}

impl WorkerFailure {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerFailure::ConfigurationError { .. } => "worker_configuration_error",
            WorkerFailure::ActivationError { .. } => "worker_activation_error",
            WorkerFailure::CrashExit { .. } => "worker_crash_exit",
            WorkerFailure::ForcedShutdown => "worker_forced_shutdown",
        }
    }
}

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// [`Supervisor::run`](crate::Supervisor::run) was called more than once.
    #[error("supervisor is already running")]
    AlreadyRunning,

    /// Shutdown timeout was exceeded; remaining workers were force-terminated.
    #[error("shutdown timeout {timeout:?} exceeded; forced: {stuck:?}")]
    ForcedShutdown {
        /// The configured shutdown timeout.
        timeout: Duration,
        /// Names of the workers that had to be killed.
        stuck: Vec<String>,
    },

    /// OS termination signal listeners could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signal {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::ForcedShutdown { timeout: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_forced_shutdown");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::ForcedShutdown { .. } => "runtime_forced_shutdown",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }
}
