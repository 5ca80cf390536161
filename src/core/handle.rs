//! # Per-worker lifecycle state machine.
//!
//! A [`ProcessHandle`] owns the mutable state of one worker: current
//! [`LifecycleState`], restart counter, last exit code, terminal failure and
//! the token of the live process. It never performs I/O; every method is a
//! synchronous state change that returns what the coordinator must do next.
//!
//! ## Generations
//! Each launch (first start, respawn) and each forced removal bumps the
//! handle's generation. Launcher results and exit notifications carry the
//! generation they were issued for and are ignored when it no longer matches.
//!
//! ## Rules
//! - `request_launch` is accepted only from `Unconfigured`.
//! - A stop during a configure/activate step is deferred until the step reports back.
//! - An exit after a stop request finalizes the handle; any other exit of a live
//!   process moves it to `Exited`.

use std::sync::Arc;
use std::time::SystemTime;

use crate::core::LifecycleState;
use crate::error::{ControlError, WorkerFailure};
use crate::launcher::LaunchToken;
use crate::registry::WorkerSpec;

/// A recorded state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub at: SystemTime,
}

/// What the coordinator has to do after a stop request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StopAction {
    /// Ask the launcher to stop the process.
    Deactivate(Transition, LaunchToken),
    /// No process exists; the handle is already finalized.
    Finalize(Transition),
    /// A launcher step is in flight; the stop runs once it reports back.
    Deferred,
    /// Already stopping or stopped.
    Noop,
}

/// Classification of an exit notification.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ExitOutcome {
    Stale,
    Stopped(Transition),
    Crashed(Transition),
}

/// Point-in-time view of one worker.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerStatus {
    /// Worker name.
    pub name: String,
    /// Startup order key.
    pub order: i64,
    /// Whether the worker counts towards readiness.
    pub required: bool,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Automatic restarts performed so far.
    pub restart_count: u32,
    /// Time of the last state change.
    pub last_transition_at: SystemTime,
    /// Exit code of the last exited process, if any.
    pub last_exit_code: Option<i32>,
    /// Terminal failure, if the worker gave up.
    pub failure: Option<WorkerFailure>,
}

pub(crate) struct ProcessHandle {
    spec: Arc<WorkerSpec>,
    state: LifecycleState,
    restart_count: u32,
    last_transition_at: SystemTime,
    last_exit_code: Option<i32>,
    failure: Option<WorkerFailure>,
    token: Option<LaunchToken>,
    generation: u64,
    stop_requested: bool,
}

impl ProcessHandle {
    pub fn new(spec: Arc<WorkerSpec>) -> Self {
        Self {
            spec,
            state: LifecycleState::Unconfigured,
            restart_count: 0,
            last_transition_at: SystemTime::now(),
            last_exit_code: None,
            failure: None,
            token: None,
            generation: 0,
            stop_requested: false,
        }
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &Arc<WorkerSpec> {
        &self.spec
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }

    pub fn failure(&self) -> Option<&WorkerFailure> {
        self.failure.as_ref()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Returns `true` if a result for `generation` is expected in `state`.
    pub fn expects(&self, generation: u64, state: LifecycleState) -> bool {
        self.generation == generation && self.state == state
    }

    fn set(&mut self, to: LifecycleState) -> Transition {
        let at = SystemTime::now();
        let t = Transition {
            from: self.state,
            to,
            at,
        };
        self.state = to;
        self.last_transition_at = at;
        t
    }

    /// Starts a new launch: `Unconfigured → Configuring`.
    pub fn request_launch(&mut self) -> Result<Transition, ControlError> {
        match self.state {
            LifecycleState::Unconfigured => {
                self.generation += 1;
                self.failure = None;
                self.token = None;
                self.stop_requested = false;
                Ok(self.set(LifecycleState::Configuring))
            }
            state if state.is_active() => Err(ControlError::AlreadyRunning {
                worker: self.name().to_string(),
                state,
            }),
            state => Err(ControlError::InvalidTransition {
                worker: self.name().to_string(),
                state,
                op: "launch",
            }),
        }
    }

    pub fn configured(&mut self, token: LaunchToken) -> Transition {
        self.token = Some(token);
        self.set(LifecycleState::Inactive)
    }

    pub fn configure_failed(&mut self, failure: WorkerFailure) -> Transition {
        self.failure = Some(failure);
        self.token = None;
        self.set(LifecycleState::Unconfigured)
    }

    /// `Inactive → Activating`, returning the token to activate.
    pub fn request_activate(&mut self) -> Option<(Transition, LaunchToken)> {
        if self.state != LifecycleState::Inactive {
            return None;
        }
        let token = self.token?;
        Some((self.set(LifecycleState::Activating), token))
    }

    pub fn activated(&mut self) -> Transition {
        self.set(LifecycleState::Active)
    }

    /// Back to `Unconfigured`; returns the token of the process to kill.
    pub fn activate_failed(&mut self, failure: WorkerFailure) -> (Transition, Option<LaunchToken>) {
        self.failure = Some(failure);
        let token = self.token.take();
        (self.set(LifecycleState::Unconfigured), token)
    }

    pub fn begin_stop(&mut self) -> StopAction {
        match self.state {
            LifecycleState::Inactive | LifecycleState::Active => {
                self.stop_requested = false;
                match self.token {
                    Some(token) => StopAction::Deactivate(self.set(LifecycleState::Deactivating), token),
                    None => StopAction::Finalize(self.set(LifecycleState::Finalized)),
                }
            }
            LifecycleState::Configuring | LifecycleState::Activating => {
                self.stop_requested = true;
                StopAction::Deferred
            }
            LifecycleState::Unconfigured | LifecycleState::Exited => {
                // Invalidates a pending respawn timer.
                self.generation += 1;
                self.stop_requested = false;
                StopAction::Finalize(self.set(LifecycleState::Finalized))
            }
            LifecycleState::Deactivating | LifecycleState::Finalized => StopAction::Noop,
        }
    }

    pub fn on_exit(&mut self, generation: u64, code: Option<i32>) -> ExitOutcome {
        if generation != self.generation {
            return ExitOutcome::Stale;
        }
        match self.state {
            LifecycleState::Deactivating => {
                self.last_exit_code = code;
                self.token = None;
                ExitOutcome::Stopped(self.set(LifecycleState::Finalized))
            }
            LifecycleState::Configuring
            | LifecycleState::Inactive
            | LifecycleState::Activating
            | LifecycleState::Active => {
                self.last_exit_code = code;
                self.token = None;
                if self.stop_requested {
                    self.stop_requested = false;
                    ExitOutcome::Stopped(self.set(LifecycleState::Finalized))
                } else {
                    ExitOutcome::Crashed(self.set(LifecycleState::Exited))
                }
            }
            _ => ExitOutcome::Stale,
        }
    }

    /// `Exited → Configuring` for an automatic restart.
    pub fn respawn(&mut self) -> Option<Transition> {
        if self.state != LifecycleState::Exited {
            return None;
        }
        self.restart_count += 1;
        self.generation += 1;
        self.token = None;
        Some(self.set(LifecycleState::Configuring))
    }

    /// Marks an `Exited` handle as terminally failed.
    pub fn exhaust(&mut self) {
        self.failure = Some(WorkerFailure::CrashExit {
            code: self.last_exit_code,
            restarts: self.restart_count,
        });
    }

    /// Finalizes a handle that did not stop in time; returns its process token, if known.
    pub fn force_terminate(&mut self) -> Option<(Transition, Option<LaunchToken>)> {
        if self.state == LifecycleState::Finalized {
            return None;
        }
        self.failure = Some(WorkerFailure::ForcedShutdown);
        self.generation += 1;
        self.stop_requested = false;
        let token = self.token.take();
        Some((self.set(LifecycleState::Finalized), token))
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            name: self.name().to_string(),
            order: self.spec.order(),
            required: self.spec.required(),
            state: self.state,
            restart_count: self.restart_count,
            last_transition_at: self.last_transition_at,
            last_exit_code: self.last_exit_code,
            failure: self.failure.clone(),
        }
    }
}
