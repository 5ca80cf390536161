//! # ProcessLauncher: launcher backed by OS processes.
//!
//! Spawns each worker with [`tokio::process::Command`] and watches it from a
//! dedicated waiter task that reports the exit code through the worker's
//! [`ExitNotifier`].
//!
//! ## Lifecycle mapping
//! ```text
//! start      → spawn program (args, env, cwd, generated --ros-args)
//! configure  → watch for `settle`; fail with SetupFailed{code} if the process exits meanwhile
//! activate   → fail with ActivationFailed if the process already exited
//! stop       → SIGTERM (unix) / kill (elsewhere)
//! kill       → SIGKILL via the waiter task
//! ```
//!
//! ## ROS-style arguments
//! When [`LaunchDescriptor::ros_args`](crate::LaunchDescriptor::ros_args) is set, the
//! descriptor is rendered after the plain arguments as:
//! ```text
//! --ros-args -r __node:=<name> [-r __ns:=/<namespace>] [-r from:=to]... [--params-file <path>] [--log-level <level>]
//! ```

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::LaunchError;
use crate::launcher::capability::{ExitNotifier, LaunchRequest, LaunchToken, Launcher};

/// Bookkeeping for one spawned process.
struct Proc {
    name: String,
    pid: Option<u32>,
    /// Cancels the waiter, which then kills the child.
    kill: CancellationToken,
    /// `Some(code)` once the process has exited.
    exited: watch::Receiver<Option<Option<i32>>>,
}

/// [`Launcher`] that runs workers as child processes.
pub struct ProcessLauncher {
    next: AtomicU64,
    procs: Arc<Mutex<HashMap<LaunchToken, Proc>>>,
    settle: Duration,
}

impl ProcessLauncher {
    /// Creates a launcher with a 500ms configure settle window.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            procs: Arc::new(Mutex::new(HashMap::new())),
            settle: Duration::from_millis(500),
        }
    }

    /// Sets how long `configure` waits for a freshly spawned process to die
    /// before declaring its setup successful.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Receiver that keeps the exit code even after the waiter drops the entry.
    async fn exit_watch(
        &self,
        token: LaunchToken,
    ) -> Result<watch::Receiver<Option<Option<i32>>>, LaunchError> {
        let procs = self.procs.lock().await;
        let proc = procs
            .get(&token)
            .ok_or(LaunchError::UnknownToken { token })?;
        Ok(proc.exited.clone())
    }

    async fn exit_status(&self, token: LaunchToken) -> Result<Option<Option<i32>>, LaunchError> {
        let exited = self.exit_watch(token).await?;
        let status = *exited.borrow();
        Ok(status)
    }

    fn spawn_waiter(
        &self,
        token: LaunchToken,
        mut child: Child,
        kill: CancellationToken,
        exited: watch::Sender<Option<Option<i32>>>,
        exits: ExitNotifier,
    ) {
        let procs = Arc::clone(&self.procs);
        tokio::spawn(async move {
            let waited = tokio::select! {
                res = child.wait() => Some(res),
                _ = kill.cancelled() => None,
            };
            let status = match waited {
                Some(res) => res,
                None => {
                    if let Err(e) = child.start_kill() {
                        warn!(token = %token, error = %e, "failed to kill worker process");
                    }
                    child.wait().await
                }
            };
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(token = %token, error = %e, "failed to wait for worker process");
                    None
                }
            };

            let _ = exited.send(Some(code));
            procs.lock().await.remove(&token);
            exits.notify(code);
        });
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the generated `--ros-args` section for a request.
pub fn ros_arguments(request: &LaunchRequest) -> Vec<String> {
    let d = request.descriptor();
    let mut args = vec![
        "--ros-args".to_string(),
        "-r".to_string(),
        format!("__node:={}", request.name()),
    ];

    let ns = request.namespace().trim_matches('/');
    if !ns.is_empty() {
        args.push("-r".to_string());
        args.push(format!("__ns:=/{ns}"));
    }
    for (from, to) in &d.remappings {
        args.push("-r".to_string());
        args.push(format!("{from}:={to}"));
    }
    if let Some(params) = &d.params_file {
        args.push("--params-file".to_string());
        args.push(params.display().to_string());
    }
    if let Some(level) = &d.log_level {
        args.push("--log-level".to_string());
        args.push(level.clone());
    }
    args
}

fn build_command(request: &LaunchRequest) -> Command {
    let d = request.descriptor();
    let mut cmd = Command::new(&d.program);
    cmd.args(&d.args);
    if d.ros_args {
        cmd.args(ros_arguments(request));
    }
    cmd.envs(&d.env);
    if let Some(cwd) = &d.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

/// Asks the process to exit: SIGTERM on unix.
#[cfg(unix)]
fn terminate(proc: &Proc) -> Result<(), LaunchError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = proc.pid else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(|_| LaunchError::Rejected {
        reason: format!("pid {pid} out of range"),
    })?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|errno| LaunchError::Signal {
        source: std::io::Error::from(errno),
    })
}

/// No graceful termination signal elsewhere; the waiter kills the child.
#[cfg(not(unix))]
fn terminate(proc: &Proc) -> Result<(), LaunchError> {
    proc.kill.cancel();
    Ok(())
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn start(
        &self,
        request: LaunchRequest,
        exits: ExitNotifier,
    ) -> Result<LaunchToken, LaunchError> {
        let child = build_command(&request)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: request.descriptor().program.clone(),
                source,
            })?;

        let token = LaunchToken::new(self.next.fetch_add(1, Ordering::Relaxed));
        let pid = child.id();
        let kill = CancellationToken::new();
        let (exited_tx, exited_rx) = watch::channel(None);

        debug!(worker = request.name(), token = %token, pid = ?pid, "spawned worker process");
        self.procs.lock().await.insert(
            token,
            Proc {
                name: request.name().to_string(),
                pid,
                kill: kill.clone(),
                exited: exited_rx,
            },
        );
        self.spawn_waiter(token, child, kill, exited_tx, exits);
        Ok(token)
    }

    async fn configure(&self, token: LaunchToken) -> Result<(), LaunchError> {
        let mut exited = match self.exit_watch(token).await {
            Ok(rx) => rx,
            // The waiter already removed it: the process is gone.
            Err(LaunchError::UnknownToken { .. }) => {
                return Err(LaunchError::SetupFailed { code: None });
            }
            Err(e) => return Err(e),
        };
        let waited = tokio::time::timeout(self.settle, exited.wait_for(Option::is_some))
            .await
            .map(|res| res.map(|code| (*code).flatten()));
        match waited {
            // Still running after the settle window.
            Err(_) => Ok(()),
            Ok(Ok(code)) => Err(LaunchError::SetupFailed { code }),
            Ok(Err(_)) => Err(LaunchError::SetupFailed { code: None }),
        }
    }

    async fn activate(&self, token: LaunchToken) -> Result<(), LaunchError> {
        match self.exit_status(token).await {
            Ok(None) => Ok(()),
            Ok(Some(code)) => Err(LaunchError::ActivationFailed {
                reason: format!("process exited with code {code:?}"),
            }),
            Err(_) => Err(LaunchError::ActivationFailed {
                reason: "process is gone".to_string(),
            }),
        }
    }

    async fn stop(&self, token: LaunchToken) -> Result<(), LaunchError> {
        let procs = self.procs.lock().await;
        let proc = procs
            .get(&token)
            .ok_or(LaunchError::UnknownToken { token })?;
        debug!(worker = %proc.name, token = %token, "stopping worker process");
        terminate(proc)
    }

    async fn kill(&self, token: LaunchToken) {
        if let Some(proc) = self.procs.lock().await.get(&token) {
            debug!(worker = %proc.name, token = %token, "killing worker process");
            proc.kill.cancel();
        }
    }

    fn name(&self) -> &'static str {
        "ProcessLauncher"
    }
}
