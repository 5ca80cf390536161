#![allow(dead_code, clippy::unwrap_used)] // Shared by several test binaries

//! In-memory launcher and helpers shared by the integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use nodevisor::{
    Event, ExitNotifier, LaunchDescriptor, LaunchError, LaunchRequest, LaunchToken, Launcher,
    RuntimeError, Supervisor, SupervisorConfig, WorkerRegistry, WorkerSpec,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Start,
    Configure,
    Activate,
    Stop,
    Kill,
}

#[derive(Clone, Debug)]
pub struct Call {
    pub kind: CallKind,
    pub worker: String,
    pub at: Instant,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    live: HashMap<LaunchToken, (String, ExitNotifier)>,
    fail_configure: HashSet<String>,
    fail_activate: HashSet<String>,
    stuck_on_stop: HashSet<String>,
    configure_delay: HashMap<String, Duration>,
    kill_delay: HashMap<String, Duration>,
}

/// Launcher that keeps "processes" in memory.
///
/// `stop` makes the process exit with code 0 unless the worker is marked stuck;
/// `kill` makes it exit without a code.
#[derive(Default)]
pub struct FakeLauncher {
    next: AtomicU64,
    inner: Mutex<Inner>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_configure(&self, worker: &str) {
        self.inner.lock().unwrap().fail_configure.insert(worker.into());
    }

    pub fn fail_activate(&self, worker: &str) {
        self.inner.lock().unwrap().fail_activate.insert(worker.into());
    }

    pub fn stuck_on_stop(&self, worker: &str) {
        self.inner.lock().unwrap().stuck_on_stop.insert(worker.into());
    }

    pub fn slow_configure(&self, worker: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .configure_delay
            .insert(worker.into(), delay);
    }

    pub fn slow_kill(&self, worker: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .kill_delay
            .insert(worker.into(), delay);
    }

    /// Makes the live process of `worker` exit on its own; `false` if none is live.
    pub fn crash(&self, worker: &str, code: Option<i32>) -> bool {
        let notifier = {
            let mut inner = self.inner.lock().unwrap();
            let token = inner
                .live
                .iter()
                .find(|(_, (name, _))| name == worker)
                .map(|(token, _)| *token);
            token.and_then(|t| inner.live.remove(&t)).map(|(_, n)| n)
        };
        match notifier {
            Some(n) => {
                n.notify(code);
                true
            }
            None => false,
        }
    }

    /// Names of the workers that received `kind`, in call order.
    pub fn calls(&self, kind: CallKind) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.worker.clone())
            .collect()
    }

    /// Times at which `worker` received `kind`.
    pub fn times(&self, kind: CallKind, worker: &str) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.kind == kind && c.worker == worker)
            .map(|c| c.at)
            .collect()
    }

    pub fn count(&self, kind: CallKind, worker: &str) -> usize {
        self.times(kind, worker).len()
    }

    fn record(&self, kind: CallKind, worker: &str) {
        self.inner.lock().unwrap().calls.push(Call {
            kind,
            worker: worker.to_string(),
            at: Instant::now(),
        });
    }

    fn name_of(&self, token: LaunchToken) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .live
            .get(&token)
            .map(|(name, _)| name.clone())
    }

    fn exit(&self, token: LaunchToken, code: Option<i32>) {
        let notifier = self.inner.lock().unwrap().live.remove(&token);
        if let Some((_, n)) = notifier {
            n.notify(code);
        }
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn start(
        &self,
        request: LaunchRequest,
        exits: ExitNotifier,
    ) -> Result<LaunchToken, LaunchError> {
        self.record(CallKind::Start, request.name());
        let token = LaunchToken::new(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner
            .lock()
            .unwrap()
            .live
            .insert(token, (request.name().to_string(), exits));
        Ok(token)
    }

    async fn configure(&self, token: LaunchToken) -> Result<(), LaunchError> {
        let name = self.name_of(token).unwrap_or_default();
        self.record(CallKind::Configure, &name);

        let (delay, fail) = {
            let inner = self.inner.lock().unwrap();
            (
                inner.configure_delay.get(&name).copied(),
                inner.fail_configure.contains(&name),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(LaunchError::SetupFailed { code: Some(1) });
        }
        Ok(())
    }

    async fn activate(&self, token: LaunchToken) -> Result<(), LaunchError> {
        let name = self.name_of(token).unwrap_or_default();
        self.record(CallKind::Activate, &name);
        if self.inner.lock().unwrap().fail_activate.contains(&name) {
            return Err(LaunchError::ActivationFailed {
                reason: "refused".into(),
            });
        }
        Ok(())
    }

    async fn stop(&self, token: LaunchToken) -> Result<(), LaunchError> {
        let Some(name) = self.name_of(token) else {
            return Err(LaunchError::UnknownToken { token });
        };
        self.record(CallKind::Stop, &name);
        if !self.inner.lock().unwrap().stuck_on_stop.contains(&name) {
            self.exit(token, Some(0));
        }
        Ok(())
    }

    async fn kill(&self, token: LaunchToken) {
        if let Some(name) = self.name_of(token) {
            self.record(CallKind::Kill, &name);
            let delay = self.inner.lock().unwrap().kill_delay.get(&name).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.exit(token, None);
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Default test configuration: no OS signals, everything else default.
pub fn config() -> SupervisorConfig {
    SupervisorConfig {
        handle_signals: false,
        ..SupervisorConfig::default()
    }
}

pub fn worker(name: &str, order: i64) -> WorkerSpec {
    WorkerSpec::new(name, LaunchDescriptor::new(name)).with_order(order)
}

pub fn registry(workers: Vec<WorkerSpec>) -> WorkerRegistry {
    WorkerRegistry::new(workers).unwrap()
}

/// Builds a supervisor over `launcher`.
pub fn supervisor(cfg: SupervisorConfig, launcher: &Arc<FakeLauncher>) -> Arc<Supervisor> {
    let launcher: Arc<dyn Launcher> = launcher.clone();
    Supervisor::builder(cfg, launcher).build()
}

pub fn spawn_run(
    sup: &Arc<Supervisor>,
    registry: WorkerRegistry,
) -> JoinHandle<Result<(), RuntimeError>> {
    let sup = Arc::clone(sup);
    tokio::spawn(async move { sup.run(registry).await })
}

/// Receives events until one matches; panics if none arrives within a long (virtual) timeout.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<Event>,
    mut pred: impl FnMut(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            let ev = rx.recv().await.unwrap();
            if pred(&ev) {
                return ev;
            }
        }
    })
    .await
    .expect("event did not arrive")
}

/// Everything already published on the bus.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}
