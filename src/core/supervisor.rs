//! # Supervisor: public face of the lifecycle runtime.
//!
//! The [`Supervisor`] owns the event bus, the [`SubscriberSet`], the injected
//! [`Launcher`] and the sending side of the coordinator queue. All control
//! methods only enqueue a request; the coordinator applies it.
//!
//! ## High-level architecture
//! ```text
//! Supervisor::run(registry)
//!   ├─ subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   └─ Coordinator::run(inbox)            (single writer of handle state)
//!
//! Control API (any task)                    Observation
//!   startup()        ─┐                        readiness() / watch_readiness()
//!   request_launch() ─┼─► inbound queue        bring_up().await
//!   request_stop()   ─┤                        snapshot()
//!   shutdown()       ─┘                        subscribe()
//! ```
//!
//! ## Rules
//! - `run` may be called once; a second call returns [`RuntimeError::AlreadyRunning`].
//! - Requests made before `run` are queued and applied when it starts; do not await
//!   them on the task that is about to call `run`.
//! - After `run` returns, control requests fail with [`ControlError::Closed`].
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use nodevisor::{LogWriter, ProcessLauncher, Supervisor, SupervisorConfig, registry::loader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loaded = loader::load("nav.toml")?;
//!     let sup = Supervisor::builder(loaded.config, Arc::new(ProcessLauncher::new()))
//!         .with_subscribers(vec![Arc::new(LogWriter::new())])
//!         .build();
//!
//!     sup.run(loaded.registry).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::bring_up::BringUpOutcome;
use crate::core::builder::SupervisorBuilder;
use crate::core::coordinator::{Coordinator, CoordinatorParts};
use crate::core::handle::WorkerStatus;
use crate::core::inbound::{Command, Inbound, Reply};
use crate::core::{Readiness, SupervisorConfig};
use crate::error::{ControlError, RuntimeError};
use crate::events::{Bus, Event};
use crate::launcher::Launcher;
use crate::registry::WorkerRegistry;
use crate::subscribers::SubscriberSet;

/// Receiving/sending halves consumed by the single `run` call.
pub(crate) struct Pending {
    pub inbox_rx: mpsc::UnboundedReceiver<Inbound>,
    pub readiness_tx: watch::Sender<Readiness>,
    pub outcome_tx: watch::Sender<Option<BringUpOutcome>>,
    pub statuses_tx: watch::Sender<Vec<WorkerStatus>>,
}

/// Orchestrates worker bring-up, crash recovery and shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    launcher: Arc<dyn Launcher>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    readiness_rx: watch::Receiver<Readiness>,
    outcome_rx: watch::Receiver<Option<BringUpOutcome>>,
    statuses_rx: watch::Receiver<Vec<WorkerStatus>>,
    pending: Mutex<Option<Pending>>,
    runtime_token: CancellationToken,
}

impl Supervisor {
    /// Creates a builder; see [`SupervisorBuilder`].
    pub fn builder(cfg: SupervisorConfig, launcher: Arc<dyn Launcher>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, launcher)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (readiness_tx, readiness_rx) = watch::channel(Readiness::NotReady);
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let (statuses_tx, statuses_rx) = watch::channel(Vec::new());

        Self {
            cfg,
            bus,
            subs,
            launcher,
            inbox_tx,
            readiness_rx,
            outcome_rx,
            statuses_rx,
            pending: Mutex::new(Some(Pending {
                inbox_rx,
                readiness_tx,
                outcome_tx,
                statuses_tx,
            })),
            runtime_token: CancellationToken::new(),
        }
    }

    /// Supervises the workers of `registry` until shutdown completes.
    ///
    /// With `autostart` the ordered bring-up begins immediately; otherwise it
    /// waits for [`startup`](Self::startup) or individual launch requests.
    /// Returns `Ok(())` once every worker is finalized, or
    /// [`RuntimeError::ForcedShutdown`] if the shutdown timeout had to kill some.
    pub async fn run(&self, registry: WorkerRegistry) -> Result<(), RuntimeError> {
        let Some(pending) = self.pending.lock().await.take() else {
            return Err(RuntimeError::AlreadyRunning);
        };
        self.subscriber_listener();

        let coordinator = Coordinator::new(
            CoordinatorParts {
                cfg: self.cfg.clone(),
                bus: self.bus.clone(),
                launcher: Arc::clone(&self.launcher),
                inbox_tx: self.inbox_tx.clone(),
                readiness_tx: pending.readiness_tx,
                outcome_tx: pending.outcome_tx,
                statuses_tx: pending.statuses_tx,
                timers: self.runtime_token.child_token(),
            },
            registry,
        );
        let res = coordinator.run(pending.inbox_rx).await;
        self.runtime_token.cancel();
        res
    }

    /// Starts the ordered bring-up (no-op if it already ran).
    pub async fn startup(&self) -> Result<(), ControlError> {
        self.request(|reply| Command::Startup { reply }).await
    }

    /// Launches one worker from `Unconfigured`.
    ///
    /// Fails with [`ControlError::AlreadyRunning`] if the worker has a live
    /// instance; the handle is left untouched.
    pub async fn request_launch(&self, name: &str) -> Result<(), ControlError> {
        let name = name.to_string();
        self.request(|reply| Command::Launch { name, reply }).await
    }

    /// Gracefully stops one worker.
    pub async fn request_stop(&self, name: &str) -> Result<(), ControlError> {
        let name = name.to_string();
        self.request(|reply| Command::Stop { name, reply }).await
    }

    /// Stops every worker in reverse startup order and ends [`run`](Self::run).
    pub fn shutdown(&self) {
        let _ = self.inbox_tx.send(Inbound::Command(Command::Shutdown));
    }

    /// Current readiness aggregate.
    pub fn readiness(&self) -> Readiness {
        *self.readiness_rx.borrow()
    }

    /// Receiver notified on every readiness change.
    pub fn watch_readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness_rx.clone()
    }

    /// Waits for the ordered bring-up to finish.
    ///
    /// Resolves to [`BringUpOutcome::Cancelled`] if the run ends before the
    /// bring-up reported an outcome.
    pub async fn bring_up(&self) -> BringUpOutcome {
        let mut rx = self.outcome_rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(BringUpOutcome::Cancelled),
            Err(_) => BringUpOutcome::Cancelled,
        }
    }

    /// Per-worker status, in startup order. Empty before `run`.
    pub fn snapshot(&self) -> Vec<WorkerStatus> {
        self.statuses_rx.borrow().clone()
    }

    /// Subscribes to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<(), ControlError> {
        let (tx, rx) = oneshot::channel();
        self.inbox_tx
            .send(Inbound::Command(make(tx)))
            .map_err(|_| ControlError::Closed)?;
        rx.await.map_err(|_| ControlError::Closed)?
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Drains what is already buffered once the runtime token is cancelled.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
        });
    }
}
