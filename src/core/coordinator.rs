//! # Coordinator: the single writer of all handle state.
//!
//! One task owns every [`ProcessHandle`] and processes the inbound queue
//! sequentially. Launcher calls and respawn timers run on spawned tasks and
//! report back through the same queue, so no handle is ever touched
//! concurrently.
//!
//! ## Architecture
//! ```text
//!   Supervisor API ──Command──┐
//!   launcher tasks ──Configured/Activated──┐
//!   ExitNotifier ───Exited──────────────────┤
//!   respawn timers ─RespawnDue──────────────┤
//!                                           ▼
//!                              [unbounded inbound queue]
//!                                           │
//!                                    Coordinator::run
//!                          handle(msg) ─► drive() ─► record(transition)
//!                                                        │
//!                                  Bus / statuses watch / readiness watch
//! ```
//!
//! ## Rules
//! - Every launcher result carries the handle generation; stale results are dropped
//!   (and a process they started is killed).
//! - `drive()` runs after every message: deferred stops, bring-up progress, activations.
//! - Respawn delays are timers on spawned tasks, cancelled when shutdown starts.
//! - Shutdown stops handles in reverse startup order; stop calls are issued sequentially.
//! - After `shutdown_timeout` the remaining handles are killed and finalized.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::bring_up::{BringUp, BringUpOutcome, Step};
use crate::core::handle::{ExitOutcome, ProcessHandle, StopAction, Transition, WorkerStatus};
use crate::core::inbound::{Command, Inbound};
use crate::core::readiness::ReadinessAggregator;
use crate::core::shutdown::{ShutdownSignals, next_signal};
use crate::core::{LifecycleState, Readiness, SupervisorConfig};
use crate::error::{ControlError, LaunchError, RuntimeError, WorkerFailure};
use crate::events::{Bus, Event, EventKind};
use crate::launcher::{ExitNotifier, LaunchRequest, LaunchToken, Launcher};
use crate::registry::WorkerRegistry;

/// Channels and shared parts handed over by the supervisor.
pub(crate) struct CoordinatorParts {
    pub cfg: SupervisorConfig,
    pub bus: Bus,
    pub launcher: Arc<dyn Launcher>,
    pub inbox_tx: mpsc::UnboundedSender<Inbound>,
    pub readiness_tx: watch::Sender<Readiness>,
    pub outcome_tx: watch::Sender<Option<BringUpOutcome>>,
    pub statuses_tx: watch::Sender<Vec<WorkerStatus>>,
    pub timers: CancellationToken,
}

pub(crate) struct Coordinator {
    cfg: SupervisorConfig,
    bus: Bus,
    launcher: Arc<dyn Launcher>,
    namespace: Arc<str>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    handles: Vec<ProcessHandle>,
    bring_up: BringUp,
    readiness: ReadinessAggregator,
    outcome_tx: watch::Sender<Option<BringUpOutcome>>,
    statuses_tx: watch::Sender<Vec<WorkerStatus>>,
    timers: CancellationToken,
    shutting_down: bool,
    /// `None` while running, or when the timeout does not fit an `Instant`.
    deadline: Option<Instant>,
}

impl Coordinator {
    pub fn new(parts: CoordinatorParts, registry: WorkerRegistry) -> Self {
        let handles = registry
            .iter()
            .map(|spec| ProcessHandle::new(Arc::clone(spec)))
            .collect();

        Self {
            namespace: Arc::from(parts.cfg.namespace.as_str()),
            bring_up: BringUp::new(parts.cfg.on_failure),
            cfg: parts.cfg,
            bus: parts.bus,
            launcher: parts.launcher,
            inbox_tx: parts.inbox_tx,
            handles,
            readiness: ReadinessAggregator::new(parts.readiness_tx),
            outcome_tx: parts.outcome_tx,
            statuses_tx: parts.statuses_tx,
            timers: parts.timers,
            shutting_down: false,
            deadline: None,
        }
    }

    /// Runs until every handle is finalized after a shutdown request.
    pub async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Inbound>,
    ) -> Result<(), RuntimeError> {
        let mut signals = if self.cfg.handle_signals {
            Some(ShutdownSignals::register().map_err(|source| RuntimeError::Signal { source })?)
        } else {
            None
        };

        info!(
            workers = self.handles.len(),
            launcher = self.launcher.name(),
            autostart = self.cfg.autostart,
            "supervisor started"
        );
        self.touch();
        if self.cfg.autostart {
            self.start_bring_up();
        }
        self.drive();

        loop {
            if self.all_finalized() {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                info!("all workers stopped");
                return Ok(());
            }

            let deadline = self.deadline;
            let shutting_down = self.shutting_down;
            tokio::select! {
                msg = inbox.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => self.begin_shutdown(),
                },
                _ = next_signal(&mut signals), if !shutting_down => {
                    info!("termination signal received");
                    self.begin_shutdown();
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    return Err(self.force_shutdown().await);
                }
            }
            self.drive();
        }
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    fn all_finalized(&self) -> bool {
        self.is_shutting_down()
            && self
                .handles
                .iter()
                .all(|h| h.state() == LifecycleState::Finalized)
    }

    fn handle(&mut self, msg: Inbound) {
        match msg {
            Inbound::Command(cmd) => self.on_command(cmd),
            Inbound::Configured {
                worker,
                generation,
                result,
            } => self.on_configured(worker, generation, result),
            Inbound::Activated {
                worker,
                generation,
                result,
            } => self.on_activated(worker, generation, result),
            Inbound::Exited {
                worker,
                generation,
                code,
            } => self.on_exited(worker, generation, code),
            Inbound::RespawnDue { worker, generation } => self.on_respawn_due(worker, generation),
        }
    }

    fn find(&self, name: &str) -> Result<usize, ControlError> {
        self.handles
            .iter()
            .position(|h| h.name() == name)
            .ok_or_else(|| ControlError::UnknownWorker {
                name: name.to_string(),
            })
    }

    fn on_command(&mut self, cmd: Command) {
        if self.is_shutting_down() {
            match cmd {
                Command::Startup { reply } | Command::Launch { reply, .. } | Command::Stop { reply, .. } => {
                    let _ = reply.send(Err(ControlError::Closed));
                }
                Command::Shutdown => {}
            }
            return;
        }

        match cmd {
            Command::Startup { reply } => {
                self.start_bring_up();
                let _ = reply.send(Ok(()));
            }
            Command::Launch { name, reply } => {
                let _ = reply.send(self.launch(&name));
            }
            Command::Stop { name, reply } => {
                let _ = reply.send(self.stop(&name));
            }
            Command::Shutdown => self.begin_shutdown(),
        }
    }

    fn launch(&mut self, name: &str) -> Result<(), ControlError> {
        let idx = self.find(name)?;
        let t = self.handles[idx].request_launch()?;
        self.record(idx, t);
        self.spawn_start(idx);
        Ok(())
    }

    fn stop(&mut self, name: &str) -> Result<(), ControlError> {
        let idx = self.find(name)?;
        let state = self.handles[idx].state();
        if state == LifecycleState::Finalized {
            return Err(ControlError::InvalidTransition {
                worker: name.to_string(),
                state,
                op: "stop",
            });
        }
        self.stop_worker(idx);
        Ok(())
    }

    fn stop_worker(&mut self, idx: usize) {
        match self.handles[idx].begin_stop() {
            StopAction::Deactivate(t, token) => {
                self.record(idx, t);
                self.spawn_stops(vec![(self.handles[idx].name().to_string(), token)]);
            }
            StopAction::Finalize(t) => self.record(idx, t),
            StopAction::Deferred => {
                debug!(worker = self.handles[idx].name(), "stop deferred until the pending step completes");
            }
            StopAction::Noop => {}
        }
    }

    fn on_configured(
        &mut self,
        idx: usize,
        generation: u64,
        result: Result<LaunchToken, (Option<LaunchToken>, LaunchError)>,
    ) {
        if !self.handles[idx].expects(generation, LifecycleState::Configuring) {
            debug!(worker = self.handles[idx].name(), generation, "dropping stale configure result");
            if let Ok(token) | Err((Some(token), _)) = result {
                self.spawn_kill(token);
            }
            return;
        }

        match result {
            Ok(token) => {
                let t = self.handles[idx].configured(token);
                self.record(idx, t);
            }
            Err((token, err)) => {
                let reason = err.to_string();
                let t = self.handles[idx].configure_failed(WorkerFailure::ConfigurationError {
                    reason: reason.clone(),
                });
                self.record(idx, t);
                self.bus.publish(
                    Event::new(EventKind::ConfigurationFailed)
                        .with_worker(self.handles[idx].name())
                        .with_reason(reason),
                );
                if let Some(token) = token {
                    self.spawn_kill(token);
                }
            }
        }
    }

    fn on_activated(&mut self, idx: usize, generation: u64, result: Result<(), LaunchError>) {
        if !self.handles[idx].expects(generation, LifecycleState::Activating) {
            debug!(worker = self.handles[idx].name(), generation, "dropping stale activate result");
            return;
        }

        match result {
            Ok(()) => {
                let t = self.handles[idx].activated();
                self.record(idx, t);
            }
            Err(err) => {
                let reason = err.to_string();
                let (t, token) = self.handles[idx].activate_failed(WorkerFailure::ActivationError {
                    reason: reason.clone(),
                });
                self.record(idx, t);
                self.bus.publish(
                    Event::new(EventKind::ActivationFailed)
                        .with_worker(self.handles[idx].name())
                        .with_reason(reason),
                );
                if let Some(token) = token {
                    self.spawn_kill(token);
                }
            }
        }
    }

    fn on_exited(&mut self, idx: usize, generation: u64, code: Option<i32>) {
        match self.handles[idx].on_exit(generation, code) {
            ExitOutcome::Stale => {
                debug!(worker = self.handles[idx].name(), generation, ?code, "ignoring stale exit");
            }
            ExitOutcome::Stopped(t) => self.record(idx, t),
            ExitOutcome::Crashed(t) => {
                self.record(idx, t);
                let h = &self.handles[idx];
                self.bus.publish(
                    Event::new(EventKind::WorkerCrashed)
                        .with_worker(h.name())
                        .with_exit_code(code)
                        .with_restarts(h.restart_count()),
                );
                self.on_crash(idx);
            }
        }
    }

    fn on_crash(&mut self, idx: usize) {
        if self.is_shutting_down() {
            return;
        }

        let h = &self.handles[idx];
        let policy = self.cfg.respawn_policy(h.spec());
        let restarts = h.restart_count();

        if policy.allows(restarts) {
            let delay = policy.delay_for(restarts);
            self.bus.publish(
                Event::new(EventKind::RespawnScheduled)
                    .with_worker(h.name())
                    .with_restarts(restarts)
                    .with_delay(delay),
            );

            let generation = h.generation();
            let tx = self.inbox_tx.clone();
            let timers = self.timers.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = sleep(delay) => {
                        let _ = tx.send(Inbound::RespawnDue { worker: idx, generation });
                    }
                    _ = timers.cancelled() => {}
                }
            });
        } else {
            let h = &mut self.handles[idx];
            h.exhaust();
            let mut ev = Event::new(EventKind::RespawnExhausted)
                .with_worker(h.name())
                .with_exit_code(h.last_exit_code())
                .with_restarts(restarts);
            if let Some(failure) = h.failure() {
                ev = ev.with_reason(failure.to_string());
            }
            self.bus.publish(ev);
            self.touch();
        }
    }

    fn on_respawn_due(&mut self, idx: usize, generation: u64) {
        if self.is_shutting_down() || !self.handles[idx].expects(generation, LifecycleState::Exited) {
            return;
        }
        if let Some(t) = self.handles[idx].respawn() {
            self.record(idx, t);
            self.spawn_start(idx);
        }
    }

    /// Applies everything that follows from the current handle states.
    fn drive(&mut self) {
        let shutting_down = self.is_shutting_down();

        for idx in 0..self.handles.len() {
            let h = &self.handles[idx];
            let deferred = h.stop_requested()
                && matches!(
                    h.state(),
                    LifecycleState::Unconfigured | LifecycleState::Inactive | LifecycleState::Active
                );
            let orphaned = shutting_down && h.state() == LifecycleState::Exited;
            if deferred || orphaned {
                self.stop_worker(idx);
            }
        }
        if shutting_down {
            return;
        }

        self.advance_bring_up();

        for idx in 0..self.handles.len() {
            let h = &self.handles[idx];
            if h.state() != LifecycleState::Inactive || h.stop_requested() || !self.bring_up.may_activate(idx) {
                continue;
            }
            if let Some((t, token)) = self.handles[idx].request_activate() {
                self.record(idx, t);
                self.spawn_activate(idx, token);
            }
        }
    }

    fn start_bring_up(&mut self) {
        if self.bring_up.start() {
            info!(workers = self.handles.len(), "bring-up started");
            self.bus.publish(Event::new(EventKind::BringUpStarted));
        }
    }

    fn advance_bring_up(&mut self) {
        match self.bring_up.next_step(&self.handles) {
            None | Some(Step::Wait) => {}
            Some(Step::Launch(idx)) => match self.handles[idx].request_launch() {
                Ok(t) => {
                    self.record(idx, t);
                    self.spawn_start(idx);
                }
                Err(err) => warn!(worker = self.handles[idx].name(), error = %err, "bring-up launch refused"),
            },
            Some(Step::Finished(outcome)) => self.finish_bring_up(outcome),
        }
    }

    fn finish_bring_up(&mut self, outcome: BringUpOutcome) {
        info!(outcome = outcome.as_label(), "bring-up finished");
        let mut ev = Event::new(EventKind::BringUpFinished).with_reason(outcome.as_label());
        if let BringUpOutcome::BringUpFailed { failed_worker } = &outcome {
            ev = ev.with_worker(failed_worker.as_str());
        }
        self.bus.publish(ev);
        self.outcome_tx.send_replace(Some(outcome));
    }

    fn begin_shutdown(&mut self) {
        if self.is_shutting_down() {
            return;
        }
        info!(timeout = ?self.cfg.shutdown_timeout, "shutdown requested");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        if let Some(outcome) = self.bring_up.cancel() {
            self.finish_bring_up(outcome);
        }
        self.shutting_down = true;
        self.deadline = Instant::now().checked_add(self.cfg.shutdown_timeout);
        if self.deadline.is_none() {
            warn!(timeout = ?self.cfg.shutdown_timeout, "shutdown timeout out of range, waiting without deadline");
        }
        self.timers.cancel();

        let mut stops = Vec::new();
        for idx in (0..self.handles.len()).rev() {
            match self.handles[idx].begin_stop() {
                StopAction::Deactivate(t, token) => {
                    self.record(idx, t);
                    stops.push((self.handles[idx].name().to_string(), token));
                }
                StopAction::Finalize(t) => self.record(idx, t),
                StopAction::Deferred | StopAction::Noop => {}
            }
        }
        self.spawn_stops(stops);
    }

    async fn force_shutdown(&mut self) -> RuntimeError {
        let mut stuck = Vec::new();
        let mut kills = Vec::new();

        for idx in (0..self.handles.len()).rev() {
            let Some((t, token)) = self.handles[idx].force_terminate() else {
                continue;
            };
            let name = self.handles[idx].name().to_string();
            self.record(idx, t);
            self.bus
                .publish(Event::new(EventKind::WorkerForced).with_worker(name.as_str()));
            kills.extend(token);
            stuck.push(name);
        }

        join_all(kills.into_iter().map(|token| self.launcher.kill(token))).await;

        warn!(stuck = ?stuck, "shutdown timeout exceeded, workers killed");
        self.bus.publish(
            Event::new(EventKind::ShutdownTimeout)
                .with_delay(self.cfg.shutdown_timeout)
                .with_reason(stuck.join(",")),
        );
        RuntimeError::ForcedShutdown {
            timeout: self.cfg.shutdown_timeout,
            stuck,
        }
    }

    /// Publishes a transition and refreshes every derived view.
    fn record(&self, idx: usize, t: Transition) {
        let name = self.handles[idx].name();
        debug!(worker = name, from = %t.from, to = %t.to, "transition");
        self.bus
            .publish(Event::transition(name, t.from, t.to).with_at(t.at));
        self.touch();
    }

    fn touch(&self) {
        self.statuses_tx
            .send_replace(self.handles.iter().map(ProcessHandle::status).collect());
        if let Some(readiness) = self.readiness.update(&self.handles) {
            info!(readiness = %readiness, "readiness changed");
            self.bus.publish(Event::readiness(readiness));
        }
    }

    fn spawn_start(&self, idx: usize) {
        let h = &self.handles[idx];
        let generation = h.generation();
        let request = LaunchRequest::new(Arc::clone(h.spec()), Arc::clone(&self.namespace), h.restart_count());
        let exits = ExitNotifier::new(idx, generation, self.inbox_tx.clone());
        let launcher = Arc::clone(&self.launcher);
        let tx = self.inbox_tx.clone();

        tokio::spawn(async move {
            let result = match launcher.start(request, exits).await {
                Ok(token) => match launcher.configure(token).await {
                    Ok(()) => Ok(token),
                    Err(err) => Err((Some(token), err)),
                },
                Err(err) => Err((None, err)),
            };
            let _ = tx.send(Inbound::Configured {
                worker: idx,
                generation,
                result,
            });
        });
    }

    fn spawn_activate(&self, idx: usize, token: LaunchToken) {
        let generation = self.handles[idx].generation();
        let launcher = Arc::clone(&self.launcher);
        let tx = self.inbox_tx.clone();

        tokio::spawn(async move {
            let result = launcher.activate(token).await;
            let _ = tx.send(Inbound::Activated {
                worker: idx,
                generation,
                result,
            });
        });
    }

    /// Issues stop requests one after another; a failed stop escalates to a kill.
    fn spawn_stops(&self, stops: Vec<(String, LaunchToken)>) {
        if stops.is_empty() {
            return;
        }
        let launcher = Arc::clone(&self.launcher);
        tokio::spawn(async move {
            for (worker, token) in stops {
                if let Err(err) = launcher.stop(token).await {
                    warn!(worker = %worker, error = %err, "stop failed, killing");
                    launcher.kill(token).await;
                }
            }
        });
    }

    fn spawn_kill(&self, token: LaunchToken) {
        let launcher = Arc::clone(&self.launcher);
        tokio::spawn(async move { launcher.kill(token).await });
    }
}
