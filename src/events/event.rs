//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: worker state transitions (`from` → `to`)
//! - **Failure events**: setup/activation failures, crashes, respawn decisions
//! - **Aggregate events**: readiness changes and the bring-up outcome
//! - **Shutdown events**: shutdown requested, completed, forced
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker name,
//! reasons, exit codes and respawn delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! All worker events are published from the single coordinator task, so for one
//! supervisor the `seq` order matches the order in which transitions were applied.
//!
//! ## Example
//! ```rust
//! use nodevisor::{Event, EventKind, LifecycleState};
//!
//! let ev = Event::transition("planner_server", LifecycleState::Inactive, LifecycleState::Activating);
//!
//! assert_eq!(ev.kind, EventKind::WorkerTransition);
//! assert_eq!(ev.worker.as_deref(), Some("planner_server"));
//! assert_eq!(ev.to, Some(LifecycleState::Activating));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::{LifecycleState, Readiness};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Lifecycle events ===
    /// A worker moved from one lifecycle state to another.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `from`, `to`: lifecycle states
    WorkerTransition,

    // === Failure events ===
    /// The setup step of a worker failed; it will not be retried.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: launcher error
    ConfigurationFailed,

    /// The activation step of a worker failed; it will not be retried.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: launcher error
    ActivationFailed,

    /// A worker exited without a stop request.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `exit_code`: exit code (absent when killed by a signal)
    /// - `restarts`: automatic restarts performed so far
    WorkerCrashed,

    /// A respawn was scheduled after a crash.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `delay_ms`: delay before the relaunch (ms)
    /// - `restarts`: restarts performed before this one
    RespawnScheduled,

    /// The worker crashed and its respawn policy forbids another attempt.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `exit_code`: last exit code
    /// - `restarts`: restarts performed
    /// - `reason`: failure message
    RespawnExhausted,

    /// A worker was force-terminated after the shutdown timeout.
    ///
    /// Sets:
    /// - `worker`: worker name
    WorkerForced,

    // === Aggregate events ===
    /// The readiness aggregate changed.
    ///
    /// Sets:
    /// - `readiness`: new value
    ReadinessChanged,

    /// The ordered bring-up sequence started.
    BringUpStarted,

    /// The ordered bring-up sequence finished.
    ///
    /// Sets:
    /// - `reason`: outcome label (`success`, `bring_up_failed`, `partial_ready`, `cancelled`)
    /// - `worker`: failed worker (only for `bring_up_failed`)
    BringUpFinished,

    // === Shutdown events ===
    /// Shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All workers reached `Finalized` within the shutdown timeout.
    AllStoppedWithin,

    /// Shutdown timeout exceeded; remaining workers were force-terminated.
    ///
    /// Sets:
    /// - `delay_ms`: configured timeout (ms)
    /// - `reason`: comma-separated names of the killed workers
    ShutdownTimeout,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker (or subscriber), if applicable.
    pub worker: Option<Arc<str>>,
    /// Previous lifecycle state (transitions only).
    pub from: Option<LifecycleState>,
    /// New lifecycle state (transitions only).
    pub to: Option<LifecycleState>,
    /// Human-readable reason (errors, overflow details, outcome label).
    pub reason: Option<Arc<str>>,
    /// Process exit code.
    pub exit_code: Option<i32>,
    /// Automatic restarts performed so far.
    pub restarts: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Readiness aggregate (readiness changes only).
    pub readiness: Option<Readiness>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            from: None,
            to: None,
            reason: None,
            exit_code: None,
            restarts: None,
            delay_ms: None,
            readiness: None,
        }
    }

    /// Creates a lifecycle transition event.
    pub fn transition(worker: impl Into<Arc<str>>, from: LifecycleState, to: LifecycleState) -> Self {
        let mut ev = Event::new(EventKind::WorkerTransition).with_worker(worker);
        ev.from = Some(from);
        ev.to = Some(to);
        ev
    }

    /// Creates a readiness change event.
    pub fn readiness(value: Readiness) -> Self {
        let mut ev = Event::new(EventKind::ReadinessChanged);
        ev.readiness = Some(value);
        ev
    }

    /// Overrides the timestamp (used to carry the transition time of a handle).
    #[inline]
    pub fn with_at(mut self, at: SystemTime) -> Self {
        self.at = at;
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches the restart counter.
    #[inline]
    pub fn with_restarts(mut self, n: u32) -> Self {
        self.restarts = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for a transition of `worker` into `to`.
    #[inline]
    pub fn is_transition_to(&self, worker: &str, to: LifecycleState) -> bool {
        self.kind == EventKind::WorkerTransition
            && self.worker.as_deref() == Some(worker)
            && self.to == Some(to)
    }
}
