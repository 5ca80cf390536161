//! # Readiness aggregate.
//!
//! Derived from the states of all *required* workers:
//!
//! | Readiness  | Condition                                          |
//! |------------|----------------------------------------------------|
//! | `Degraded` | at least one required worker failed terminally     |
//! | `Ready`    | every required worker is `Active` (also when none) |
//! | `NotReady` | otherwise                                          |
//!
//! The value is recomputed after every transition and pushed through a
//! [`tokio::sync::watch`] channel; observers only wake up on actual changes.

use std::fmt;

use tokio::sync::watch;

use crate::core::LifecycleState;
use crate::core::handle::ProcessHandle;

/// Aggregate health of the supervised set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Readiness {
    /// Some required worker is not `Active` yet (or any more).
    #[default]
    NotReady,
    /// All required workers are `Active`.
    Ready,
    /// A required worker failed and will not recover on its own.
    Degraded,
}

impl Readiness {
    /// Returns a stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::NotReady => "not_ready",
            Readiness::Ready => "ready",
            Readiness::Degraded => "degraded",
        }
    }

    /// Returns `true` for [`Readiness::Ready`].
    #[inline]
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn compute(handles: &[ProcessHandle]) -> Readiness {
    let mut ready = true;
    for h in handles.iter().filter(|h| h.spec().required()) {
        if h.failure().is_some() {
            return Readiness::Degraded;
        }
        ready &= h.state() == LifecycleState::Active;
    }
    if ready {
        Readiness::Ready
    } else {
        Readiness::NotReady
    }
}

/// Owns the sending side of the readiness channel.
pub(crate) struct ReadinessAggregator {
    tx: watch::Sender<Readiness>,
}

impl ReadinessAggregator {
    pub fn new(tx: watch::Sender<Readiness>) -> Self {
        Self { tx }
    }

    /// Recomputes readiness; returns the new value if it changed.
    pub fn update(&self, handles: &[ProcessHandle]) -> Option<Readiness> {
        let next = compute(handles);
        self.tx
            .send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            })
            .then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerFailure;
    use crate::launcher::LaunchToken;
    use crate::registry::{LaunchDescriptor, WorkerSpec};
    use std::sync::Arc;

    fn handle(name: &str, required: bool) -> ProcessHandle {
        let spec = WorkerSpec::new(name, LaunchDescriptor::new(name)).with_required(required);
        ProcessHandle::new(Arc::new(spec))
    }

    fn activate(h: &mut ProcessHandle) {
        h.request_launch().unwrap();
        h.configured(LaunchToken::new(1));
        h.request_activate().unwrap();
        h.activated();
    }

    #[test]
    fn test_empty_set_is_ready() {
        assert_eq!(compute(&[]), Readiness::Ready);
        assert_eq!(compute(&[handle("opt", false)]), Readiness::Ready);
    }

    #[test]
    fn test_optional_workers_are_ignored() {
        let mut a = handle("a", true);
        activate(&mut a);
        let mut b = handle("b", false);
        b.request_launch().unwrap();
        b.configure_failed(WorkerFailure::ConfigurationError { reason: "x".into() });
        assert_eq!(compute(&[a, b]), Readiness::Ready);
    }

    #[test]
    fn test_failure_degrades() {
        let mut handles = vec![handle("a", true), handle("b", true)];
        activate(&mut handles[0]);
        handles[1].request_launch().unwrap();
        assert_eq!(compute(&handles), Readiness::NotReady);

        handles[1].configure_failed(WorkerFailure::ConfigurationError { reason: "x".into() });
        assert_eq!(compute(&handles), Readiness::Degraded);
    }

    #[test]
    fn test_update_reports_changes_only() {
        let (tx, rx) = watch::channel(Readiness::NotReady);
        let agg = ReadinessAggregator::new(tx);

        let mut handles = vec![handle("a", true)];
        assert_eq!(agg.update(&handles), None);

        activate(&mut handles[0]);
        assert_eq!(agg.update(&handles), Some(Readiness::Ready));
        assert_eq!(agg.update(&handles), None);
        assert_eq!(*rx.borrow(), Readiness::Ready);
    }
}
