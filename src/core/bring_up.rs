//! # Ordered bring-up.
//!
//! Walks the handles in startup order with a cursor. The worker under the
//! cursor is launched, and the cursor only moves on once that worker is
//! `Active` or has failed terminally. Workers behind the cursor are never
//! activated while the bring-up runs.
//!
//! ```text
//! Idle ──start──► Running{cursor} ──all handled──► Done(outcome)
//!                      │
//!                      └── shutdown ──► Done(Cancelled)
//! ```

use crate::core::LifecycleState;
use crate::core::handle::ProcessHandle;
use crate::policies::BringUpPolicy;

/// Result of the ordered bring-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BringUpOutcome {
    /// Every worker reached `Active`.
    Success,
    /// A worker failed terminally and the bring-up stopped there ([`BringUpPolicy::Halt`]).
    BringUpFailed {
        /// Name of the worker that failed.
        failed_worker: String,
    },
    /// Some workers failed and the rest were brought up ([`BringUpPolicy::Continue`]).
    PartialReady {
        /// Workers `Active` when the bring-up finished.
        ready_workers: Vec<String>,
        /// Workers that failed, in startup order.
        failed_workers: Vec<String>,
    },
    /// Shutdown started before the bring-up finished.
    Cancelled,
}

impl BringUpOutcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BringUpOutcome::Success => "success",
            BringUpOutcome::BringUpFailed { .. } => "bring_up_failed",
            BringUpOutcome::PartialReady { .. } => "partial_ready",
            BringUpOutcome::Cancelled => "cancelled",
        }
    }
}

/// Next action requested by the bring-up.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Launch(usize),
    Wait,
    Finished(BringUpOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { cursor: usize },
    Done,
}

pub(crate) struct BringUp {
    phase: Phase,
    policy: BringUpPolicy,
    failed: Vec<usize>,
}

impl BringUp {
    pub fn new(policy: BringUpPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            policy,
            failed: Vec::new(),
        }
    }

    /// Starts the bring-up; returns `false` if it already ran.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Running { cursor: 0 };
        true
    }

    /// Returns `true` if the worker at `index` may be activated now.
    pub fn may_activate(&self, index: usize) -> bool {
        match self.phase {
            Phase::Running { cursor } => index <= cursor,
            Phase::Idle | Phase::Done => true,
        }
    }

    /// Ends an unfinished bring-up.
    pub fn cancel(&mut self) -> Option<BringUpOutcome> {
        match self.phase {
            Phase::Idle | Phase::Running { .. } => {
                self.phase = Phase::Done;
                Some(BringUpOutcome::Cancelled)
            }
            Phase::Done => None,
        }
    }

    /// Advances the cursor over settled workers; `None` when not running.
    pub fn next_step(&mut self, handles: &[ProcessHandle]) -> Option<Step> {
        let Phase::Running { mut cursor } = self.phase else {
            return None;
        };

        // Workers already passed can still fail terminally (crash with no respawn left).
        for (idx, h) in handles.iter().enumerate().take(cursor) {
            if h.failure().is_none() || self.failed.contains(&idx) {
                continue;
            }
            self.failed.push(idx);
            if self.policy == BringUpPolicy::Halt {
                self.phase = Phase::Done;
                return Some(Step::Finished(BringUpOutcome::BringUpFailed {
                    failed_worker: h.name().to_string(),
                }));
            }
        }

        let step = loop {
            let Some(h) = handles.get(cursor) else {
                break Step::Finished(self.outcome(handles));
            };

            if h.state() == LifecycleState::Active {
                cursor += 1;
                continue;
            }
            if h.failure().is_some() || h.state() == LifecycleState::Finalized {
                self.failed.push(cursor);
                match self.policy {
                    BringUpPolicy::Halt => {
                        break Step::Finished(BringUpOutcome::BringUpFailed {
                            failed_worker: h.name().to_string(),
                        });
                    }
                    BringUpPolicy::Continue => {
                        cursor += 1;
                        continue;
                    }
                }
            }
            if h.state() == LifecycleState::Unconfigured {
                break Step::Launch(cursor);
            }
            break Step::Wait;
        };

        self.phase = match step {
            Step::Finished(_) => Phase::Done,
            _ => Phase::Running { cursor },
        };
        Some(step)
    }

    fn outcome(&self, handles: &[ProcessHandle]) -> BringUpOutcome {
        if self.failed.is_empty() {
            return BringUpOutcome::Success;
        }
        BringUpOutcome::PartialReady {
            ready_workers: handles
                .iter()
                .filter(|h| h.state() == LifecycleState::Active)
                .map(|h| h.name().to_string())
                .collect(),
            failed_workers: {
                let mut failed = self.failed.clone();
                failed.sort_unstable();
                failed.iter().map(|&i| handles[i].name().to_string()).collect()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerFailure;
    use crate::launcher::LaunchToken;
    use crate::registry::{LaunchDescriptor, WorkerSpec};
    use std::sync::Arc;

    fn handles(names: &[&str]) -> Vec<ProcessHandle> {
        names
            .iter()
            .map(|n| ProcessHandle::new(Arc::new(WorkerSpec::new(*n, LaunchDescriptor::new(*n)))))
            .collect()
    }

    fn activate(h: &mut ProcessHandle) {
        h.configured(LaunchToken::new(1));
        h.request_activate().unwrap();
        h.activated();
    }

    fn fail(h: &mut ProcessHandle) {
        h.configure_failed(WorkerFailure::ConfigurationError {
            reason: "boom".into(),
        });
    }

    #[test]
    fn test_not_started_yields_nothing() {
        let mut b = BringUp::new(BringUpPolicy::Halt);
        assert_eq!(b.next_step(&handles(&["a"])), None);
        assert!(b.may_activate(5));
    }

    #[test]
    fn test_launches_one_at_a_time() {
        let mut hs = handles(&["a", "b"]);
        let mut b = BringUp::new(BringUpPolicy::Halt);
        assert!(b.start());
        assert!(!b.start());

        assert_eq!(b.next_step(&hs), Some(Step::Launch(0)));
        hs[0].request_launch().unwrap();
        assert_eq!(b.next_step(&hs), Some(Step::Wait));
        assert!(!b.may_activate(1));

        activate(&mut hs[0]);
        assert_eq!(b.next_step(&hs), Some(Step::Launch(1)));
        assert!(b.may_activate(1));
        hs[1].request_launch().unwrap();
        activate(&mut hs[1]);

        assert_eq!(b.next_step(&hs), Some(Step::Finished(BringUpOutcome::Success)));
        assert_eq!(b.next_step(&hs), None);
    }

    #[test]
    fn test_halt_on_failure() {
        let mut hs = handles(&["a", "b"]);
        let mut b = BringUp::new(BringUpPolicy::Halt);
        b.start();
        b.next_step(&hs);
        hs[0].request_launch().unwrap();
        fail(&mut hs[0]);

        assert_eq!(
            b.next_step(&hs),
            Some(Step::Finished(BringUpOutcome::BringUpFailed {
                failed_worker: "a".into()
            }))
        );
    }

    #[test]
    fn test_continue_reports_partial() {
        let mut hs = handles(&["a", "b"]);
        let mut b = BringUp::new(BringUpPolicy::Continue);
        b.start();
        b.next_step(&hs);
        hs[0].request_launch().unwrap();
        fail(&mut hs[0]);

        assert_eq!(b.next_step(&hs), Some(Step::Launch(1)));
        hs[1].request_launch().unwrap();
        activate(&mut hs[1]);

        assert_eq!(
            b.next_step(&hs),
            Some(Step::Finished(BringUpOutcome::PartialReady {
                ready_workers: vec!["b".into()],
                failed_workers: vec!["a".into()],
            }))
        );
    }

    fn crash_out(h: &mut ProcessHandle) {
        let generation = h.generation();
        h.on_exit(generation, Some(1));
        h.exhaust();
    }

    #[test]
    fn test_exhausted_worker_behind_cursor_halts() {
        let mut hs = handles(&["a", "b"]);
        let mut b = BringUp::new(BringUpPolicy::Halt);
        b.start();
        hs[0].request_launch().unwrap();
        activate(&mut hs[0]);
        assert_eq!(b.next_step(&hs), Some(Step::Launch(1)));
        hs[1].request_launch().unwrap();

        crash_out(&mut hs[0]);
        assert_eq!(
            b.next_step(&hs),
            Some(Step::Finished(BringUpOutcome::BringUpFailed {
                failed_worker: "a".into()
            }))
        );
        assert_eq!(b.next_step(&hs), None);
    }

    #[test]
    fn test_exhausted_worker_behind_cursor_is_partial() {
        let mut hs = handles(&["a", "b"]);
        let mut b = BringUp::new(BringUpPolicy::Continue);
        b.start();
        hs[0].request_launch().unwrap();
        activate(&mut hs[0]);
        assert_eq!(b.next_step(&hs), Some(Step::Launch(1)));
        hs[1].request_launch().unwrap();

        crash_out(&mut hs[0]);
        assert_eq!(b.next_step(&hs), Some(Step::Wait));

        activate(&mut hs[1]);
        assert_eq!(
            b.next_step(&hs),
            Some(Step::Finished(BringUpOutcome::PartialReady {
                ready_workers: vec!["b".into()],
                failed_workers: vec!["a".into()],
            }))
        );
    }

    #[test]
    fn test_cancel() {
        let mut b = BringUp::new(BringUpPolicy::Halt);
        b.start();
        assert_eq!(b.cancel(), Some(BringUpOutcome::Cancelled));
        assert_eq!(b.cancel(), None);
        assert_eq!(b.next_step(&[]), None);
    }
}
