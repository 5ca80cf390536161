//! # Worker lifecycle states.
//!
//! ```text
//! Unconfigured ─► Configuring ─► Inactive ─► Activating ─► Active ─► Deactivating ─► Finalized
//!       ▲              │                          │           │
//!       └── failure ───┴──────────────────────────┘           │
//!                                                             ▼
//!        Configuring ◄──── respawn policy ──────────────── Exited
//! ```
//!
//! `Exited` is reachable from every active state on an unexpected exit.

use std::fmt;

/// Lifecycle state of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Created, no process running.
    Unconfigured,
    /// Process launched, setup step in flight.
    Configuring,
    /// Setup done, waiting for activation.
    Inactive,
    /// Activation step in flight.
    Activating,
    /// Fully up.
    Active,
    /// Stop requested, waiting for the process to exit.
    Deactivating,
    /// Stopped on request (terminal).
    Finalized,
    /// Exited unexpectedly; terminal unless respawned.
    Exited,
}

impl LifecycleState {
    /// Returns `true` while a process instance exists (or is being brought up/down).
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LifecycleState::Configuring
                | LifecycleState::Inactive
                | LifecycleState::Activating
                | LifecycleState::Active
                | LifecycleState::Deactivating
        )
    }

    /// Returns `true` while a launcher step (configure/activate/stop) is in flight.
    #[inline]
    pub fn is_transitioning(self) -> bool {
        matches!(
            self,
            LifecycleState::Configuring | LifecycleState::Activating | LifecycleState::Deactivating
        )
    }

    /// Stable snake_case label.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Configuring => "configuring",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Deactivating => "deactivating",
            LifecycleState::Finalized => "finalized",
            LifecycleState::Exited => "exited",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(!LifecycleState::Unconfigured.is_active());
        assert!(LifecycleState::Configuring.is_active());
        assert!(LifecycleState::Active.is_active());
        assert!(LifecycleState::Deactivating.is_active());
        assert!(!LifecycleState::Finalized.is_active());
        assert!(!LifecycleState::Exited.is_active());
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleState::Activating.to_string(), "activating");
    }
}
