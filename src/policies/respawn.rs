//! # Respawn policy for crashed workers.
//!
//! [`RespawnPolicy`] decides **whether** a worker that exited unexpectedly is
//! relaunched and **how long** to wait before doing so. It is parameterized by:
//! - [`RespawnPolicy::delay`] the base delay (`0` disables respawn entirely);
//! - [`RespawnPolicy::ceiling`] the maximum number of automatic restarts (`None` = unlimited);
//! - [`RespawnPolicy::factor`] the multiplicative growth factor (`1.0` = fixed delay);
//! - [`RespawnPolicy::max`] the cap for grown delays.
//!
//! The delay before restart `n` (0-based) is `delay × factor^n`, clamped to
//! `[delay, max(delay, max)]`. A respawn is therefore never scheduled sooner
//! than the configured base delay.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::RespawnPolicy;
//!
//! let policy = RespawnPolicy::fixed(Duration::from_secs(2)).with_ceiling(Some(3));
//!
//! assert!(policy.allows(0));
//! assert!(!policy.allows(3));
//! assert_eq!(policy.delay_for(2), Duration::from_secs(2));
//! ```

use std::time::Duration;

/// Crash-recovery policy for a single worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RespawnPolicy {
    /// Base delay before relaunching; `Duration::ZERO` disables respawn.
    pub delay: Duration,
    /// Maximum automatic restarts (`None` = unlimited).
    pub ceiling: Option<u32>,
    /// Multiplicative growth factor applied per restart (`1.0` = fixed delay).
    pub factor: f64,
    /// Cap for grown delays (never below `delay`).
    pub max: Duration,
}

impl RespawnPolicy {
    /// Fixed-delay policy without a restart ceiling.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            ceiling: None,
            factor: 1.0,
            max: delay,
        }
    }

    /// Policy that never respawns.
    pub fn disabled() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Returns a policy with the given restart ceiling.
    pub fn with_ceiling(mut self, ceiling: Option<u32>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Returns a policy whose delay grows by `factor` per restart up to `max`.
    pub fn with_growth(mut self, factor: f64, max: Duration) -> Self {
        self.factor = factor;
        self.max = max;
        self
    }

    /// Returns `true` if automatic respawn is enabled at all.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Returns `true` if another restart is permitted after `restarts` restarts.
    #[inline]
    pub fn allows(&self, restarts: u32) -> bool {
        self.is_enabled() && self.ceiling.is_none_or(|c| restarts < c)
    }

    /// Computes the delay before the restart that follows `restarts` previous restarts.
    pub fn delay_for(&self, restarts: u32) -> Duration {
        let cap = self.max.max(self.delay);
        if self.factor <= 1.0 || !self.factor.is_finite() {
            return self.delay;
        }

        let exp = restarts.min(i32::MAX as u32) as i32;
        let secs = self.delay.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs > cap.as_secs_f64() {
            cap
        } else {
            Duration::from_secs_f64(secs).max(self.delay)
        }
    }
}

impl Default for RespawnPolicy {
    /// Returns [`RespawnPolicy::disabled`].
    fn default() -> Self {
        Self::disabled()
    }
}
