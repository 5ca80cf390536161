//! # Bring-up failure policy.
//!
//! [`BringUpPolicy`] decides what the ordered bring-up does when a worker
//! fails terminally before reaching `Active`:
//!
//! ```text
//! BringUpPolicy::Halt      → stop the sequence, outcome BringUpFailed { failed_worker }
//! BringUpPolicy::Continue  → skip the worker, outcome PartialReady { ready, failed }
//! ```

use serde::Deserialize;

/// Policy applied when a worker fails during the ordered bring-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BringUpPolicy {
    /// Stop bringing up further workers (default).
    #[default]
    Halt,
    /// Skip the failed worker and continue with the next one.
    Continue,
}
