//! Restart and bring-up policies.
//!
//! This module groups the knobs that control **if/when** a crashed worker is
//! relaunched and **what happens** when a worker fails during bring-up.
//!
//! ## Contents
//! - [`RespawnPolicy`] whether and when to relaunch after a crash (delay / ceiling / growth)
//! - [`BringUpPolicy`] halt or continue the ordered bring-up on a terminal failure
//!
//! ## Quick wiring
//! ```text
//! WorkerSpec { respawn_delay } + SupervisorConfig { respawn_ceiling, backoff_factor, max_respawn_delay }
//!      └─► SupervisorConfig::respawn_policy(&spec) → RespawnPolicy
//!           - allows(restart_count) to decide respawn vs terminal Exited
//!           - delay_for(restart_count) to schedule the relaunch timer
//! ```
//!
//! ## Defaults
//! - Respawn delay is fixed (`factor = 1.0`); growth is opt-in.
//! - `BringUpPolicy::Halt`.

mod bring_up;
mod respawn;

pub use bring_up::BringUpPolicy;
pub use respawn::RespawnPolicy;
