//! Messages consumed by the coordinator loop.
//!
//! Everything that can change handle state arrives through one unbounded
//! queue: control commands, launcher results, exit notifications and respawn
//! timers. Results carry the handle generation they were issued for.

use tokio::sync::oneshot;

use crate::error::{ControlError, LaunchError};
use crate::launcher::LaunchToken;

pub(crate) type Reply = oneshot::Sender<Result<(), ControlError>>;

/// Control request from the public API.
pub(crate) enum Command {
    /// Begin the ordered bring-up (no-op if it already ran).
    Startup { reply: Reply },
    /// Launch one worker from `Unconfigured`.
    Launch { name: String, reply: Reply },
    /// Gracefully stop one worker.
    Stop { name: String, reply: Reply },
    /// Stop everything in reverse order and leave the loop.
    Shutdown,
}

pub(crate) enum Inbound {
    Command(Command),
    /// `start` + `configure` finished. On failure the token is present when
    /// the process was started before setup failed.
    Configured {
        worker: usize,
        generation: u64,
        result: Result<LaunchToken, (Option<LaunchToken>, LaunchError)>,
    },
    Activated {
        worker: usize,
        generation: u64,
        result: Result<(), LaunchError>,
    },
    Exited {
        worker: usize,
        generation: u64,
        code: Option<i32>,
    },
    RespawnDue {
        worker: usize,
        generation: u64,
    },
}
