//! # Launcher capability and the built-in process launcher.
//!
//! - [`Launcher`] the injected capability every process effect goes through
//! - [`LaunchRequest`], [`LaunchToken`], [`ExitNotifier`] the data exchanged with it
//! - [`ProcessLauncher`] implementation over `tokio::process`

mod capability;
pub mod process;

pub use capability::{ExitNotifier, LaunchRequest, LaunchToken, Launcher};
pub use process::ProcessLauncher;
