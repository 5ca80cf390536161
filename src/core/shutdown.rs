//! # Cross-platform OS signal handling.
//!
//! Provides [`ShutdownSignals`]: termination listeners registered once, before
//! any worker is launched, so a registration failure aborts the run cleanly.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

/// Registered termination signal listeners.
#[cfg(unix)]
pub(crate) struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Installs the listeners; fails if the OS refuses the registration.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Completes when any termination signal arrives.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv()  => {},
            _ = self.sigterm.recv() => {},
            _ = self.sigquit.recv() => {},
        }
    }
}

/// Registered termination signal listeners.
#[cfg(not(unix))]
pub(crate) struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    /// Nothing to install up front: Ctrl-C is awaited lazily.
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    /// Completes on Ctrl-C.
    pub async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Waits on optional listeners; never completes when signals are disabled.
pub(crate) async fn next_signal(signals: &mut Option<ShutdownSignals>) {
    match signals {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
