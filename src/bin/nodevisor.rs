//! `nodevisor` binary
//!
//! Loads a TOML worker registry, brings the workers up in order with the
//! process launcher and supervises them until SIGINT/SIGTERM/SIGQUIT.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nodevisor::registry::loader;
use nodevisor::{LogWriter, ProcessLauncher, RuntimeError, Subscribe, Supervisor};

#[derive(Parser, Debug)]
#[command(name = "nodevisor")]
#[command(version, about = "Lifecycle supervisor for ordered worker processes")]
struct Args {
    /// Registry file (TOML, `[supervisor]` + `[[worker]]`)
    #[arg(env = "NODEVISOR_CONFIG")]
    config: PathBuf,

    /// Namespace handed to every worker (overrides the file)
    #[arg(long, env = "NODEVISOR_NAMESPACE")]
    namespace: Option<String>,

    /// Run the ordered bring-up at startup (overrides the file)
    #[arg(long, env = "NODEVISOR_AUTOSTART")]
    autostart: Option<bool>,

    /// Log level forwarded to workers that take ROS-style arguments
    #[arg(long, env = "NODEVISOR_WORKER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Seconds to wait for workers to stop before killing them (overrides the file)
    #[arg(long, env = "NODEVISOR_SHUTDOWN_TIMEOUT")]
    shutdown_timeout: Option<f64>,

    /// Milliseconds a freshly spawned worker must survive to count as configured
    #[arg(long, default_value_t = 500, env = "NODEVISOR_SETTLE_MS")]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let loaded = loader::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let mut cfg = loaded.config;
    if let Some(ns) = args.namespace {
        cfg.namespace = ns;
    }
    if let Some(autostart) = args.autostart {
        cfg.autostart = autostart;
    }
    if let Some(secs) = args.shutdown_timeout {
        cfg.shutdown_timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid --shutdown-timeout {secs}"))?;
    }

    let registry = match args.log_level {
        Some(level) => loaded.registry.with_log_level(&level),
        None => loaded.registry,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        workers = registry.len(),
        namespace = %cfg.namespace,
        "starting nodevisor"
    );

    let launcher = ProcessLauncher::new().with_settle(Duration::from_millis(args.settle_ms));
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg, Arc::new(launcher))
        .with_subscribers(subscribers)
        .build();

    match sup.run(registry).await {
        Ok(()) => {
            info!("nodevisor stopped");
            Ok(())
        }
        Err(err @ RuntimeError::ForcedShutdown { .. }) => {
            error!(error = %err, label = err.as_label(), "forced shutdown");
            Err(err.into())
        }
        Err(err) => Err(err).context("supervisor failed"),
    }
}
