//! # Worker declarations.
//!
//! [`WorkerSpec`] is the immutable description of one managed worker:
//! a unique name, an opaque [`LaunchDescriptor`] handed to the launcher,
//! a respawn delay and an ordering priority.
//!
//! The supervisor never interprets the descriptor; only a
//! [`Launcher`](crate::Launcher) implementation does.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Data needed by a launcher to start one worker.
///
/// Opaque to the supervisor core. The built-in
/// [`ProcessLauncher`](crate::ProcessLauncher) understands every field; other
/// launchers may use only a subset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchDescriptor {
    /// Executable to run.
    pub program: String,
    /// Arguments passed before any generated ones.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory (inherits the supervisor's when absent).
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Parameter file handed to the worker.
    #[serde(default)]
    pub params_file: Option<PathBuf>,
    /// Topic remappings `(from, to)`.
    #[serde(default)]
    pub remappings: Vec<(String, String)>,
    /// Append ROS-style `--ros-args` (node name, namespace, remappings, params, log level).
    #[serde(default)]
    pub ros_args: bool,
    /// Log level forwarded to the worker.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl LaunchDescriptor {
    /// Descriptor for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Returns a descriptor with the given arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Immutable description of a managed worker.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use nodevisor::{LaunchDescriptor, WorkerSpec};
///
/// let spec = WorkerSpec::new("planner_server", LaunchDescriptor::new("planner_server"))
///     .with_order(3)
///     .with_respawn_delay(Duration::from_secs(2));
///
/// assert_eq!(spec.name(), "planner_server");
/// assert!(spec.respawn_enabled());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerSpec {
    name: String,
    launch: LaunchDescriptor,
    respawn_delay: Duration,
    order: i64,
    required: bool,
}

impl WorkerSpec {
    /// Creates a spec with `order = 0`, no respawn and `required = true`.
    pub fn new(name: impl Into<String>, launch: LaunchDescriptor) -> Self {
        Self {
            name: name.into(),
            launch,
            respawn_delay: Duration::ZERO,
            order: 0,
            required: true,
        }
    }

    /// Returns a spec with the given startup priority (lower starts first).
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    /// Returns a spec with the given respawn delay (`ZERO` disables respawn).
    pub fn with_respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn_delay = delay;
        self
    }

    /// Returns a spec that does (or does not) count toward readiness.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Unique worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch descriptor for the launcher capability.
    pub fn launch(&self) -> &LaunchDescriptor {
        &self.launch
    }

    pub(crate) fn launch_mut(&mut self) -> &mut LaunchDescriptor {
        &mut self.launch
    }

    /// Delay before relaunching after an unexpected exit.
    pub fn respawn_delay(&self) -> Duration {
        self.respawn_delay
    }

    /// Startup priority.
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Whether the worker counts toward readiness.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns `true` if unexpected exits are followed by a relaunch.
    pub fn respawn_enabled(&self) -> bool {
        !self.respawn_delay.is_zero()
    }
}
