//! # TOML registry loader.
//!
//! Loads a [`SupervisorConfig`] and a [`WorkerRegistry`] from one document:
//!
//! ```toml
//! [supervisor]
//! autostart = true
//! namespace = "robot1"
//! respawn_ceiling = 5
//! shutdown_timeout = 10.0      # seconds
//! on_failure = "halt"          # or "continue"
//!
//! [[worker]]
//! name = "controller_server"
//! order = 1
//! respawn_delay = 2.0          # seconds, 0 disables respawn
//!
//! [worker.launch]
//! program = "controller_server"
//! ros_args = true
//! params_file = "config/controller_server.yaml"
//! remappings = [["/tf", "tf"], ["cmd_vel", "cmd_vel_nav"]]
//! ```
//!
//! ## Rules
//! - Every field of `[supervisor]` is optional; missing ones keep [`SupervisorConfig::default`].
//! - `order` may be written as an integer or an integral float; anything else
//!   (fractional, `nan`, `inf`) is [`ConfigError::InvalidOrder`].
//! - Durations are fractional seconds and must be finite and non-negative.
//! - Unknown keys are rejected.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::SupervisorConfig;
use crate::error::ConfigError;
use crate::policies::BringUpPolicy;
use crate::registry::spec::{LaunchDescriptor, WorkerSpec};
use crate::registry::workers::WorkerRegistry;

/// Supervisor settings and worker registry loaded from a file.
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// Supervisor settings (defaults applied).
    pub config: SupervisorConfig,
    /// Validated worker registry.
    pub registry: WorkerRegistry,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    supervisor: SupervisorSection,
    #[serde(default, rename = "worker")]
    workers: Vec<WorkerEntry>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SupervisorSection {
    autostart: Option<bool>,
    namespace: Option<String>,
    respawn_ceiling: Option<u32>,
    shutdown_timeout: Option<f64>,
    on_failure: Option<BringUpPolicy>,
    backoff_factor: Option<f64>,
    max_respawn_delay: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerEntry {
    name: String,
    #[serde(default)]
    order: Option<OrderValue>,
    #[serde(default)]
    respawn_delay: f64,
    #[serde(default = "default_required")]
    required: bool,
    launch: LaunchDescriptor,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderValue {
    Int(i64),
    Float(f64),
}

fn default_required() -> bool {
    true
}

/// Reads and parses the registry file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    from_toml_str(&text)
}

/// Parses a registry document.
pub fn from_toml_str(text: &str) -> Result<LoadedConfig, ConfigError> {
    let file: RegistryFile = toml::from_str(text)?;

    let mut config = SupervisorConfig::default();
    let section = file.supervisor;
    if let Some(autostart) = section.autostart {
        config.autostart = autostart;
    }
    if let Some(namespace) = section.namespace {
        config.namespace = namespace;
    }
    config.respawn_ceiling = section.respawn_ceiling.or(config.respawn_ceiling);
    if let Some(secs) = section.shutdown_timeout {
        config.shutdown_timeout = seconds("supervisor.shutdown_timeout", secs)?;
    }
    if let Some(policy) = section.on_failure {
        config.on_failure = policy;
    }
    if let Some(factor) = section.backoff_factor {
        config.backoff_factor = factor;
    }
    if let Some(secs) = section.max_respawn_delay {
        config.max_respawn_delay = seconds("supervisor.max_respawn_delay", secs)?;
    }

    let mut specs = Vec::with_capacity(file.workers.len());
    for entry in file.workers {
        let order = match entry.order {
            None => 0,
            Some(value) => parse_order(&entry.name, value)?,
        };
        let delay = seconds(&entry.name, entry.respawn_delay)?;
        specs.push(
            WorkerSpec::new(entry.name, entry.launch)
                .with_order(order)
                .with_respawn_delay(delay)
                .with_required(entry.required),
        );
    }

    let registry = WorkerRegistry::new(specs)?;
    Ok(LoadedConfig { config, registry })
}

fn parse_order(name: &str, value: OrderValue) -> Result<i64, ConfigError> {
    match value {
        OrderValue::Int(n) => Ok(n),
        OrderValue::Float(f) => {
            let integral = f.is_finite() && f.fract() == 0.0;
            // `i64::MAX as f64` rounds up to 2^63, which is out of range.
            if integral && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(ConfigError::InvalidOrder {
                    name: name.to_string(),
                    value: f.to_string(),
                })
            }
        }
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDelay {
        name: name.to_string(),
        value: secs,
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV: &str = r#"
        [supervisor]
        namespace = "robot1"
        respawn_ceiling = 3
        on_failure = "continue"

        [[worker]]
        name = "planner_server"
        order = 2
        respawn_delay = 2.0
        [worker.launch]
        program = "planner_server"
        ros_args = true
        params_file = "config/planner_server.yaml"
        remappings = [["/tf", "tf"], ["/tf_static", "tf_static"]]

        [[worker]]
        name = "controller_server"
        order = 1
        respawn_delay = 2.5
        [worker.launch]
        program = "controller_server"
        env = { RCUTILS_LOGGING_BUFFERED_STREAM = "1" }

        [[worker]]
        name = "velocity_smoother"
        order = 2.0
        required = false
        [worker.launch]
        program = "velocity_smoother"
    "#;

    #[test]
    fn test_loads_registry_and_settings() {
        let loaded = from_toml_str(NAV).unwrap();

        assert_eq!(loaded.config.namespace, "robot1");
        assert_eq!(loaded.config.respawn_ceiling, Some(3));
        assert_eq!(loaded.config.on_failure, BringUpPolicy::Continue);
        assert!(loaded.config.autostart);

        assert_eq!(
            loaded.registry.names(),
            vec!["controller_server", "planner_server", "velocity_smoother"]
        );

        let controller = loaded.registry.get("controller_server").unwrap();
        assert_eq!(controller.respawn_delay(), Duration::from_millis(2500));
        assert_eq!(
            controller.launch().env.get("RCUTILS_LOGGING_BUFFERED_STREAM").map(String::as_str),
            Some("1")
        );

        let planner = loaded.registry.get("planner_server").unwrap();
        assert_eq!(planner.launch().remappings.len(), 2);
        assert!(planner.launch().ros_args);

        let smoother = loaded.registry.get("velocity_smoother").unwrap();
        assert!(!smoother.required());
        assert!(!smoother.respawn_enabled());
    }

    #[test]
    fn test_fractional_order_is_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            order = 1.5
            [worker.launch]
            program = "a"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrder { .. }));
    }

    #[test]
    fn test_non_finite_order_is_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            order = nan
            [worker.launch]
            program = "a"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrder { .. }));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            respawn_delay = -1.0
            [worker.launch]
            program = "a"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelay { .. }));
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            respawn_delay = 1e30
            [worker.launch]
            program = "a"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelay { ref name, .. } if name == "a"));

        let doc = r#"
            [supervisor]
            shutdown_timeout = 1e30
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_delay");
    }

    #[test]
    fn test_order_at_i64_bound_is_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            order = 9.223372036854775808e18
            [worker.launch]
            program = "a"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrder { .. }));
    }

    #[test]
    fn test_duplicate_names_fail_validation() {
        let doc = r#"
            [[worker]]
            name = "a"
            [worker.launch]
            program = "a"

            [[worker]]
            name = "a"
            [worker.launch]
            program = "b"
        "#;
        let err = from_toml_str(doc).unwrap_err();
        assert_eq!(err.as_label(), "config_duplicate_name");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let doc = r#"
            [[worker]]
            name = "a"
            respawn = true
            [worker.launch]
            program = "a"
        "#;
        assert!(matches!(from_toml_str(doc), Err(ConfigError::Parse(_))));
    }
}
