//! # Validated, ordered set of worker declarations.
//!
//! [`WorkerRegistry`] is built once from a list of [`WorkerSpec`] values and
//! exposes them in **startup order**: ascending `order`, ties broken by
//! declaration position (stable sort).
//!
//! ## Rules
//! - Names must be non-empty and unique, otherwise [`ConfigError`].
//! - Validation happens before any worker handle is created.
//! - The registry is read-only after construction; specs are shared as `Arc`.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::registry::spec::WorkerSpec;

/// Validated worker declarations in startup order.
#[derive(Clone, Debug)]
pub struct WorkerRegistry {
    workers: Vec<Arc<WorkerSpec>>,
}

impl WorkerRegistry {
    /// Validates `specs` and sorts them into startup order.
    ///
    /// # Example
    /// ```rust
    /// use nodevisor::{LaunchDescriptor, WorkerRegistry, WorkerSpec};
    ///
    /// let registry = WorkerRegistry::new(vec![
    ///     WorkerSpec::new("b", LaunchDescriptor::new("b")).with_order(2),
    ///     WorkerSpec::new("a", LaunchDescriptor::new("a")).with_order(1),
    /// ])?;
    /// assert_eq!(registry.names(), vec!["a", "b"]);
    /// # Ok::<(), nodevisor::ConfigError>(())
    /// ```
    pub fn new(specs: Vec<WorkerSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            if spec.name().trim().is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if !seen.insert(spec.name()) {
                return Err(ConfigError::DuplicateName {
                    name: spec.name().to_string(),
                });
            }
        }

        let mut workers: Vec<Arc<WorkerSpec>> = specs.into_iter().map(Arc::new).collect();
        workers.sort_by_key(|w| w.order());
        Ok(Self { workers })
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` if no workers are declared.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Iterates over the specs in startup order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<WorkerSpec>> {
        self.workers.iter()
    }

    /// Looks up a spec by name.
    pub fn get(&self, name: &str) -> Option<&Arc<WorkerSpec>> {
        self.workers.iter().find(|w| w.name() == name)
    }

    /// Worker names in startup order.
    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    /// Sets the log level of every worker launched with ROS-style arguments.
    #[must_use]
    pub fn with_log_level(self, level: &str) -> Self {
        let workers = self
            .workers
            .into_iter()
            .map(|spec| {
                if !spec.launch().ros_args {
                    return spec;
                }
                let mut spec = Arc::unwrap_or_clone(spec);
                spec.launch_mut().log_level = Some(level.to_string());
                Arc::new(spec)
            })
            .collect();
        Self { workers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LaunchDescriptor;

    fn spec(name: &str, order: i64) -> WorkerSpec {
        WorkerSpec::new(name, LaunchDescriptor::new(name)).with_order(order)
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let err = WorkerRegistry::new(vec![spec("a", 1), spec("b", 2), spec("a", 3)]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { ref name } if name == "a"));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = WorkerRegistry::new(vec![spec("a", 1), spec("  ", 2)]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyName { index: 1 }));
    }

    #[test]
    fn test_sorted_by_order_then_declaration() {
        let registry = WorkerRegistry::new(vec![
            spec("c", 2),
            spec("a", 1),
            spec("d", 2),
            spec("b", 1),
            spec("e", -1),
        ])
        .unwrap();
        assert_eq!(registry.names(), vec!["e", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_lookup() {
        let registry = WorkerRegistry::new(vec![spec("a", 1)]).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").is_some());
        assert!(registry.get("z").is_none());
    }

    #[test]
    fn test_log_level_only_for_ros_workers() {
        let mut ros = LaunchDescriptor::new("amcl");
        ros.ros_args = true;
        let registry = WorkerRegistry::new(vec![
            WorkerSpec::new("amcl", ros),
            spec("plain", 2),
        ])
        .unwrap()
        .with_log_level("debug");

        let level = |name: &str| registry.get(name).unwrap().launch().log_level.clone();
        assert_eq!(level("amcl").as_deref(), Some("debug"));
        assert_eq!(level("plain"), None);
    }
}
