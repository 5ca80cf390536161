//! # Worker declarations and the validated registry.
//!
//! - [`WorkerSpec`] immutable description of one worker
//! - [`LaunchDescriptor`] opaque launch data for the launcher capability
//! - [`WorkerRegistry`] validated specs in startup order
//! - [`loader`] TOML loader producing a registry plus supervisor settings

pub mod loader;
mod spec;
mod workers;

pub use loader::LoadedConfig;
pub use spec::{LaunchDescriptor, WorkerSpec};
pub use workers::WorkerRegistry;
