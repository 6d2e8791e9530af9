//! # Subsystem Container
//!
//! Node configuration and the container that owns every subsystem instance.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig, StorageConfig, CONFIG_ENV};
pub use subsystems::{ContainerError, SubsystemContainer};
