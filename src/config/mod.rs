//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the scheduler, its
//! backend endpoints, and the control API.

mod builder;
mod error;
mod types;
mod yaml;

pub use builder::{SchedulerBuilder, load_scheduler};
pub use error::ConfigError;
pub use types::{
    ApiServerConfig, AppConfig, BackendConfig, DEFAULT_API_HOST, DEFAULT_API_PORT,
    SchedulerConfig,
};
pub use yaml::YamlLoader;
