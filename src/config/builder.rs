//! Scheduler builder from YAML configuration.
//!
//! This module wires the HTTP collaborators named in an [`AppConfig`] into a
//! ready-to-start [`RoundScheduler`].

use std::path::Path;
use std::sync::Arc;

use crate::directory::HttpCandidateDirectory;
use crate::rounds::HttpRoundService;
use crate::scheduler::RoundScheduler;

use super::error::ConfigError;
use super::types::{AppConfig, BackendConfig};
use super::yaml::YamlLoader;

/// Builder for creating a scheduler from configuration.
pub struct SchedulerBuilder;

impl SchedulerBuilder {
    /// Build a scheduler backed by the configured HTTP endpoints.
    pub fn build(config: &AppConfig) -> Result<RoundScheduler, ConfigError> {
        let settings = YamlLoader::scheduler_settings(&config.scheduler)?;
        let token = Self::api_token(&config.backend)?;

        let directory = HttpCandidateDirectory::new(
            config.backend.candidates_url(),
            token.clone(),
            settings.request_timeout,
        )
        .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        let rounds = HttpRoundService::new(
            config.backend.rounds_url(),
            token,
            settings.request_timeout,
        )
        .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        RoundScheduler::with_settings(Arc::new(directory), Arc::new(rounds), settings)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Read the bearer token from the environment variable named in the config.
    ///
    /// Returns `None` when no variable is configured.
    pub fn api_token(backend: &BackendConfig) -> Result<Option<String>, ConfigError> {
        match &backend.api_token_env {
            None => Ok(None),
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| ConfigError::MissingToken(var.clone())),
        }
    }
}

/// Load a configuration file and build a scheduler from it.
pub fn load_scheduler(path: impl AsRef<Path>) -> Result<(AppConfig, RoundScheduler), ConfigError> {
    let config = YamlLoader::load_config(path)?;
    let scheduler = SchedulerBuilder::build(&config)?;
    Ok((config, scheduler))
}
