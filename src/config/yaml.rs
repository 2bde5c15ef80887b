//! YAML configuration parsing.
//!
//! Parses the application configuration and converts the scheduler section
//! into validated engine settings.

use chrono_tz::Tz;
use std::path::Path;
use std::time::Duration;

use crate::scheduler::SchedulerSettings;

use super::error::ConfigError;
use super::types::{AppConfig, SchedulerConfig};

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load and validate configuration from a file.
    pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse_config(yaml: &str) -> Result<AppConfig, ConfigError> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration.
    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        Self::scheduler_settings(&config.scheduler)?;

        let backend = &config.backend;
        if backend.base_url.is_empty() {
            return Err(ConfigError::MissingField("backend.base_url".into()));
        }
        for url in [backend.candidates_url(), backend.rounds_url()] {
            reqwest::Url::parse(&url).map_err(|e| {
                ConfigError::InvalidConfig(format!("invalid backend URL '{}': {}", url, e))
            })?;
        }
        if backend.api_token_env.as_deref() == Some("") {
            return Err(ConfigError::InvalidConfig(
                "backend.api_token_env must not be empty".into(),
            ));
        }

        if config.api.enabled && config.api.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "api.port must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Convert the scheduler section into engine settings.
    pub fn scheduler_settings(config: &SchedulerConfig) -> Result<SchedulerSettings, ConfigError> {
        let timezone = Self::parse_timezone(&config.timezone)?;
        let settings = SchedulerSettings {
            batch_size: config.batch_size,
            round_duration_minutes: config.round_duration_minutes,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            min_dispatch_gap: Duration::from_secs(config.min_dispatch_gap_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            reset_on_start: config.reset_on_start,
            timezone,
        };
        settings
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        Ok(settings)
    }

    /// Parse an IANA timezone name.
    pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
        name.parse::<Tz>()
            .map_err(|_| ConfigError::InvalidConfig(format!("unknown timezone '{}'", name)))
    }
}
