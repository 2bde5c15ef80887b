//! Configuration type definitions.
//!
//! This module contains the YAML structures for the scheduler, the backend
//! endpoints, and the control API.

use serde::{Deserialize, Serialize};

use crate::scheduler::{
    DEFAULT_BATCH_SIZE, DEFAULT_MIN_DISPATCH_GAP, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_ROUND_DURATION_MINUTES,
};

/// Default control API host.
pub const DEFAULT_API_HOST: &str = "127.0.0.1";
/// Default control API port.
pub const DEFAULT_API_PORT: u16 = 8565;

/// Application configuration (roundup.yaml).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scheduling behavior.
    pub scheduler: SchedulerConfig,
    /// External services.
    pub backend: BackendConfig,
    /// Control API server.
    pub api: ApiServerConfig,
}

/// Scheduler section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum eligible candidates per batch.
    pub batch_size: usize,
    /// Duration of created rounds, in minutes.
    pub round_duration_minutes: u32,
    /// Interval between eligibility checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Minimum time between dispatches, in seconds.
    pub min_dispatch_gap_secs: u64,
    /// Bound on each external call, in seconds.
    pub request_timeout_secs: u64,
    /// Whether starting the scheduler clears dispatch history.
    pub reset_on_start: bool,
    /// IANA timezone for round start dates and times.
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            round_duration_minutes: DEFAULT_ROUND_DURATION_MINUTES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            min_dispatch_gap_secs: DEFAULT_MIN_DISPATCH_GAP.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            reset_on_start: true,
            timezone: "UTC".to_string(),
        }
    }
}

/// Backend section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the candidate backend.
    pub base_url: String,
    /// Path of the candidate listing, relative to `base_url`.
    pub candidates_path: String,
    /// Path of the round creation endpoint, relative to `base_url`.
    pub rounds_path: String,
    /// Name of the environment variable holding the bearer token.
    pub api_token_env: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            candidates_path: "/api/candidates".to_string(),
            rounds_path: "/api/rounds/batch".to_string(),
            api_token_env: None,
        }
    }
}

impl BackendConfig {
    /// Full URL of the candidate listing.
    pub fn candidates_url(&self) -> String {
        join_url(&self.base_url, &self.candidates_path)
    }

    /// Full URL of the round creation endpoint.
    pub fn rounds_url(&self) -> String {
        join_url(&self.base_url, &self.rounds_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// API section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiServerConfig {
    /// Whether to serve the control API.
    pub enabled: bool,
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_API_HOST.to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}
