//! API response types.

use serde::Serialize;

use crate::core::types::{BatchId, CandidateId};
use crate::events::DispatchEvent;
use crate::scheduler::{CycleOutcome, SchedulerError, SchedulerStatus};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response to start and stop.
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    /// Whether the call changed the run state.
    pub changed: bool,
    pub running: bool,
    pub message: String,
}

/// Result of a manually triggered cycle.
#[derive(Debug, Default, Serialize)]
pub struct CycleResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CycleOutcome> for CycleResponse {
    fn from(outcome: CycleOutcome) -> Self {
        let base = CycleResponse {
            outcome: outcome.label(),
            ..CycleResponse::default()
        };
        match outcome {
            CycleOutcome::Busy => base,
            CycleOutcome::Debounced { remaining } => CycleResponse {
                remaining_ms: Some(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX)),
                ..base
            },
            CycleOutcome::DirectoryFailed { error, .. } => CycleResponse {
                error: Some(error),
                ..base
            },
            CycleOutcome::BelowThreshold { eligible, required } => CycleResponse {
                eligible: Some(eligible),
                required: Some(required),
                ..base
            },
            CycleOutcome::Dispatched {
                batch_id,
                candidates,
            } => CycleResponse {
                batch_id: Some(batch_id),
                candidates: Some(candidates),
                ..base
            },
            CycleOutcome::DispatchFailed { batch_id, error } => CycleResponse {
                batch_id: Some(batch_id),
                error: Some(error),
                ..base
            },
        }
    }
}

/// A configuration field that was not applied.
#[derive(Debug, Serialize)]
pub struct RejectedField {
    pub field: String,
    pub reason: String,
}

impl From<SchedulerError> for RejectedField {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::InvalidConfiguration { field, reason } => Self {
                field: field.to_string(),
                reason,
            },
            other => Self {
                field: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Response to a configuration patch.
#[derive(Debug, Serialize)]
pub struct ConfigUpdateResponse {
    pub applied: Vec<&'static str>,
    pub rejected: Vec<RejectedField>,
    pub status: SchedulerStatus,
}

/// Recent dispatch events, newest first.
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<DispatchEvent>,
    pub count: usize,
}

impl From<Vec<DispatchEvent>> for EventListResponse {
    fn from(events: Vec<DispatchEvent>) -> Self {
        let count = events.len();
        Self { events, count }
    }
}
