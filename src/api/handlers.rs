//! API request handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::events::EventLog;
use crate::scheduler::{
    RoundScheduler, SchedulerError, SchedulerMetrics, SchedulerOptions, SchedulerStatus,
};

use super::errors::ApiError;
use super::responses::{
    ConfigUpdateResponse, CycleResponse, EventListResponse, HealthResponse, LifecycleResponse,
    MessageResponse, RejectedField,
};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: RoundScheduler,
    pub events: Arc<EventLog>,
}

impl ApiState {
    /// Create API state. `events` should also be registered as an observer.
    pub fn new(scheduler: RoundScheduler, events: Arc<EventLog>) -> Self {
        Self { scheduler, events }
    }
}

/// Query parameters for the events endpoint.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Partial configuration update.
///
/// Values are taken as raw JSON so each field can be rejected on its own.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigPatch {
    pub batch_size: Option<Value>,
    pub round_duration_minutes: Option<Value>,
    pub poll_interval_ms: Option<Value>,
    pub min_dispatch_gap_ms: Option<Value>,
}

/// Body of the batch size endpoint.
#[derive(Debug, Deserialize)]
pub struct BatchSizeRequest {
    pub batch_size: usize,
}

fn positive(field: &'static str, value: &Value) -> Result<u64, SchedulerError> {
    value
        .as_u64()
        .filter(|n| *n > 0)
        .ok_or_else(|| SchedulerError::invalid(field, format!("must be a positive integer, got {}", value)))
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Get scheduler status.
pub async fn get_status(State(state): State<ApiState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// Get scheduler metrics.
pub async fn get_metrics(State(state): State<ApiState>) -> Json<SchedulerMetrics> {
    Json(state.scheduler.metrics())
}

/// Start the polling loop.
pub async fn start_scheduler(State(state): State<ApiState>) -> Json<LifecycleResponse> {
    let changed = state.scheduler.start();
    Json(LifecycleResponse {
        changed,
        running: state.scheduler.is_running(),
        message: if changed {
            "scheduler started".to_string()
        } else {
            "scheduler already running".to_string()
        },
    })
}

/// Stop the polling loop.
pub async fn stop_scheduler(State(state): State<ApiState>) -> Json<LifecycleResponse> {
    let changed = state.scheduler.stop();
    Json(LifecycleResponse {
        changed,
        running: state.scheduler.is_running(),
        message: if changed {
            "scheduler stopped".to_string()
        } else {
            "scheduler already stopped".to_string()
        },
    })
}

/// Clear dispatch history.
pub async fn reset_scheduler(State(state): State<ApiState>) -> Json<MessageResponse> {
    state.scheduler.reset();
    Json(MessageResponse {
        message: "dispatch history cleared".to_string(),
    })
}

/// Run one cycle now.
pub async fn run_check(State(state): State<ApiState>) -> Json<CycleResponse> {
    Json(CycleResponse::from(state.scheduler.run_cycle().await))
}

/// Apply a partial configuration update.
///
/// Valid fields are applied; invalid ones are reported. Fails only when the
/// patch contained fields and none of them could be applied.
pub async fn patch_config(
    State(state): State<ApiState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
    let mut options = SchedulerOptions::new();
    let mut applied = Vec::new();
    let mut rejected = Vec::new();

    if let Some(value) = &patch.batch_size {
        match positive("batch_size", value) {
            Ok(n) => {
                options = options.batch_size(n as usize);
                applied.push("batch_size");
            }
            Err(e) => rejected.push(e),
        }
    }
    if let Some(value) = &patch.round_duration_minutes {
        match positive("round_duration_minutes", value).and_then(|n| {
            u32::try_from(n).map_err(|_| SchedulerError::invalid("round_duration_minutes", "out of range"))
        }) {
            Ok(n) => {
                options = options.round_duration_minutes(n);
                applied.push("round_duration_minutes");
            }
            Err(e) => rejected.push(e),
        }
    }
    if let Some(value) = &patch.poll_interval_ms {
        match positive("poll_interval_ms", value) {
            Ok(ms) => {
                options = options.poll_interval(Duration::from_millis(ms));
                applied.push("poll_interval_ms");
            }
            Err(e) => rejected.push(e),
        }
    }
    if let Some(value) = &patch.min_dispatch_gap_ms {
        match positive("min_dispatch_gap_ms", value) {
            Ok(ms) => {
                options = options.min_dispatch_gap(Duration::from_millis(ms));
                applied.push("min_dispatch_gap_ms");
            }
            Err(e) => rejected.push(e),
        }
    }

    // Values were pre-checked, so the engine should accept all of them.
    rejected.extend(state.scheduler.configure(options));

    if applied.is_empty() && !rejected.is_empty() {
        let reasons: Vec<String> = rejected.iter().map(|e| e.to_string()).collect();
        return Err(ApiError::Unprocessable(reasons.join("; ")));
    }

    Ok(Json(ConfigUpdateResponse {
        applied,
        rejected: rejected.into_iter().map(RejectedField::from).collect(),
        status: state.scheduler.status(),
    }))
}

/// Change the batch size.
pub async fn put_batch_size(
    State(state): State<ApiState>,
    Json(request): Json<BatchSizeRequest>,
) -> Result<Json<SchedulerStatus>, ApiError> {
    state.scheduler.update_batch_size(request.batch_size)?;
    Ok(Json(state.scheduler.status()))
}

/// List recent dispatch events.
pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<ListEventsQuery>,
) -> Json<EventListResponse> {
    Json(EventListResponse::from(state.events.recent(query.limit)))
}
