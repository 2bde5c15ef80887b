//! Scheduler type definitions.
//!
//! This module contains the error type, state enum, tuning settings, runtime
//! options, and cycle outcomes for the round scheduler.

use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::types::{BatchId, CandidateId};
use crate::events::DispatchObserver;

/// Default minimum number of eligible candidates per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;
/// Default round duration in minutes.
pub const DEFAULT_ROUND_DURATION_MINUTES: u32 = 30;
/// Default interval between eligibility checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default minimum time between two successful dispatches.
pub const DEFAULT_MIN_DISPATCH_GAP: Duration = Duration::from_secs(30);
/// Default bound on each directory fetch and round creation call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur in the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A configuration value was rejected. Other values in the same update still apply.
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// The loop did not finish its in-flight cycle before the shutdown deadline.
    #[error("scheduler did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}

impl SchedulerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SchedulerError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// State of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer is registered.
    Stopped,
    /// The polling loop is active.
    Running,
}

/// Tuning parameters read at the top of every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Minimum eligible count to dispatch, and maximum batch size.
    pub batch_size: usize,
    /// Duration of created rounds, in minutes.
    pub round_duration_minutes: u32,
    /// Interval between eligibility checks.
    pub poll_interval: Duration,
    /// Minimum time between two successful dispatches.
    pub min_dispatch_gap: Duration,
    /// Bound on each external call.
    pub request_timeout: Duration,
    /// Whether `start()` clears dispatch history.
    pub reset_on_start: bool,
    /// Timezone used for round start dates and times.
    pub timezone: Tz,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            round_duration_minutes: DEFAULT_ROUND_DURATION_MINUTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_dispatch_gap: DEFAULT_MIN_DISPATCH_GAP,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reset_on_start: true,
            timezone: Tz::UTC,
        }
    }
}

impl SchedulerSettings {
    /// Check that every numeric setting is positive.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.batch_size == 0 {
            return Err(SchedulerError::invalid("batch_size", "must be positive"));
        }
        if self.round_duration_minutes == 0 {
            return Err(SchedulerError::invalid(
                "round_duration_minutes",
                "must be positive",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SchedulerError::invalid("poll_interval", "must be positive"));
        }
        if self.min_dispatch_gap.is_zero() {
            return Err(SchedulerError::invalid(
                "min_dispatch_gap",
                "must be positive",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(SchedulerError::invalid(
                "request_timeout",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Partial update applied by `configure`.
///
/// Absent fields are left unchanged; zero values are rejected per field.
#[derive(Clone, Default)]
pub struct SchedulerOptions {
    pub batch_size: Option<usize>,
    pub round_duration_minutes: Option<u32>,
    pub poll_interval: Option<Duration>,
    pub min_dispatch_gap: Option<Duration>,
    pub observer: Option<Arc<dyn DispatchObserver>>,
}

impl SchedulerOptions {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    /// Set the round duration in minutes.
    pub fn round_duration_minutes(mut self, minutes: u32) -> Self {
        self.round_duration_minutes = Some(minutes);
        self
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the minimum gap between dispatches.
    pub fn min_dispatch_gap(mut self, gap: Duration) -> Self {
        self.min_dispatch_gap = Some(gap);
        self
    }

    /// Register an observer.
    pub fn observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl fmt::Debug for SchedulerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerOptions")
            .field("batch_size", &self.batch_size)
            .field("round_duration_minutes", &self.round_duration_minutes)
            .field("poll_interval", &self.poll_interval)
            .field("min_dispatch_gap", &self.min_dispatch_gap)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

/// Result of one check-and-process cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was still in flight; this one did nothing.
    Busy,
    /// The last dispatch was too recent.
    Debounced { remaining: Duration },
    /// The directory fetch failed.
    DirectoryFailed { transient: bool, error: String },
    /// Not enough eligible candidates.
    BelowThreshold { eligible: usize, required: usize },
    /// A batch was accepted by the round creation service.
    Dispatched {
        batch_id: BatchId,
        candidates: Vec<CandidateId>,
    },
    /// A batch was attempted and refused or unreachable.
    DispatchFailed { batch_id: BatchId, error: String },
}

impl CycleOutcome {
    /// Get a short label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Busy => "busy",
            CycleOutcome::Debounced { .. } => "debounced",
            CycleOutcome::DirectoryFailed { .. } => "directory_failed",
            CycleOutcome::BelowThreshold { .. } => "below_threshold",
            CycleOutcome::Dispatched { .. } => "dispatched",
            CycleOutcome::DispatchFailed { .. } => "dispatch_failed",
        }
    }
}
