//! Round scheduling engine.
//!
//! This module provides the polling loop that watches the candidate directory
//! and dispatches checked-in candidates to the round creation service in
//! fixed-size batches.

mod eligibility;
mod engine;
mod ledger;
mod status;
mod types;

pub use eligibility::{Selection, eligible_candidates, select_batch};
pub use engine::RoundScheduler;
pub use status::{SchedulerMetrics, SchedulerStatus};
pub use types::{
    CycleOutcome, DEFAULT_BATCH_SIZE, DEFAULT_MIN_DISPATCH_GAP, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROUND_DURATION_MINUTES, SchedulerError, SchedulerOptions,
    SchedulerSettings, SchedulerState,
};
