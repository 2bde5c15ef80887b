//! Introspection views: status snapshot, derived metrics, and cycle counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Point-in-time status of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub batch_size: usize,
    pub round_duration_minutes: u32,
    pub poll_interval_ms: u64,
    pub min_dispatch_gap_ms: u64,
    pub processed_count: usize,
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

/// Status plus timing and cumulative counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    #[serde(flatten)]
    pub status: SchedulerStatus,
    /// Time since the last successful dispatch.
    pub time_since_last_dispatch_ms: Option<u64>,
    /// Time until the next timer tick, while running.
    pub time_to_next_check_ms: Option<u64>,
    /// Time until the debounce gate opens again.
    pub debounce_remaining_ms: Option<u64>,
    pub last_check_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub batches_scheduled: u64,
    pub batches_failed: u64,
    pub candidates_scheduled: u64,
    pub directory_failures: u64,
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Counters updated by the cycle. Monotonic; not cleared by `reset()`.
#[derive(Debug, Default)]
pub(crate) struct CycleStats {
    cycles: AtomicU64,
    batches_scheduled: AtomicU64,
    batches_failed: AtomicU64,
    candidates_scheduled: AtomicU64,
    directory_failures: AtomicU64,
    last_check_at: Mutex<Option<DateTime<Utc>>>,
}

impl CycleStats {
    pub(crate) fn cycle_started(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        *self
            .last_check_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    pub(crate) fn batch_scheduled(&self, candidates: usize) {
        self.batches_scheduled.fetch_add(1, Ordering::Relaxed);
        self.candidates_scheduled
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    pub(crate) fn batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn directory_failed(&self) {
        self.directory_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn last_check_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_check_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill the counter fields of a metrics view.
    pub(crate) fn fill(&self, metrics: &mut SchedulerMetrics) {
        metrics.cycles = self.cycles.load(Ordering::Relaxed);
        metrics.batches_scheduled = self.batches_scheduled.load(Ordering::Relaxed);
        metrics.batches_failed = self.batches_failed.load(Ordering::Relaxed);
        metrics.candidates_scheduled = self.candidates_scheduled.load(Ordering::Relaxed);
        metrics.directory_failures = self.directory_failures.load(Ordering::Relaxed);
    }
}
