//! Dispatch history: which candidates have been batched, and when.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::types::CandidateId;

/// Record of successful dispatches since the last reset.
///
/// Only a confirmed dispatch adds to the ledger; failed attempts never touch it.
#[derive(Debug, Default)]
pub(crate) struct DispatchLedger {
    processed: HashSet<CandidateId>,
    /// Wall-clock time of the last successful dispatch, for reporting.
    last_dispatch_at: Option<DateTime<Utc>>,
    /// Monotonic time the service confirmed the last dispatch, for the debounce
    /// gate. The gap is measured between confirmations, not between requests.
    last_dispatch_instant: Option<Instant>,
}

impl DispatchLedger {
    /// Forget all dispatch history.
    pub(crate) fn clear(&mut self) {
        self.processed.clear();
        self.last_dispatch_at = None;
        self.last_dispatch_instant = None;
    }

    /// Record a batch the round creation service accepted.
    pub(crate) fn record_dispatch(
        &mut self,
        ids: impl IntoIterator<Item = CandidateId>,
        at: DateTime<Utc>,
        instant: Instant,
    ) {
        self.processed.extend(ids);
        self.last_dispatch_at = Some(at);
        self.last_dispatch_instant = Some(instant);
    }

    pub(crate) fn processed(&self) -> &HashSet<CandidateId> {
        &self.processed
    }

    pub(crate) fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub(crate) fn last_dispatch_at(&self) -> Option<DateTime<Utc>> {
        self.last_dispatch_at
    }

    pub(crate) fn since_last_dispatch(&self, now: Instant) -> Option<Duration> {
        self.last_dispatch_instant
            .map(|at| now.saturating_duration_since(at))
    }

    /// Time left before another dispatch is allowed, or `None` if allowed now.
    pub(crate) fn debounce_remaining(&self, gap: Duration, now: Instant) -> Option<Duration> {
        let elapsed = self.since_last_dispatch(now)?;
        if elapsed < gap {
            Some(gap - elapsed)
        } else {
            None
        }
    }
}
