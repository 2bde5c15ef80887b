//! Dispatch events and observers.
//!
//! Every dispatch attempt produces exactly one [`DispatchEvent`], delivered to
//! the scheduler's observer (if any) from inside the cycle that made the attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::candidate::CandidateSnapshot;
use crate::core::request::BatchResult;
use crate::core::types::BatchId;

/// Outcome notifications published by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// The round creation service accepted a batch.
    BatchScheduled {
        batch_id: BatchId,
        candidates: Vec<CandidateSnapshot>,
        result: BatchResult,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch attempt failed. The candidates stay eligible.
    BatchFailed {
        batch_id: BatchId,
        candidates: Vec<CandidateSnapshot>,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// The directory answered with something unusable (not a network failure).
    ///
    /// Soft warning only; the cycle is skipped and retried on the next tick.
    DirectoryWarning {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl DispatchEvent {
    /// Create a BatchScheduled event.
    pub fn batch_scheduled(
        batch_id: BatchId,
        candidates: Vec<CandidateSnapshot>,
        result: BatchResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        DispatchEvent::BatchScheduled {
            batch_id,
            candidates,
            result,
            timestamp,
        }
    }

    /// Create a BatchFailed event.
    pub fn batch_failed(
        batch_id: BatchId,
        candidates: Vec<CandidateSnapshot>,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        DispatchEvent::BatchFailed {
            batch_id,
            candidates,
            error: error.into(),
            timestamp,
        }
    }

    /// Create a DirectoryWarning event stamped now.
    pub fn directory_warning(error: impl Into<String>) -> Self {
        DispatchEvent::DirectoryWarning {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DispatchEvent::BatchScheduled { timestamp, .. } => *timestamp,
            DispatchEvent::BatchFailed { timestamp, .. } => *timestamp,
            DispatchEvent::DirectoryWarning { timestamp, .. } => *timestamp,
        }
    }

    /// Get the wire tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::BatchScheduled { .. } => "batch_scheduled",
            DispatchEvent::BatchFailed { .. } => "batch_failed",
            DispatchEvent::DirectoryWarning { .. } => "directory_warning",
        }
    }

    /// Candidates involved in the event (empty for directory warnings).
    pub fn candidates(&self) -> &[CandidateSnapshot] {
        match self {
            DispatchEvent::BatchScheduled { candidates, .. }
            | DispatchEvent::BatchFailed { candidates, .. } => candidates,
            DispatchEvent::DirectoryWarning { .. } => &[],
        }
    }
}

/// Receiver of dispatch events.
///
/// Called inline by the scheduling cycle, so implementations should return
/// quickly and not perform further slow I/O.
#[async_trait]
pub trait DispatchObserver: Send + Sync {
    /// Handle an event.
    async fn on_event(&self, event: &DispatchEvent);
}

/// Observer backed by a plain function or closure.
pub struct FnObserver<F> {
    f: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&DispatchEvent) + Send + Sync,
{
    /// Wrap a closure as an observer.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> DispatchObserver for FnObserver<F>
where
    F: Fn(&DispatchEvent) + Send + Sync,
{
    async fn on_event(&self, event: &DispatchEvent) {
        (self.f)(event);
    }
}

/// Observer that forwards each event to several observers, in registration order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn DispatchObserver>>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    pub fn with(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Get the number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl DispatchObserver for ObserverSet {
    async fn on_event(&self, event: &DispatchEvent) {
        for observer in &self.observers {
            observer.on_event(event).await;
        }
    }
}

/// Default number of events retained by an [`EventLog`].
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 100;

/// Observer that keeps the most recent events in memory.
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<DispatchEvent>>,
}

impl EventLog {
    /// Create a log retaining at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Get up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<DispatchEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Get the number of retained events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

#[async_trait]
impl DispatchObserver for EventLog {
    async fn on_event(&self, event: &DispatchEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}
