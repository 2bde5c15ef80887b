//! Testing utilities for users of the roundup library.
//!
//! This module provides in-memory collaborators for exercising the scheduler
//! without a network:
//!
//! - [`StaticDirectory`]: A candidate directory backed by a settable snapshot
//! - [`RecordingRoundService`]: A round creation service that records requests
//! - [`RecordingObserver`]: An observer that captures dispatch events

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::core::candidate::CandidateSnapshot;
use crate::core::request::{BatchResult, RoundRequest};
use crate::directory::{CandidateDirectory, DirectoryError};
use crate::events::{DispatchEvent, DispatchObserver};
use crate::rounds::{RoundCreationError, RoundCreationService};

/// A candidate directory that returns a fixed snapshot.
///
/// # Example
///
/// ```
/// use roundup::CandidateSnapshot;
/// use roundup::testing::StaticDirectory;
///
/// let directory = StaticDirectory::new(vec![
///     CandidateSnapshot::new("a@example.com").with_slot().checked_in(),
/// ]);
/// directory.push(CandidateSnapshot::new("b@example.com").with_slot().checked_in());
/// assert_eq!(directory.candidates().len(), 2);
/// ```
#[derive(Default)]
pub struct StaticDirectory {
    candidates: Mutex<Vec<CandidateSnapshot>>,
    error: Mutex<Option<DirectoryError>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl StaticDirectory {
    /// Create a directory serving the given snapshot.
    pub fn new(candidates: Vec<CandidateSnapshot>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Self::default()
        }
    }

    /// Replace the snapshot.
    pub fn set_candidates(&self, candidates: Vec<CandidateSnapshot>) {
        *self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = candidates;
    }

    /// Append a candidate to the snapshot.
    pub fn push(&self, candidate: CandidateSnapshot) {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(candidate);
    }

    /// Get a copy of the snapshot.
    pub fn candidates(&self) -> Vec<CandidateSnapshot> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every fetch fail with `error`, or succeed again with `None`.
    pub fn set_error(&self, error: Option<DirectoryError>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Delay every fetch.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Get the number of fetches started.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateDirectory for StaticDirectory {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateSnapshot>, DirectoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let error = self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match error {
            Some(error) => Err(error),
            None => Ok(self.candidates()),
        }
    }
}

/// A round creation service that records every request it completes.
///
/// Requests are recorded after the optional delay, so a request that is
/// still in flight (or abandoned by a timeout) is not counted.
#[derive(Default)]
pub struct RecordingRoundService {
    requests: Mutex<Vec<RoundRequest>>,
    response: Mutex<BatchResult>,
    delay: Mutex<Option<Duration>>,
    fail: AtomicBool,
    fail_next: AtomicU32,
}

impl RecordingRoundService {
    /// Create a service that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result returned for accepted requests.
    pub fn with_response(self, response: serde_json::Value) -> Self {
        *self.response.lock().unwrap_or_else(PoisonError::into_inner) = BatchResult(response);
        self
    }

    /// Reject every request while `fail` is set.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Reject the next `count` requests, then accept again.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Delay every request.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Get the completed requests, oldest first.
    pub fn requests(&self) -> Vec<RoundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the number of completed requests.
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn should_fail(&self) -> bool {
        if self.fail.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RoundCreationService for RecordingRoundService {
    async fn create_rounds(&self, request: &RoundRequest) -> Result<BatchResult, RoundCreationError> {
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if self.should_fail() {
            return Err(RoundCreationError::Rejected {
                status: 500,
                message: "intentional test failure".to_string(),
            });
        }
        Ok(self
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// An observer that captures every event it receives.
#[derive(Default)]
pub struct RecordingObserver {
    events: tokio::sync::Mutex<Vec<DispatchEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the captured events, oldest first.
    ///
    /// Note: This is an async method because it acquires a lock.
    pub async fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().await.clone()
    }

    /// Get the number of captured events of the given kind.
    pub async fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

#[async_trait]
impl DispatchObserver for RecordingObserver {
    async fn on_event(&self, event: &DispatchEvent) {
        self.events.lock().await.push(event.clone());
    }
}
