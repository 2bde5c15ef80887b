//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use roundup::testing::{RecordingObserver, RecordingRoundService, StaticDirectory};
use roundup::{CandidateSnapshot, RoundScheduler, SchedulerSettings};
use std::sync::Arc;
use std::time::Duration;

/// A candidate with a slot, checked in, and no rounds.
pub fn ready(email: &str) -> CandidateSnapshot {
    CandidateSnapshot::new(email).with_slot().checked_in()
}

/// Ready candidates in the given order.
pub fn ready_all(emails: &[&str]) -> Vec<CandidateSnapshot> {
    emails.iter().map(|e| ready(e)).collect()
}

/// Settings with a short poll interval for loop tests.
pub fn fast_settings(batch_size: usize) -> SchedulerSettings {
    SchedulerSettings {
        batch_size,
        poll_interval: Duration::from_millis(100),
        min_dispatch_gap: Duration::from_secs(30),
        ..SchedulerSettings::default()
    }
}

/// A scheduler wired to in-memory collaborators.
pub struct Harness {
    pub directory: Arc<StaticDirectory>,
    pub rounds: Arc<RecordingRoundService>,
    pub observer: Arc<RecordingObserver>,
    pub scheduler: RoundScheduler,
}

impl Harness {
    pub fn new(candidates: Vec<CandidateSnapshot>, settings: SchedulerSettings) -> Self {
        let directory = Arc::new(StaticDirectory::new(candidates));
        let rounds = Arc::new(RecordingRoundService::new());
        let observer = Arc::new(RecordingObserver::new());
        let scheduler = RoundScheduler::with_settings(directory.clone(), rounds.clone(), settings)
            .unwrap()
            .with_observer(observer.clone());
        Self {
            directory,
            rounds,
            observer,
            scheduler,
        }
    }

    /// Emails of every dispatched request, in order.
    pub fn dispatched_batches(&self) -> Vec<Vec<String>> {
        self.rounds
            .requests()
            .iter()
            .map(|r| r.identifiers.iter().map(|id| id.to_string()).collect())
            .collect()
    }
}

/// Wait until `condition` holds, polling every 10ms.
///
/// # Panics
///
/// Panics if the timeout is reached before the condition holds.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout after {:?} waiting for condition", timeout);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
