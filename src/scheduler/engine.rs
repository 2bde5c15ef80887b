//! Round scheduler engine implementation.
//!
//! The scheduler is responsible for:
//! - Polling the candidate directory on a timer
//! - Selecting eligible, checked-in candidates in directory order
//! - Dispatching one batch per cycle once the batch size is reached
//! - Never dispatching a candidate twice until reset
//! - Debouncing dispatches and serializing cycles
//! - Notifying the observer of every dispatch outcome

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::core::candidate::CandidateSnapshot;
use crate::core::request::RoundRequest;
use crate::core::types::{BatchId, CandidateId};
use crate::directory::{CandidateDirectory, DirectoryError};
use crate::events::{DispatchEvent, DispatchObserver};
use crate::rounds::{RoundCreationError, RoundCreationService};

use super::eligibility::select_batch;
use super::ledger::DispatchLedger;
use super::status::{CycleStats, SchedulerMetrics, SchedulerStatus, millis};
use super::types::{CycleOutcome, SchedulerError, SchedulerOptions, SchedulerSettings, SchedulerState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running polling loop.
struct Session {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// State shared between the control handle and the polling loop.
struct Shared {
    directory: Arc<dyn CandidateDirectory>,
    rounds: Arc<dyn RoundCreationService>,
    settings: RwLock<SchedulerSettings>,
    observer: RwLock<Option<Arc<dyn DispatchObserver>>>,
    ledger: Mutex<DispatchLedger>,
    stats: CycleStats,
    /// Poll interval changes, observed by the running loop.
    poll_interval_tx: watch::Sender<Duration>,
    /// Deadline of the loop's next tick while running.
    next_tick: Mutex<Option<Instant>>,
    /// Held for the duration of a cycle; at most one cycle is in flight.
    cycle_gate: tokio::sync::Mutex<()>,
}

/// Autonomous scheduler that batches checked-in candidates into interview rounds.
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct RoundScheduler {
    shared: Arc<Shared>,
    session: Arc<Mutex<Option<Session>>>,
}

impl RoundScheduler {
    /// Create a scheduler with default settings.
    pub fn new(
        directory: Arc<dyn CandidateDirectory>,
        rounds: Arc<dyn RoundCreationService>,
    ) -> Self {
        let (poll_interval_tx, _) = watch::channel(SchedulerSettings::default().poll_interval);
        Self {
            shared: Arc::new(Shared {
                directory,
                rounds,
                settings: RwLock::new(SchedulerSettings::default()),
                observer: RwLock::new(None),
                ledger: Mutex::new(DispatchLedger::default()),
                stats: CycleStats::default(),
                poll_interval_tx,
                next_tick: Mutex::new(None),
                cycle_gate: tokio::sync::Mutex::new(()),
            }),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a scheduler with validated settings.
    pub fn with_settings(
        directory: Arc<dyn CandidateDirectory>,
        rounds: Arc<dyn RoundCreationService>,
        settings: SchedulerSettings,
    ) -> Result<Self, SchedulerError> {
        settings.validate()?;
        let scheduler = Self::new(directory, rounds);
        scheduler.shared.poll_interval_tx.send_replace(settings.poll_interval);
        *scheduler
            .shared
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(scheduler)
    }

    /// Set the observer.
    pub fn with_observer(self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.set_observer(observer);
        self
    }

    /// Start the polling loop.
    ///
    /// Begins a fresh session (dispatch history is cleared unless
    /// `reset_on_start` is off). Returns `false` if the loop was already running.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut session = lock(&self.session);
        if session.as_ref().is_some_and(|s| !s.task.is_finished()) {
            info!("Round scheduler already running, ignoring start");
            return false;
        }

        let settings = self.settings();
        if settings.reset_on_start {
            lock(&self.shared.ledger).clear();
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(
            async move { shared.run(stop_rx).await }.instrument(info_span!("round_scheduler")),
        );
        *session = Some(Session { stop_tx, task });

        info!(
            batch_size = settings.batch_size,
            round_duration_minutes = settings.round_duration_minutes,
            poll_interval = ?settings.poll_interval,
            min_dispatch_gap = ?settings.min_dispatch_gap,
            "Round scheduler started"
        );
        true
    }

    /// Stop the polling loop.
    ///
    /// No further cycles are scheduled. A cycle already in flight finishes and
    /// still records its outcome. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        match self.take_session() {
            Some(session) => {
                let _ = session.stop_tx.send(());
                info!("Round scheduler stopped");
                true
            }
            None => {
                debug!("Round scheduler already stopped");
                false
            }
        }
    }

    /// Stop the polling loop and wait for an in-flight cycle to finish.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SchedulerError> {
        let Some(session) = self.take_session() else {
            return Ok(());
        };
        let _ = session.stop_tx.send(());

        match tokio::time::timeout(timeout, session.task).await {
            Ok(Ok(())) => {
                info!("Round scheduler shut down");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Round scheduler loop ended abnormally");
                Ok(())
            }
            Err(_) => {
                warn!(?timeout, "Round scheduler shutdown timed out with a cycle in flight");
                Err(SchedulerError::ShutdownTimeout(timeout))
            }
        }
    }

    fn take_session(&self) -> Option<Session> {
        lock(&self.session).take()
    }

    /// Check if the polling loop is active.
    pub fn is_running(&self) -> bool {
        lock(&self.session)
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// Get the current scheduler state.
    pub fn state(&self) -> SchedulerState {
        if self.is_running() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Apply a partial settings update.
    ///
    /// Valid fields are applied even if others are rejected. Returns the
    /// rejected fields; an empty list means everything was applied.
    pub fn configure(&self, options: SchedulerOptions) -> Vec<SchedulerError> {
        let mut rejected = Vec::new();
        {
            let mut settings = self
                .shared
                .settings
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            match options.batch_size {
                Some(0) => rejected.push(SchedulerError::invalid("batch_size", "must be positive")),
                Some(n) => settings.batch_size = n,
                None => {}
            }
            match options.round_duration_minutes {
                Some(0) => rejected.push(SchedulerError::invalid(
                    "round_duration_minutes",
                    "must be positive",
                )),
                Some(m) => settings.round_duration_minutes = m,
                None => {}
            }
            match options.poll_interval {
                Some(d) if d.is_zero() => {
                    rejected.push(SchedulerError::invalid("poll_interval", "must be positive"))
                }
                Some(d) => {
                    settings.poll_interval = d;
                    self.shared.poll_interval_tx.send_if_modified(|current| {
                        let changed = *current != d;
                        *current = d;
                        changed
                    });
                }
                None => {}
            }
            match options.min_dispatch_gap {
                Some(d) if d.is_zero() => rejected.push(SchedulerError::invalid(
                    "min_dispatch_gap",
                    "must be positive",
                )),
                Some(d) => settings.min_dispatch_gap = d,
                None => {}
            }
        }

        if let Some(observer) = options.observer {
            self.set_observer(observer);
        }

        for error in &rejected {
            warn!(error = %error, "Ignoring invalid scheduler option");
        }
        rejected
    }

    /// Change the batch size; takes effect on the next cycle.
    pub fn update_batch_size(&self, batch_size: usize) -> Result<(), SchedulerError> {
        match self
            .configure(SchedulerOptions::new().batch_size(batch_size))
            .into_iter()
            .next()
        {
            Some(error) => Err(error),
            None => {
                info!(batch_size, "Batch size updated");
                Ok(())
            }
        }
    }

    /// Register the observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn DispatchObserver>) {
        *self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Remove the observer.
    pub fn clear_observer(&self) {
        *self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Forget which candidates were dispatched and when. Does not change run state.
    pub fn reset(&self) {
        lock(&self.shared.ledger).clear();
        info!("Round scheduler history cleared");
    }

    /// Get a copy of the current settings.
    pub fn settings(&self) -> SchedulerSettings {
        self.shared.settings()
    }

    /// Get the identifiers dispatched since the last reset, sorted.
    pub fn processed_candidates(&self) -> Vec<CandidateId> {
        let mut ids: Vec<CandidateId> = lock(&self.shared.ledger)
            .processed()
            .iter()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Get the current status.
    pub fn status(&self) -> SchedulerStatus {
        let running = self.is_running();
        let settings = self.settings();
        let ledger = lock(&self.shared.ledger);
        SchedulerStatus {
            running,
            batch_size: settings.batch_size,
            round_duration_minutes: settings.round_duration_minutes,
            poll_interval_ms: millis(settings.poll_interval),
            min_dispatch_gap_ms: millis(settings.min_dispatch_gap),
            processed_count: ledger.processed_count(),
            last_dispatch_at: ledger.last_dispatch_at(),
        }
    }

    /// Get the status plus derived timings and counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        let status = self.status();
        let settings = self.settings();
        let now = Instant::now();
        let (since_last, debounce_remaining) = {
            let ledger = lock(&self.shared.ledger);
            (
                ledger.since_last_dispatch(now),
                ledger.debounce_remaining(settings.min_dispatch_gap, now),
            )
        };
        let time_to_next_check = if status.running {
            Some(
                lock(&self.shared.next_tick)
                    .map_or(Duration::ZERO, |at| at.saturating_duration_since(now)),
            )
        } else {
            None
        };

        let mut metrics = SchedulerMetrics {
            status,
            time_since_last_dispatch_ms: since_last.map(millis),
            time_to_next_check_ms: time_to_next_check.map(millis),
            debounce_remaining_ms: debounce_remaining.map(millis),
            last_check_at: self.shared.stats.last_check_at(),
            cycles: 0,
            batches_scheduled: 0,
            batches_failed: 0,
            candidates_scheduled: 0,
            directory_failures: 0,
        };
        self.shared.stats.fill(&mut metrics);
        metrics
    }

    /// Run one check-and-process cycle now, outside the timer.
    ///
    /// Subject to the same debounce gate and serialization as timer cycles.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.shared.run_cycle().await
    }
}

fn ticker(period: Duration, start: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl Shared {
    fn settings(&self) -> SchedulerSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_next_tick(&self, at: Instant) {
        *lock(&self.next_tick) = Some(at);
    }

    /// Main polling loop.
    ///
    /// Each cycle is awaited before the next tick is taken, so ticks that fall
    /// inside a slow cycle are skipped rather than overlapped. A poll interval
    /// change restarts the ticker at the new period.
    async fn run(self: Arc<Self>, mut stop_rx: oneshot::Receiver<()>) {
        let mut poll_interval_rx = self.poll_interval_tx.subscribe();
        let mut period = *poll_interval_rx.borrow_and_update();
        let now = Instant::now();
        let mut interval = ticker(period, now);
        self.set_next_tick(now);

        loop {
            tokio::select! {
                biased;

                _ = &mut stop_rx => break,

                Ok(()) = poll_interval_rx.changed() => {
                    let configured = *poll_interval_rx.borrow_and_update();
                    if configured != period {
                        info!(old = ?period, new = ?configured, "Poll interval changed");
                        period = configured;
                        let next = Instant::now() + period;
                        interval = ticker(period, next);
                        self.set_next_tick(next);
                    }
                }

                tick = interval.tick() => {
                    self.set_next_tick(tick + period);
                    let outcome = self.run_cycle().await;
                    debug!(outcome = outcome.label(), "Cycle finished");
                }
            }
        }

        debug!("Polling loop exited");
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_gate) = self.cycle_gate.try_lock() else {
            debug!("Previous cycle still in flight, skipping");
            return CycleOutcome::Busy;
        };
        self.stats.cycle_started();

        // Read once so a concurrent configure() cannot tear this cycle.
        let settings = self.settings();

        let remaining =
            lock(&self.ledger).debounce_remaining(settings.min_dispatch_gap, Instant::now());
        if let Some(remaining) = remaining {
            return CycleOutcome::Debounced { remaining };
        }

        let snapshot = match tokio::time::timeout(
            settings.request_timeout,
            self.directory.fetch_candidates(),
        )
        .await
        {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(error)) => return self.directory_failed(error).await,
            Err(_) => {
                let error = DirectoryError::Unavailable(format!(
                    "timed out after {:?}",
                    settings.request_timeout
                ));
                return self.directory_failed(error).await;
            }
        };

        let batch: Vec<CandidateSnapshot> = {
            let ledger = lock(&self.ledger);
            let selection = select_batch(&snapshot, ledger.processed(), settings.batch_size);
            if selection.batch.is_empty() {
                debug!(
                    eligible = selection.eligible,
                    required = settings.batch_size,
                    "Not enough eligible candidates"
                );
                return CycleOutcome::BelowThreshold {
                    eligible: selection.eligible,
                    required: settings.batch_size,
                };
            }
            selection.batch.into_iter().cloned().collect()
        };

        self.dispatch(batch, &settings).await
    }

    async fn directory_failed(&self, error: DirectoryError) -> CycleOutcome {
        self.stats.directory_failed();
        let transient = error.is_transient();
        if transient {
            debug!(error = %error, "Candidate directory unavailable, skipping cycle");
        } else {
            warn!(error = %error, "Unusable candidate directory response, skipping cycle");
            self.notify(DispatchEvent::directory_warning(error.to_string()))
                .await;
        }
        CycleOutcome::DirectoryFailed {
            transient,
            error: error.to_string(),
        }
    }

    async fn dispatch(&self, batch: Vec<CandidateSnapshot>, settings: &SchedulerSettings) -> CycleOutcome {
        let batch_id = BatchId::new();
        let ids: Vec<CandidateId> = batch.iter().map(|c| c.id().clone()).collect();
        let dispatched_at = Utc::now();
        let request = RoundRequest::new(
            ids.clone(),
            settings.batch_size,
            settings.round_duration_minutes,
            &dispatched_at.with_timezone(&settings.timezone),
        );

        info!(batch_id = %batch_id, candidates = ids.len(), "Dispatching batch");

        let result = match tokio::time::timeout(
            settings.request_timeout,
            self.rounds.create_rounds(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RoundCreationError::TimedOut(settings.request_timeout)),
        };

        match result {
            Ok(result) => {
                lock(&self.ledger).record_dispatch(
                    ids.iter().cloned(),
                    dispatched_at,
                    Instant::now(),
                );
                self.stats.batch_scheduled(ids.len());
                info!(batch_id = %batch_id, candidates = ids.len(), "Batch scheduled");
                self.notify(DispatchEvent::batch_scheduled(
                    batch_id,
                    batch,
                    result,
                    dispatched_at,
                ))
                .await;
                CycleOutcome::Dispatched {
                    batch_id,
                    candidates: ids,
                }
            }
            Err(error) => {
                self.stats.batch_failed();
                warn!(
                    batch_id = %batch_id,
                    error = %error,
                    "Batch dispatch failed, candidates stay eligible"
                );
                self.notify(DispatchEvent::batch_failed(
                    batch_id,
                    batch,
                    error.to_string(),
                    Utc::now(),
                ))
                .await;
                CycleOutcome::DispatchFailed {
                    batch_id,
                    error: error.to_string(),
                }
            }
        }
    }

    async fn notify(&self, event: DispatchEvent) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer.on_event(&event).await;
        }
    }
}
