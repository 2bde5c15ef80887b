//! Start, stop, reset and shutdown behavior of the polling loop.

use crate::common::{Harness, fast_settings, ready_all, wait_until};
use roundup::{SchedulerError, SchedulerOptions, SchedulerSettings, SchedulerState};
use std::time::Duration;
use tokio::time::sleep;

/// Test: Stop halts polling and keeps history; start begins a fresh session.
#[tokio::test(start_paused = true)]
async fn test_stop_then_start_clears_history() {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(3));

    h.scheduler.start();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.rounds.request_count(), 1);

    h.scheduler.stop();
    assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    assert_eq!(h.scheduler.status().processed_count, 3);

    let fetches = h.directory.fetch_count();
    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.directory.fetch_count(), fetches);

    // A fresh session forgets both the processed set and the last dispatch.
    h.scheduler.start();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.rounds.request_count(), 2);
    h.scheduler.stop();
}

/// Test: Reset while running makes the same candidates eligible again.
#[tokio::test(start_paused = true)]
async fn test_reset_while_running() {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(3));
    h.scheduler.start();
    sleep(Duration::from_millis(50)).await;

    h.scheduler.reset();
    assert!(h.scheduler.is_running(), "reset does not change run state");

    sleep(Duration::from_millis(150)).await;
    assert_eq!(h.rounds.request_count(), 2);
    h.scheduler.stop();
}

/// Test: A poll interval change takes effect on the running loop.
#[tokio::test(start_paused = true)]
async fn test_poll_interval_change_applies_to_running_loop() {
    let h = Harness::new(ready_all(&["a"]), fast_settings(3));
    h.scheduler.start();
    sleep(Duration::from_millis(1050)).await;
    let before = h.directory.fetch_count();
    assert!(before >= 10);

    let rejected = h
        .scheduler
        .configure(SchedulerOptions::new().poll_interval(Duration::from_secs(10)));
    assert!(rejected.is_empty());

    // The next tick is one full new period after the change.
    sleep(Duration::from_millis(150)).await;
    let after_change = h.directory.fetch_count();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.directory.fetch_count(), after_change);

    sleep(Duration::from_secs(6)).await;
    assert_eq!(h.directory.fetch_count(), after_change + 1);
    h.scheduler.stop();
}

/// Test: Shortening a long poll interval takes effect without waiting out the old period.
#[tokio::test(start_paused = true)]
async fn test_shortened_poll_interval_applies_immediately() {
    let settings = SchedulerSettings {
        poll_interval: Duration::from_secs(60),
        ..fast_settings(3)
    };
    let h = Harness::new(ready_all(&["a"]), settings);
    h.scheduler.start();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.directory.fetch_count(), 1);

    let rejected = h
        .scheduler
        .configure(SchedulerOptions::new().poll_interval(Duration::from_millis(100)));
    assert!(rejected.is_empty());

    sleep(Duration::from_secs(5)).await;
    let fetches = h.directory.fetch_count();
    assert!(fetches >= 40, "expected polling at the new interval, got {} fetches", fetches);
    h.scheduler.stop();
}

/// Test: Graceful shutdown waits for the dispatch in flight.
#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_in_flight_dispatch() {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(3));
    h.rounds.set_delay(Duration::from_secs(2));
    h.scheduler.start();
    sleep(Duration::from_millis(50)).await;

    h.scheduler.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(h.rounds.request_count(), 1);
    assert_eq!(h.observer.count("batch_scheduled").await, 1);
    assert_eq!(h.scheduler.status().processed_count, 3);
}

/// Test: Shutdown reports a cycle that outlives the deadline.
#[tokio::test(start_paused = true)]
async fn test_shutdown_deadline() {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(3));
    h.rounds.set_delay(Duration::from_secs(8));
    h.scheduler.start();
    sleep(Duration::from_millis(50)).await;

    let err = h
        .scheduler
        .shutdown(Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, SchedulerError::ShutdownTimeout(Duration::from_secs(1)));
}

/// Test: Directory outages do not stop the loop.
#[tokio::test(start_paused = true)]
async fn test_recovers_after_directory_outage() {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(3));
    h.directory
        .set_error(Some(roundup::DirectoryError::Unavailable("503".into())));
    h.scheduler.start();

    sleep(Duration::from_millis(550)).await;
    assert_eq!(h.rounds.request_count(), 0);
    assert!(h.scheduler.metrics().directory_failures >= 5);

    h.directory.set_error(None);
    let rounds = h.rounds.clone();
    wait_until(Duration::from_secs(1), move || rounds.request_count() == 1).await;
    assert!(h.scheduler.is_running());
    h.scheduler.stop();
}
