//! API integration tests.
//!
//! These tests drive the control API router in-process.

use crate::common::{Harness, fast_settings, ready_all};
use roundup::api::{ApiState, build_router};
use roundup::{EventLog, ObserverSet};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Create a router over a stopped scheduler with three ready candidates.
fn create_test_router(batch_size: usize) -> (Harness, Router) {
    let h = Harness::new(ready_all(&["a", "b", "c"]), fast_settings(batch_size));
    let events = Arc::new(EventLog::default());
    h.scheduler.set_observer(Arc::new(
        ObserverSet::new()
            .with(h.observer.clone())
            .with(events.clone()),
    ));
    let router = build_router(ApiState::new(h.scheduler.clone(), events));
    (h, router)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Test: Health endpoint responds with status ok.
#[tokio::test]
async fn test_health_endpoint() {
    let (_h, router) = create_test_router(3);

    let (status, json) = send(&router, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

/// Test: Status reflects settings and an idle scheduler.
#[tokio::test]
async fn test_status_endpoint() {
    let (_h, router) = create_test_router(3);

    let (status, json) = send(&router, Method::GET, "/api/scheduler/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], false);
    assert_eq!(json["batch_size"], 3);
    assert_eq!(json["round_duration_minutes"], 30);
    assert_eq!(json["processed_count"], 0);
    assert!(json["last_dispatch_at"].is_null());
}

/// Test: Start and stop report whether they changed anything.
#[tokio::test]
async fn test_start_and_stop_endpoints() {
    let (h, router) = create_test_router(5);

    let (status, json) = send(&router, Method::POST, "/api/scheduler/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(json["running"], true);

    let (_, json) = send(&router, Method::POST, "/api/scheduler/start", None).await;
    assert_eq!(json["changed"], false);

    let (_, json) = send(&router, Method::POST, "/api/scheduler/stop", None).await;
    assert_eq!(json["changed"], true);
    assert_eq!(json["running"], false);
    assert!(!h.scheduler.is_running());

    let (_, json) = send(&router, Method::POST, "/api/scheduler/stop", None).await;
    assert_eq!(json["changed"], false);
}

/// Test: A manual check dispatches and shows up in status and events.
#[tokio::test]
async fn test_check_dispatches_and_records_event() {
    let (h, router) = create_test_router(3);

    let (status, json) = send(&router, Method::POST, "/api/scheduler/check", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "dispatched");
    assert_eq!(json["candidates"], json!(["a", "b", "c"]));
    assert!(json["batch_id"].is_string());

    let (_, json) = send(&router, Method::POST, "/api/scheduler/check", None).await;
    assert_eq!(json["outcome"], "debounced");
    assert!(json["remaining_ms"].as_u64().unwrap() > 0);

    let (_, json) = send(&router, Method::GET, "/api/scheduler/status", None).await;
    assert_eq!(json["processed_count"], 3);
    assert!(json["last_dispatch_at"].is_string());

    let (_, json) = send(&router, Method::GET, "/api/events?limit=5", None).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["events"][0]["type"], "batch_scheduled");
    assert_eq!(json["events"][0]["candidates"][0]["email"], "a");

    assert_eq!(h.rounds.request_count(), 1);
}

/// Test: A check below threshold reports the counts.
#[tokio::test]
async fn test_check_below_threshold() {
    let (_h, router) = create_test_router(4);

    let (_, json) = send(&router, Method::POST, "/api/scheduler/check", None).await;

    assert_eq!(json["outcome"], "below_threshold");
    assert_eq!(json["eligible"], 3);
    assert_eq!(json["required"], 4);
}

/// Test: Reset clears history so the same candidates dispatch again.
#[tokio::test]
async fn test_reset_endpoint() {
    let (h, router) = create_test_router(3);
    send(&router, Method::POST, "/api/scheduler/check", None).await;

    let (status, _) = send(&router, Method::POST, "/api/scheduler/reset", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&router, Method::POST, "/api/scheduler/check", None).await;
    assert_eq!(json["outcome"], "dispatched");
    assert_eq!(h.rounds.request_count(), 2);
}

/// Test: Config patch applies valid fields and reports the rest.
#[tokio::test]
async fn test_config_patch_partial() {
    let (h, router) = create_test_router(3);

    let (status, json) = send(
        &router,
        Method::PATCH,
        "/api/scheduler/config",
        Some(json!({
            "batch_size": 0,
            "round_duration_minutes": 45,
            "poll_interval_ms": "fast"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["applied"], json!(["round_duration_minutes"]));
    let rejected: Vec<&str> = json["rejected"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["field"].as_str().unwrap())
        .collect();
    assert_eq!(rejected, vec!["batch_size", "poll_interval_ms"]);
    assert_eq!(json["status"]["round_duration_minutes"], 45);
    assert_eq!(h.scheduler.settings().batch_size, 3);
}

/// Test: A patch in which nothing applies is unprocessable.
#[tokio::test]
async fn test_config_patch_all_invalid() {
    let (_h, router) = create_test_router(3);

    let (status, json) = send(
        &router,
        Method::PATCH,
        "/api/scheduler/config",
        Some(json!({ "batch_size": -2 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "UNPROCESSABLE_ENTITY");
}

/// Test: Batch size endpoint validates and applies.
#[tokio::test]
async fn test_batch_size_endpoint() {
    let (h, router) = create_test_router(3);

    let (status, json) = send(
        &router,
        Method::PUT,
        "/api/scheduler/batch-size",
        Some(json!({ "batch_size": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["batch_size"], 2);
    assert_eq!(h.scheduler.settings().batch_size, 2);

    let (status, json) = send(
        &router,
        Method::PUT,
        "/api/scheduler/batch-size",
        Some(json!({ "batch_size": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(h.scheduler.settings().batch_size, 2);
}

/// Test: Metrics include counters after a failed dispatch.
#[tokio::test]
async fn test_metrics_endpoint() {
    let (h, router) = create_test_router(3);
    h.rounds.fail_next(1);
    send(&router, Method::POST, "/api/scheduler/check", None).await;

    let (status, json) = send(&router, Method::GET, "/api/scheduler/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cycles"], 1);
    assert_eq!(json["batches_failed"], 1);
    assert_eq!(json["batches_scheduled"], 0);
    assert_eq!(json["processed_count"], 0);
    assert!(json["last_check_at"].is_string());
}
