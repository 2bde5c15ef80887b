//! The HTTP collaborators against a local mock backend.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use roundup::{
    CandidateDirectory, DirectoryError, HttpCandidateDirectory, HttpRoundService,
    RoundCreationError, RoundScheduler, SchedulerSettings,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Backend {
    candidates: Arc<Mutex<Value>>,
    rounds_status: Arc<Mutex<u16>>,
    received: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn list_candidates(State(backend): State<Backend>) -> Json<Value> {
    Json(backend.candidates.lock().unwrap().clone())
}

async fn create_rounds(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let created = body["identifiers"].as_array().map(Vec::len).unwrap_or(0);
    backend.received.lock().unwrap().push((auth, body));

    let status = StatusCode::from_u16(*backend.rounds_status.lock().unwrap()).unwrap();
    (status, Json(json!({ "created": created })))
}

async fn throttled() -> (StatusCode, &'static str) {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

/// Serve the mock backend on an ephemeral port and return its base URL.
async fn serve(backend: Backend) -> String {
    let router = Router::new()
        .route("/api/candidates", get(list_candidates))
        .route("/api/rounds/batch", post(create_rounds))
        .route("/api/throttled", get(throttled))
        .with_state(backend);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn ready(email: &str) -> Value {
    json!({
        "email": email,
        "hasAssignedSlot": true,
        "isCheckedIn": true,
        "rounds": {}
    })
}

/// Test: A scheduler wired to the HTTP collaborators dispatches one batch.
#[tokio::test]
async fn test_dispatch_over_http() {
    let backend = Backend::default();
    *backend.candidates.lock().unwrap() = json!({
        "data": [ready("a@x.io"), ready("b@x.io"), {"email": "c@x.io", "hasAssignedSlot": true}]
    });
    *backend.rounds_status.lock().unwrap() = 201;
    let base = serve(backend.clone()).await;

    let timeout = Duration::from_secs(2);
    let directory =
        HttpCandidateDirectory::new(format!("{}/api/candidates", base), None, timeout).unwrap();
    let rounds = HttpRoundService::new(
        format!("{}/api/rounds/batch", base),
        Some("secret".to_string()),
        timeout,
    )
    .unwrap();
    let settings = SchedulerSettings {
        batch_size: 2,
        ..SchedulerSettings::default()
    };
    let scheduler =
        RoundScheduler::with_settings(Arc::new(directory), Arc::new(rounds), settings).unwrap();

    let outcome = scheduler.run_cycle().await;
    assert_eq!(outcome.label(), "dispatched");

    let received = backend.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let (auth, body) = &received[0];
    assert_eq!(auth.as_deref(), Some("Bearer secret"));
    assert_eq!(body["identifiers"], json!(["a@x.io", "b@x.io"]));
    assert_eq!(body["batchSize"], 2);
    assert_eq!(body["roundDuration"], 30);
    assert!(body["startDate"].is_string());
    assert_eq!(body["startTime"].as_str().unwrap().len(), 5);
}

/// Test: Non-2xx from the round service is a rejection and marks nothing.
#[tokio::test]
async fn test_rejected_batch_over_http() {
    let backend = Backend::default();
    *backend.candidates.lock().unwrap() = json!([ready("a@x.io")]);
    *backend.rounds_status.lock().unwrap() = 409;
    let base = serve(backend.clone()).await;

    let timeout = Duration::from_secs(2);
    let rounds =
        HttpRoundService::new(format!("{}/api/rounds/batch", base), None, timeout).unwrap();
    let request = roundup::RoundRequest::new(
        vec![roundup::CandidateId::new("a@x.io")],
        1,
        30,
        &chrono::Utc::now(),
    );

    let err = roundup::RoundCreationService::create_rounds(&rounds, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, RoundCreationError::Rejected { status: 409, .. }));
}

/// Test: A listing that is not a candidate array is a non-transient error.
#[tokio::test]
async fn test_unusable_listing_over_http() {
    let backend = Backend::default();
    *backend.candidates.lock().unwrap() = json!({"error": "maintenance"});
    let base = serve(backend).await;

    let directory = HttpCandidateDirectory::new(
        format!("{}/api/candidates", base),
        None,
        Duration::from_secs(2),
    )
    .unwrap();

    let err = directory.fetch_candidates().await.unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidResponse(_)));
    assert!(!err.is_transient());
}

/// Test: A missing listing route is a non-transient error.
#[tokio::test]
async fn test_not_found_listing_over_http() {
    let base = serve(Backend::default()).await;
    let directory =
        HttpCandidateDirectory::new(format!("{}/nope", base), None, Duration::from_secs(2))
            .unwrap();

    let err = directory.fetch_candidates().await.unwrap_err();
    assert!(!err.is_transient());
}

/// Test: A throttled listing is transient and reported as unavailable.
#[tokio::test]
async fn test_throttled_listing_is_transient() {
    let base = serve(Backend::default()).await;
    let directory = HttpCandidateDirectory::new(
        format!("{}/api/throttled", base),
        None,
        Duration::from_secs(2),
    )
    .unwrap();

    let err = directory.fetch_candidates().await.unwrap_err();
    assert!(matches!(err, DirectoryError::Unavailable(_)));
    assert!(err.is_transient());
}
