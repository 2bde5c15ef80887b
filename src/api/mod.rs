//! HTTP control API for the round scheduler.
//!
//! Provides REST endpoints for starting and stopping the scheduler, tuning it
//! at runtime, and inspecting its status and recent dispatches.

mod errors;
mod handlers;
mod responses;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{ApiState, BatchSizeRequest, ConfigPatch};
pub use responses::*;

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ApiServerConfig, DEFAULT_API_HOST, DEFAULT_API_PORT};

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

impl From<&ApiServerConfig> for ApiConfig {
    fn from(config: &ApiServerConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }
}

impl ApiConfig {
    /// Create a new API config with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }
}

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Introspection
        .route("/api/scheduler/status", get(handlers::get_status))
        .route("/api/scheduler/metrics", get(handlers::get_metrics))
        .route("/api/events", get(handlers::list_events))
        // Control
        .route("/api/scheduler/start", post(handlers::start_scheduler))
        .route("/api/scheduler/stop", post(handlers::stop_scheduler))
        .route("/api/scheduler/reset", post(handlers::reset_scheduler))
        .route("/api/scheduler/check", post(handlers::run_check))
        .route("/api/scheduler/config", patch(handlers::patch_config))
        .route("/api/scheduler/batch-size", put(handlers::put_batch_size))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the API server.
///
/// This function spawns the server and returns a handle to the task.
/// The server runs until the task is aborted or the process exits.
pub async fn start_server(
    config: ApiConfig,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);
    let addr = config.socket_addr()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
