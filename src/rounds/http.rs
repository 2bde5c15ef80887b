//! HTTP client for the backend batch round endpoint.

use async_trait::async_trait;
use std::time::Duration;

use super::{RoundCreationError, RoundCreationService};
use crate::core::request::{BatchResult, RoundRequest};

/// Round service that submits batches with `POST <url>`.
pub struct HttpRoundService {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpRoundService {
    /// Create a round service client with a per-request timeout.
    pub fn new(
        url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RoundCreationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoundCreationError::Transport(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            api_token,
            timeout,
        })
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RoundCreationService for HttpRoundService {
    async fn create_rounds(&self, request: &RoundRequest) -> Result<BatchResult, RoundCreationError> {
        let mut req = self.client.post(&self.url).json(request);
        if let Some(ref token) = self.api_token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await.map_err(|e| {
            if e.is_timeout() {
                RoundCreationError::TimedOut(self.timeout)
            } else {
                RoundCreationError::Transport(e.to_string())
            }
        })?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| RoundCreationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RoundCreationError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(BatchResult::default());
        }
        // A non-JSON success body is still a success; keep it as a string.
        let value = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
        Ok(BatchResult(value))
    }
}
