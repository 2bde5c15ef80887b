//! HTTP client for the backend candidate listing.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{CandidateDirectory, DirectoryError};
use crate::core::candidate::CandidateSnapshot;

/// Accepted shapes of the candidate listing body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateListing {
    Bare(Vec<CandidateSnapshot>),
    Candidates { candidates: Vec<CandidateSnapshot> },
    Data { data: Vec<CandidateSnapshot> },
}

impl CandidateListing {
    fn into_candidates(self) -> Vec<CandidateSnapshot> {
        match self {
            CandidateListing::Bare(list) => list,
            CandidateListing::Candidates { candidates } => candidates,
            CandidateListing::Data { data } => data,
        }
    }
}

/// Directory that reads candidates with `GET <url>`.
pub struct HttpCandidateDirectory {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
}

impl HttpCandidateDirectory {
    /// Create a directory client with a per-request timeout.
    pub fn new(
        url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::InvalidResponse(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            api_token,
        })
    }

    /// Get the listing URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Statuses that clear up without any change to the request.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl CandidateDirectory for HttpCandidateDirectory {
    async fn fetch_candidates(&self) -> Result<Vec<CandidateSnapshot>, DirectoryError> {
        let mut req = self.client.get(&self.url);
        if let Some(ref token) = self.api_token {
            req = req.bearer_auth(token);
        }

        let res = req
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if is_transient_status(status) {
            return Err(DirectoryError::Unavailable(format!(
                "directory returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(DirectoryError::InvalidResponse(format!(
                "directory returned {}: {}",
                status, body
            )));
        }

        let listing: CandidateListing = serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;
        Ok(listing.into_candidates())
    }
}
