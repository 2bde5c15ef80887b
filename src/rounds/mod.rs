//! Round creation service abstraction.
//!
//! The write side of the recruitment backend: provisions interview rounds for
//! a batch of candidates.

mod http;

pub use http::HttpRoundService;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::request::{BatchResult, RoundRequest};

/// Errors that can occur when creating rounds.
///
/// Every variant leaves the batch unprocessed; the scheduler retries it on a
/// later cycle.
#[derive(Debug, Clone, Error)]
pub enum RoundCreationError {
    /// The service answered and refused the batch.
    #[error("round creation rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service could not be reached.
    #[error("round creation service unreachable: {0}")]
    Transport(String),

    /// The service did not answer in time.
    #[error("round creation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Service that provisions interview rounds for a batch of candidates.
#[async_trait]
pub trait RoundCreationService: Send + Sync {
    /// Create rounds for every candidate in the request.
    async fn create_rounds(&self, request: &RoundRequest) -> Result<BatchResult, RoundCreationError>;
}
