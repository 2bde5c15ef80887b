//! Candidate directory abstraction.
//!
//! The directory is the read side of the recruitment backend: it returns the
//! full current list of candidates and the scheduler filters it client-side.

mod http;

pub use http::HttpCandidateDirectory;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::candidate::CandidateSnapshot;

/// Errors that can occur when fetching the candidate snapshot.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Network or transport failure. Expected to heal on its own.
    #[error("candidate directory unavailable: {0}")]
    Unavailable(String),

    /// The directory answered, but not with a usable candidate list.
    #[error("invalid candidate directory response: {0}")]
    InvalidResponse(String),
}

impl DirectoryError {
    /// Whether the error is a transient, network-class failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

/// Source of candidate snapshots.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    /// Fetch every candidate with their current check-in and round status,
    /// in the directory's own order.
    async fn fetch_candidates(&self) -> Result<Vec<CandidateSnapshot>, DirectoryError>;
}
