//! Core domain types: identifiers, candidate snapshots and round requests.

pub mod candidate;
pub mod request;
pub mod types;
