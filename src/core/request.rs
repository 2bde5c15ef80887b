//! Round-creation request and response types.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};

use super::types::CandidateId;

/// Minutes between a round's start time and end time.
///
/// Fixed, and independent of the configured round duration.
pub const DISPATCH_WINDOW_MINUTES: i64 = 30;

/// Request sent to the round creation service for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRequest {
    /// Candidates in the batch, in snapshot order.
    pub identifiers: Vec<CandidateId>,
    /// Configured batch size at the time of dispatch.
    pub batch_size: usize,
    /// Local date of dispatch.
    pub start_date: NaiveDate,
    /// Local time of dispatch.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Start time plus [`DISPATCH_WINDOW_MINUTES`]. Wraps past midnight without moving the date.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Round duration in minutes.
    pub round_duration: u32,
}

impl RoundRequest {
    /// Build a request for a batch dispatched at `now`.
    pub fn new<Tz: TimeZone>(
        identifiers: Vec<CandidateId>,
        batch_size: usize,
        round_duration: u32,
        now: &DateTime<Tz>,
    ) -> Self {
        let local = now.naive_local();
        Self {
            identifiers,
            batch_size,
            start_date: local.date(),
            start_time: local.time(),
            end_time: (local + TimeDelta::minutes(DISPATCH_WINDOW_MINUTES)).time(),
            round_duration,
        }
    }
}

/// Response from the round creation service.
///
/// Opaque to the scheduler; it is handed to the observer unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult(pub serde_json::Value);

impl BatchResult {
    /// Get the raw JSON value.
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for BatchResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// `HH:MM` wire format for times of day.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
