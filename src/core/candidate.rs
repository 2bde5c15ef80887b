//! Candidate snapshot as reported by the candidate directory.
//!
//! Snapshots are read-only from the scheduler's point of view: they are fetched
//! once per cycle, inspected for eligibility, and copied into dispatch events.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::CandidateId;

/// Status of a candidate within one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoundStatus {
    /// A round has been created for the candidate.
    Scheduled,
    /// The candidate passed the stage.
    Selected,
    /// The candidate was rejected at the stage.
    Rejected,
    /// Any other status the backend reports (e.g. "pending").
    Other(String),
}

impl RoundStatus {
    /// Whether this status means the candidate is already in or past the stage.
    pub fn blocks_scheduling(&self) -> bool {
        matches!(
            self,
            RoundStatus::Scheduled | RoundStatus::Selected | RoundStatus::Rejected
        )
    }

    /// Wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            RoundStatus::Scheduled => "scheduled",
            RoundStatus::Selected => "selected",
            RoundStatus::Rejected => "rejected",
            RoundStatus::Other(s) => s,
        }
    }
}

impl From<String> for RoundStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => RoundStatus::Scheduled,
            "selected" => RoundStatus::Selected,
            "rejected" => RoundStatus::Rejected,
            _ => RoundStatus::Other(s),
        }
    }
}

impl From<RoundStatus> for String {
    fn from(status: RoundStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage round status. A missing stage means no round exists yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundProgress {
    /// Group discussion stage.
    #[serde(alias = "gd", skip_serializing_if = "Option::is_none")]
    pub group_discussion: Option<RoundStatus>,
    /// Screening stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screening: Option<RoundStatus>,
    /// Personal interview stage.
    #[serde(alias = "pi", skip_serializing_if = "Option::is_none")]
    pub personal_interview: Option<RoundStatus>,
}

impl RoundProgress {
    /// Iterate over the statuses of all stages that have one.
    pub fn statuses(&self) -> impl Iterator<Item = &RoundStatus> {
        [
            self.group_discussion.as_ref(),
            self.screening.as_ref(),
            self.personal_interview.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Whether any stage shows the candidate as already in or past a round.
    pub fn has_active_or_finished_round(&self) -> bool {
        self.statuses().any(RoundStatus::blocks_scheduling)
    }
}

/// A candidate as seen in one directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSnapshot {
    /// Unique identifier (email).
    #[serde(alias = "id")]
    pub email: CandidateId,
    /// Whether an interview slot has been assigned.
    #[serde(default, alias = "slotAssigned")]
    pub has_assigned_slot: bool,
    /// Whether the candidate has checked in ("present").
    #[serde(default, alias = "present")]
    pub is_checked_in: bool,
    /// Round status for each pipeline stage.
    #[serde(default)]
    pub rounds: RoundProgress,
}

impl CandidateSnapshot {
    /// Create a snapshot with no slot, not checked in, and no rounds.
    pub fn new(email: impl Into<CandidateId>) -> Self {
        Self {
            email: email.into(),
            has_assigned_slot: false,
            is_checked_in: false,
            rounds: RoundProgress::default(),
        }
    }

    /// Mark the candidate as holding an assigned slot.
    pub fn with_slot(mut self) -> Self {
        self.has_assigned_slot = true;
        self
    }

    /// Mark the candidate as checked in.
    pub fn checked_in(mut self) -> Self {
        self.is_checked_in = true;
        self
    }

    /// Set the round progress.
    pub fn with_rounds(mut self, rounds: RoundProgress) -> Self {
        self.rounds = rounds;
        self
    }

    /// Get the candidate identifier.
    pub fn id(&self) -> &CandidateId {
        &self.email
    }

    /// Whether the candidate qualifies for a new round, ignoring dispatch history.
    ///
    /// Requires an assigned slot, a check-in, and no stage that is scheduled,
    /// selected or rejected.
    pub fn is_ready_for_round(&self) -> bool {
        self.has_assigned_slot && self.is_checked_in && !self.rounds.has_active_or_finished_round()
    }
}
