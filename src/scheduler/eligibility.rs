//! Eligibility filtering and batch selection.
//!
//! Selection is first-come-first-served in directory order. There is no
//! prioritization beyond the order the directory returns.

use std::collections::HashSet;

use crate::core::candidate::CandidateSnapshot;
use crate::core::types::CandidateId;

/// Candidates chosen for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Number of eligible candidates in the snapshot.
    pub eligible: usize,
    /// The first `batch_size` eligible candidates, or empty if below threshold.
    pub batch: Vec<&'a CandidateSnapshot>,
}

/// Filter a snapshot down to candidates that may be put in a new batch.
///
/// A candidate is eligible when it is ready for a round and not already
/// dispatched. An identifier listed more than once counts once, at its first
/// position.
pub fn eligible_candidates<'a>(
    snapshot: &'a [CandidateSnapshot],
    processed: &HashSet<CandidateId>,
) -> Vec<&'a CandidateSnapshot> {
    let mut seen: HashSet<&CandidateId> = HashSet::new();
    let mut eligible = Vec::new();
    for candidate in snapshot {
        if candidate.is_ready_for_round()
            && !processed.contains(candidate.id())
            && seen.insert(candidate.id())
        {
            eligible.push(candidate);
        }
    }
    eligible
}

/// Pick the batch for this cycle.
///
/// Returns an empty batch unless at least `batch_size` candidates are eligible.
pub fn select_batch<'a>(
    snapshot: &'a [CandidateSnapshot],
    processed: &HashSet<CandidateId>,
    batch_size: usize,
) -> Selection<'a> {
    let mut eligible = eligible_candidates(snapshot, processed);
    let count = eligible.len();
    if batch_size == 0 || count < batch_size {
        return Selection {
            eligible: count,
            batch: Vec::new(),
        };
    }
    eligible.truncate(batch_size);
    Selection {
        eligible: count,
        batch: eligible,
    }
}
