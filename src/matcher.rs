//! Candidate matching logic.
//!
//! Evaluates an endpoint's candidate responses against a request body.

use crate::model::ConditionalResponse;
use serde_json::Value;
use tracing::debug;

/// Result of matching a request body against candidates.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// The matched candidate
    pub response: &'a ConditionalResponse,
    /// Position of the candidate in its endpoint list
    pub index: usize,
}

/// Find the first candidate whose conditions all hold.
///
/// Candidates are tried in list order, so an unconditional candidate shadows
/// every candidate after it.
pub fn find_match<'a>(
    candidates: &'a [ConditionalResponse],
    body: &Value,
) -> Option<MatchResult<'a>> {
    candidates
        .iter()
        .enumerate()
        .find(|(index, candidate)| {
            let matched = matches_conditions(candidate, body);
            debug!(
                candidate = index,
                conditions = candidate.conditions.len(),
                matched,
                "Evaluated candidate"
            );
            matched
        })
        .map(|(index, response)| MatchResult { response, index })
}

fn matches_conditions(candidate: &ConditionalResponse, body: &Value) -> bool {
    candidate.conditions.iter().all(|c| c.holds(body))
}
