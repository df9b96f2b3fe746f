use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, PositionId};

/// A receipt code presented by a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCodeRequest {
    pub receipt_code: String,
}

/// Outcome of a receipt verification.
///
/// A miss carries no detail at all, so a near-miss looks the same as garbage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_id: Option<ElectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_at: Option<DateTime<Utc>>,
}

impl ReceiptVerification {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            election_id: None,
            election_title: None,
            voted_at: None,
        }
    }
}

/// One of the voter's own choices, looked up through their receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnVote {
    pub position_id: PositionId,
    pub position_name: String,
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub party: Option<String>,
}

/// The choices behind a receipt. Empty if the raw choices have been purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnVotes {
    pub election_id: ElectionId,
    pub election_title: String,
    pub voted_at: DateTime<Utc>,
    pub votes: Vec<OwnVote>,
}
