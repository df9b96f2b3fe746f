use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{Ballot, CandidateId, ElectionId, PositionId, Receipt};

/// A voter's choices, one candidate per position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBallotRequest {
    pub choices: BTreeMap<PositionId, CandidateId>,
}

/// What a voter gets back after a successful submission.
///
/// This is the only response that ever carries the plaintext receipt code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedBallot {
    pub ballot_id: String,
    pub election_id: ElectionId,
    pub receipt_code: String,
    pub submitted_at: DateTime<Utc>,
    pub positions_voted: u32,
}

impl SubmittedBallot {
    pub fn new(ballot: &Ballot, receipt: &Receipt, positions_voted: u32) -> Self {
        Self {
            ballot_id: ballot.id.to_string(),
            election_id: ballot.election_id,
            receipt_code: receipt.receipt_code.clone(),
            submitted_at: ballot.submitted_at,
            positions_voted,
        }
    }
}

/// Has the voter taken part in an election?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatus {
    pub election_id: ElectionId,
    pub election_title: String,
    pub has_voted: bool,
    pub voted_at: Option<DateTime<Utc>>,
    pub masked_receipt: Option<String>,
}

impl VoteStatus {
    pub fn new(election_id: ElectionId, election_title: String, receipt: Option<&Receipt>) -> Self {
        Self {
            election_id,
            election_title,
            has_voted: receipt.is_some(),
            voted_at: receipt.map(|r| r.created_at),
            masked_receipt: receipt.map(Receipt::masked),
        }
    }
}
