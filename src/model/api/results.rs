use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, ElectionId, PositionId};

/// A candidate's standing within a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub party: Option<String>,
    pub vote_count: u64,
    /// Share of the position's votes, rounded to two decimal places.
    pub percentage: f64,
    /// 1-based.
    pub rank: u32,
    pub is_winner: bool,
}

/// Tally of a single position, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionResults {
    pub position_id: PositionId,
    pub position_name: String,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
}

/// Live results of a whole election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub election_title: String,
    pub election_ended: bool,
    pub is_active: bool,
    /// Voters holding a receipt.
    pub total_voters: u64,
    pub total_ballots: u64,
    /// In display order.
    pub positions: Vec<PositionResults>,
}

impl ElectionResults {
    /// Results for an election we know nothing about.
    pub fn empty(election_id: ElectionId) -> Self {
        Self {
            election_id,
            election_title: String::new(),
            election_ended: false,
            is_active: false,
            total_voters: 0,
            total_ballots: 0,
            positions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionStatistics {
    pub position_id: PositionId,
    pub position_name: String,
    pub total_votes: u64,
    pub candidates_count: u64,
}

/// Participation figures of an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStatistics {
    pub election_id: ElectionId,
    pub election_title: String,
    pub total_voters: u64,
    pub total_votes: u64,
    pub total_positions: u64,
    pub total_eligible_voters: u64,
    pub turnout_percentage: f64,
    pub position_statistics: Vec<PositionStatistics>,
}

impl ElectionStatistics {
    /// All zeros, for an election that does not exist.
    pub fn empty(election_id: ElectionId) -> Self {
        Self {
            election_id,
            election_title: String::new(),
            total_voters: 0,
            total_votes: 0,
            total_positions: 0,
            total_eligible_voters: 0,
            turnout_percentage: 0.0,
            position_statistics: Vec::new(),
        }
    }
}

/// The elected candidate of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub position_id: PositionId,
    pub position_name: String,
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub party: Option<String>,
    pub vote_count: u64,
    pub percentage: f64,
}
