//! Storage seams.
//!
//! The ballot engine talks to three collaborators, each behind a trait so
//! that the MongoDB bindings and the in-memory ones are interchangeable:
//!
//! - [`BallotStore`]: the durable store for receipts, ballots, vote choices
//!   and anonymized votes. All writes go through a [`StoreTransaction`].
//! - [`ElectionDirectory`]: read-only view of elections, positions and
//!   approved candidates, owned by the election-management subsystem.
//! - [`AuditLog`]: append-only activity records.

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    common::{
        AnonVote, Ballot, Candidate, CandidateId, Election, ElectionId, Position, PositionId,
        Receipt, VoteChoice, VoteCount, VoterId,
    },
    mongodb::Id,
};

mod memory;

pub use memory::{MemoryAuditLog, MemoryDirectory, MemoryStore, StoreOp};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),
    /// A concurrent transaction is writing the same unique key.
    #[error("Write conflict: {0}")]
    Conflict(String),
    /// The backend reported a fault it expects to go away on retry.
    #[error("Transient storage fault: {0}")]
    Transient(String),
    /// Anything else.
    #[error("Storage failure: {0}")]
    Backend(String),
}

/// The durable store.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Start an atomic unit of work. Nothing written through it is visible
    /// to anyone else until [`StoreTransaction::commit`] succeeds.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn ballot_for(&self, voter: VoterId, election: ElectionId)
        -> StoreResult<Option<Ballot>>;

    async fn receipt_for(
        &self,
        voter: VoterId,
        election: ElectionId,
    ) -> StoreResult<Option<Receipt>>;

    async fn receipt_by_hash(&self, receipt_hash: &str) -> StoreResult<Option<Receipt>>;

    /// Retained vote choices of a ballot. Empty once purged.
    async fn choices_for(&self, ballot: Id) -> StoreResult<Vec<VoteChoice>>;

    /// Anonymized votes grouped by (position, candidate).
    async fn vote_counts(&self, election: ElectionId) -> StoreResult<Vec<VoteCount>>;

    async fn ballot_count(&self, election: ElectionId) -> StoreResult<u64>;

    async fn receipt_count(&self, election: ElectionId) -> StoreResult<u64>;
}

/// A single all-or-nothing write batch.
///
/// Uniqueness constraints (one receipt and one ballot per voter and
/// election, one choice per ballot and position, globally unique receipt
/// codes) are enforced no later than [`commit`](Self::commit), which then
/// fails with [`StoreError::Duplicate`].
#[rocket::async_trait]
pub trait StoreTransaction: Send {
    async fn insert_receipt(&mut self, receipt: &Receipt) -> StoreResult<()>;

    async fn insert_ballot(&mut self, ballot: &Ballot) -> StoreResult<()>;

    async fn insert_choice(&mut self, choice: &VoteChoice) -> StoreResult<()>;

    async fn insert_anon_vote(&mut self, vote: &AnonVote) -> StoreResult<()>;

    async fn mark_anonymized(&mut self, choice: Id) -> StoreResult<()>;

    async fn delete_choice(&mut self, choice: Id) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn abort(self: Box<Self>) -> StoreResult<()>;
}

/// The eligibility collaborator.
#[rocket::async_trait]
pub trait ElectionDirectory: Send + Sync {
    async fn election(&self, election: ElectionId) -> StoreResult<Option<Election>>;

    /// Positions of an election, in display order.
    async fn positions(&self, election: ElectionId) -> StoreResult<Vec<Position>>;

    /// Approved candidates of an election, in ID order.
    async fn candidates(&self, election: ElectionId) -> StoreResult<Vec<Candidate>>;

    /// Size of the population allowed to vote in the election.
    async fn eligible_voter_count(&self, election: ElectionId) -> StoreResult<u64>;

    async fn is_election_active(&self, election: ElectionId, now: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self
            .election(election)
            .await?
            .map_or(false, |e| e.is_active_at(now)))
    }

    async fn is_candidate_valid_for(
        &self,
        election: ElectionId,
        position: PositionId,
        candidate: CandidateId,
    ) -> StoreResult<bool> {
        Ok(self
            .candidates(election)
            .await?
            .iter()
            .any(|c| c.id == candidate && c.position_id == position && c.approved))
    }
}

/// Something a user did, for the administrators' activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub actor: VoterId,
    pub action: String,
    pub resource_type: String,
    pub resource_id: ElectionId,
    pub metadata: VoteActivity,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// What we are allowed to say about a vote: how many positions, and the
/// masked receipt. Never the choices, never the full code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteActivity {
    pub positions_voted: u32,
    pub masked_receipt: String,
}

impl ActivityRecord {
    pub fn vote(voter: VoterId, election: ElectionId, activity: VoteActivity) -> Self {
        Self {
            actor: voter,
            action: "vote".to_string(),
            resource_type: "Election".to_string(),
            resource_id: election,
            metadata: activity,
            created_at: Utc::now(),
        }
    }
}

/// The audit/logging collaborator.
#[rocket::async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, record: ActivityRecord) -> StoreResult<()>;
}
