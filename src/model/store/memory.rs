//! In-memory storage, for tests and single-process demos.
//!
//! Transactions stage their writes and apply them to a copy of the tables
//! under the lock at commit time, so a failed commit leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use rocket::tokio::sync::Mutex;

use crate::model::{
    common::{
        AnonVote, Ballot, Candidate, ElectionId, Election, Position, Receipt, VoteChoice,
        VoteCount, VoterId,
    },
    mongodb::Id,
};

use super::{
    ActivityRecord, AuditLog, BallotStore, ElectionDirectory, StoreError, StoreResult,
    StoreTransaction,
};

/// Transaction operations that can be made to fail on purpose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    InsertReceipt,
    InsertBallot,
    InsertChoice,
    InsertAnonVote,
    MarkAnonymized,
    DeleteChoice,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    receipts: Vec<Receipt>,
    ballots: Vec<Ballot>,
    choices: Vec<VoteChoice>,
    anon_votes: Vec<AnonVote>,
}

impl Tables {
    fn apply(&mut self, write: Write) -> StoreResult<()> {
        match write {
            Write::Receipt(receipt) => {
                if self.receipts.iter().any(|r| {
                    (r.voter_id == receipt.voter_id && r.election_id == receipt.election_id)
                        || r.receipt_code == receipt.receipt_code
                }) {
                    return Err(StoreError::Duplicate(format!(
                        "receipt for voter {} in election {}",
                        receipt.voter_id, receipt.election_id
                    )));
                }
                self.receipts.push(receipt);
            }
            Write::Ballot(ballot) => {
                if self
                    .ballots
                    .iter()
                    .any(|b| b.voter_id == ballot.voter_id && b.election_id == ballot.election_id)
                {
                    return Err(StoreError::Duplicate(format!(
                        "ballot for voter {} in election {}",
                        ballot.voter_id, ballot.election_id
                    )));
                }
                self.ballots.push(ballot);
            }
            Write::Choice(choice) => {
                if self
                    .choices
                    .iter()
                    .any(|c| c.ballot_id == choice.ballot_id && c.position_id == choice.position_id)
                {
                    return Err(StoreError::Duplicate(format!(
                        "choice for ballot {} and position {}",
                        choice.ballot_id, choice.position_id
                    )));
                }
                self.choices.push(choice);
            }
            Write::AnonVote(vote) => self.anon_votes.push(vote),
            Write::MarkAnonymized(id) => {
                let choice = self
                    .choices
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| StoreError::Backend(format!("No vote choice {id}")))?;
                choice.anonymized = true;
            }
            Write::DeleteChoice(id) => {
                let before = self.choices.len();
                self.choices.retain(|c| c.id != id);
                if self.choices.len() == before {
                    return Err(StoreError::Backend(format!("No vote choice {id}")));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Write {
    Receipt(Receipt),
    Ballot(Ballot),
    Choice(VoteChoice),
    AnonVote(AnonVote),
    MarkAnonymized(Id),
    DeleteChoice(Id),
}

type Faults = Arc<Mutex<HashMap<StoreOp, (u32, StoreError)>>>;

/// Fail with the armed error if a fault is armed for `op`.
async fn trip(faults: &Faults, op: StoreOp) -> StoreResult<()> {
    let mut faults = faults.lock().await;
    match faults.get_mut(&op) {
        Some((remaining, err)) if *remaining > 0 => {
            *remaining -= 1;
            Err(err.clone())
        }
        _ => Ok(()),
    }
}

/// A [`BallotStore`] held entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` executions of `op` fail with a backend error.
    pub async fn fail_next(&self, op: StoreOp, times: u32) {
        let err = StoreError::Backend(format!("Injected fault in {op:?}"));
        self.fail_next_with(op, times, err).await;
    }

    /// Make the next `times` executions of `op` fail with `err`.
    pub async fn fail_next_with(&self, op: StoreOp, times: u32, err: StoreError) {
        self.faults.lock().await.insert(op, (times, err));
    }

    pub async fn receipts(&self) -> Vec<Receipt> {
        self.tables.lock().await.receipts.clone()
    }

    pub async fn ballots(&self) -> Vec<Ballot> {
        self.tables.lock().await.ballots.clone()
    }

    pub async fn choices(&self) -> Vec<VoteChoice> {
        self.tables.lock().await.choices.clone()
    }

    pub async fn anon_votes(&self) -> Vec<AnonVote> {
        self.tables.lock().await.anon_votes.clone()
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        trip(&self.faults, StoreOp::Begin).await?;
        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            faults: self.faults.clone(),
            staged: Vec::new(),
        }))
    }

    async fn ballot_for(&self, voter: VoterId, election: ElectionId) -> StoreResult<Option<Ballot>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ballots
            .iter()
            .find(|b| b.voter_id == voter && b.election_id == election)
            .cloned())
    }

    async fn receipt_for(
        &self,
        voter: VoterId,
        election: ElectionId,
    ) -> StoreResult<Option<Receipt>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .receipts
            .iter()
            .find(|r| r.voter_id == voter && r.election_id == election)
            .cloned())
    }

    async fn receipt_by_hash(&self, receipt_hash: &str) -> StoreResult<Option<Receipt>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .receipts
            .iter()
            .find(|r| r.receipt_hash == receipt_hash)
            .cloned())
    }

    async fn choices_for(&self, ballot: Id) -> StoreResult<Vec<VoteChoice>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .iter()
            .filter(|c| c.ballot_id == ballot)
            .cloned()
            .collect())
    }

    async fn vote_counts(&self, election: ElectionId) -> StoreResult<Vec<VoteCount>> {
        let tables = self.tables.lock().await;
        let mut counts: HashMap<_, u64> = HashMap::new();
        for vote in tables.anon_votes.iter().filter(|v| v.election_id == election) {
            *counts.entry((vote.position_id, vote.candidate_id)).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((position_id, candidate_id), votes)| VoteCount {
                position_id,
                candidate_id,
                votes,
            })
            .collect())
    }

    async fn ballot_count(&self, election: ElectionId) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.ballots.iter().filter(|b| b.election_id == election).count() as u64)
    }

    async fn receipt_count(&self, election: ElectionId) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.receipts.iter().filter(|r| r.election_id == election).count() as u64)
    }
}

struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    faults: Faults,
    staged: Vec<Write>,
}

impl MemoryTransaction {
    async fn stage(&mut self, op: StoreOp, write: Write) -> StoreResult<()> {
        trip(&self.faults, op).await?;
        self.staged.push(write);
        Ok(())
    }
}

#[rocket::async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_receipt(&mut self, receipt: &Receipt) -> StoreResult<()> {
        self.stage(StoreOp::InsertReceipt, Write::Receipt(receipt.clone()))
            .await
    }

    async fn insert_ballot(&mut self, ballot: &Ballot) -> StoreResult<()> {
        self.stage(StoreOp::InsertBallot, Write::Ballot(ballot.clone()))
            .await
    }

    async fn insert_choice(&mut self, choice: &VoteChoice) -> StoreResult<()> {
        self.stage(StoreOp::InsertChoice, Write::Choice(choice.clone()))
            .await
    }

    async fn insert_anon_vote(&mut self, vote: &AnonVote) -> StoreResult<()> {
        self.stage(StoreOp::InsertAnonVote, Write::AnonVote(vote.clone()))
            .await
    }

    async fn mark_anonymized(&mut self, choice: Id) -> StoreResult<()> {
        self.stage(StoreOp::MarkAnonymized, Write::MarkAnonymized(choice))
            .await
    }

    async fn delete_choice(&mut self, choice: Id) -> StoreResult<()> {
        self.stage(StoreOp::DeleteChoice, Write::DeleteChoice(choice))
            .await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            tables,
            faults,
            staged,
        } = *self;
        trip(&faults, StoreOp::Commit).await?;
        let mut tables = tables.lock().await;
        let mut working = tables.clone();
        for write in staged {
            working.apply(write)?;
        }
        *tables = working;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

/// An [`ElectionDirectory`] over fixed data.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    elections: Arc<Mutex<Vec<Election>>>,
    positions: Arc<Mutex<Vec<Position>>>,
    candidates: Arc<Mutex<Vec<Candidate>>>,
    eligible: Arc<Mutex<HashMap<ElectionId, u64>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an election, replacing any with the same ID.
    pub async fn put_election(&self, election: Election) {
        let mut elections = self.elections.lock().await;
        elections.retain(|e| e.id != election.id);
        elections.push(election);
    }

    pub async fn put_position(&self, position: Position) {
        let mut positions = self.positions.lock().await;
        positions.retain(|p| p.id != position.id);
        positions.push(position);
    }

    pub async fn put_candidate(&self, candidate: Candidate) {
        let mut candidates = self.candidates.lock().await;
        candidates.retain(|c| c.id != candidate.id);
        candidates.push(candidate);
    }

    pub async fn set_eligible_voters(&self, election: ElectionId, count: u64) {
        self.eligible.lock().await.insert(election, count);
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MemoryDirectory {
    async fn election(&self, election: ElectionId) -> StoreResult<Option<Election>> {
        let elections = self.elections.lock().await;
        Ok(elections.iter().find(|e| e.id == election).cloned())
    }

    async fn positions(&self, election: ElectionId) -> StoreResult<Vec<Position>> {
        let mut positions: Vec<_> = self
            .positions
            .lock()
            .await
            .iter()
            .filter(|p| p.election_id == election)
            .cloned()
            .collect();
        positions.sort_by_key(|p| (p.display_order, p.id));
        Ok(positions)
    }

    async fn candidates(&self, election: ElectionId) -> StoreResult<Vec<Candidate>> {
        let mut candidates: Vec<_> = self
            .candidates
            .lock()
            .await
            .iter()
            .filter(|c| c.election_id == election && c.approved)
            .cloned()
            .collect();
        candidates.sort_by_key(|c| c.id);
        Ok(candidates)
    }

    async fn eligible_voter_count(&self, election: ElectionId) -> StoreResult<u64> {
        Ok(self
            .eligible
            .lock()
            .await
            .get(&election)
            .copied()
            .unwrap_or(0))
    }
}

/// An [`AuditLog`] that keeps every record in a list.
#[derive(Clone, Default)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<ActivityRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().await.clone()
    }
}

#[rocket::async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, record: ActivityRecord) -> StoreResult<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}
