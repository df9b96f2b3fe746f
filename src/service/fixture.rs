//! A ballot engine over in-memory collaborators, seeded with a few elections.

use chrono::Utc;

use crate::config::Config;
use crate::model::{
    common::{AnonVote, Candidate, CandidateId, Election, ElectionId, Position, PositionId},
    store::{BallotStore, MemoryAuditLog, MemoryDirectory, MemoryStore},
};

use super::{BallotEngine, TtlCache};

/// Open for voting, 10 eligible voters.
pub const CURRENT: ElectionId = 1;
/// Closed a minute ago, 8 eligible voters.
pub const FINISHED: ElectionId = 2;
/// Opens tomorrow, nobody eligible yet.
pub const UPCOMING: ElectionId = 3;

pub const PRESIDENT: PositionId = 10;
pub const SECRETARY: PositionId = 11;
pub const TREASURER: PositionId = 20;
pub const AUDITOR: PositionId = 30;

pub const ALICE: CandidateId = 100;
pub const BOB: CandidateId = 101;
pub const CAROL: CandidateId = 102;
/// Applied for president but was never approved.
pub const MALLORY: CandidateId = 103;
pub const DAN: CandidateId = 110;
pub const ERIN: CandidateId = 111;
pub const FRANK: CandidateId = 200;
pub const GRACE: CandidateId = 201;
pub const HEIDI: CandidateId = 300;

pub struct TestFixture {
    pub engine: BallotEngine,
    pub store: MemoryStore,
    pub directory: MemoryDirectory,
    pub audit: MemoryAuditLog,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        let directory = MemoryDirectory::new();
        let audit = MemoryAuditLog::new();
        seed(&directory).await;
        let engine = BallotEngine::new(
            store.clone(),
            directory.clone(),
            audit.clone(),
            TtlCache::new(),
            &config,
        );
        Self {
            engine,
            store,
            directory,
            audit,
        }
    }

    /// Write `count` anonymized votes directly, bypassing ballots.
    pub async fn cast_anon(
        &self,
        election: ElectionId,
        position: PositionId,
        candidate: CandidateId,
        count: u32,
    ) {
        let mut tx = self.store.begin().await.unwrap();
        for _ in 0..count {
            let vote = AnonVote::new(election, position, candidate, rand::thread_rng(), Utc::now());
            tx.insert_anon_vote(&vote).await.unwrap();
        }
        tx.commit().await.unwrap();
        self.engine.invalidate_results().await;
    }
}

async fn seed(directory: &MemoryDirectory) {
    directory.put_election(Election::current_example(CURRENT)).await;
    directory.put_election(Election::finished_example(FINISHED)).await;
    directory.put_election(Election::future_example(UPCOMING)).await;
    directory.set_eligible_voters(CURRENT, 10).await;
    directory.set_eligible_voters(FINISHED, 8).await;

    // Listed out of display order on purpose.
    for (id, election_id, name, display_order) in [
        (SECRETARY, CURRENT, "Secretary", 2),
        (PRESIDENT, CURRENT, "President", 1),
        (TREASURER, FINISHED, "Treasurer", 1),
        (AUDITOR, UPCOMING, "Auditor", 1),
    ] {
        directory
            .put_position(Position {
                id,
                election_id,
                name: name.to_string(),
                max_candidates: 3,
                display_order,
            })
            .await;
    }

    for (id, election_id, position_id, name, party, approved) in [
        (ALICE, CURRENT, PRESIDENT, "Alice", Some("Blue"), true),
        (BOB, CURRENT, PRESIDENT, "Bob", Some("Green"), true),
        (CAROL, CURRENT, PRESIDENT, "Carol", None, true),
        (MALLORY, CURRENT, PRESIDENT, "Mallory", None, false),
        (DAN, CURRENT, SECRETARY, "Dan", Some("Blue"), true),
        (ERIN, CURRENT, SECRETARY, "Erin", None, true),
        (FRANK, FINISHED, TREASURER, "Frank", None, true),
        (GRACE, FINISHED, TREASURER, "Grace", None, true),
        (HEIDI, UPCOMING, AUDITOR, "Heidi", None, true),
    ] {
        directory
            .put_candidate(Candidate {
                id,
                election_id,
                position_id,
                name: name.to_string(),
                party: party.map(str::to_string),
                approved,
            })
            .await;
    }
}
