use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    common::{Candidate, CandidateId, Election, ElectionId, Position, PositionId},
    store::{ActivityRecord, AuditLog, ElectionDirectory, StoreResult},
};

use super::Coll;

/// Name of the voter collection, owned by the account subsystem.
/// We only ever count it, so there is no model type for it.
const VOTERS: &str = "voters";

/// Reads elections, positions and candidates straight out of the
/// election-management subsystem's collections.
#[derive(Clone)]
pub struct MongoDirectory {
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    db: Database,
}

impl MongoDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            positions: Coll::from_db(db),
            candidates: Coll::from_db(db),
            db: db.clone(),
        }
    }
}

#[rocket::async_trait]
impl ElectionDirectory for MongoDirectory {
    async fn election(&self, election: ElectionId) -> StoreResult<Option<Election>> {
        let filter = doc! {
            "_id": election,
        };
        Ok(self.elections.find_one(filter, None).await?)
    }

    async fn positions(&self, election: ElectionId) -> StoreResult<Vec<Position>> {
        let filter = doc! {
            "election_id": election,
        };
        let options = FindOptions::builder()
            .sort(doc! {"display_order": 1, "_id": 1})
            .build();
        Ok(self
            .positions
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn candidates(&self, election: ElectionId) -> StoreResult<Vec<Candidate>> {
        let filter = doc! {
            "election_id": election,
            "approved": true,
        };
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        Ok(self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn eligible_voter_count(&self, election: ElectionId) -> StoreResult<u64> {
        let mut filter = doc! {
            "is_verified": true,
        };
        if let Some(group) = self
            .election(election)
            .await?
            .and_then(|e| e.restricted_group)
        {
            filter.insert("groups", group);
        }
        Ok(self
            .db
            .collection::<Document>(VOTERS)
            .count_documents(filter, None)
            .await?)
    }

    async fn is_candidate_valid_for(
        &self,
        election: ElectionId,
        position: PositionId,
        candidate: CandidateId,
    ) -> StoreResult<bool> {
        let filter = doc! {
            "_id": candidate,
            "election_id": election,
            "position_id": position,
            "approved": true,
        };
        Ok(self.candidates.count_documents(filter, None).await? > 0)
    }
}

/// Appends activity records to the shared activity log collection.
#[derive(Clone)]
pub struct MongoAuditLog {
    records: Coll<ActivityRecord>,
}

impl MongoAuditLog {
    pub fn new(db: &Database) -> Self {
        Self {
            records: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl AuditLog for MongoAuditLog {
    async fn record(&self, record: ActivityRecord) -> StoreResult<()> {
        self.records.insert_one(record, None).await?;
        Ok(())
    }
}
