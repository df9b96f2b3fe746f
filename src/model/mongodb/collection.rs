use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{
    common::{AnonVote, Ballot, Candidate, Election, Position, Receipt, VoteChoice},
    store::ActivityRecord,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Collections owned by the ballot engine.
impl MongoCollection for Receipt {
    const NAME: &'static str = "receipts";
}
impl MongoCollection for Ballot {
    const NAME: &'static str = "ballots";
}
impl MongoCollection for VoteChoice {
    const NAME: &'static str = "vote_choices";
}
impl MongoCollection for AnonVote {
    const NAME: &'static str = "anon_votes";
}

// Collections owned by the election-management and audit subsystems.
impl MongoCollection for Election {
    const NAME: &'static str = "elections";
}
impl MongoCollection for Position {
    const NAME: &'static str = "positions";
}
impl MongoCollection for Candidate {
    const NAME: &'static str = "candidates";
}
impl MongoCollection for ActivityRecord {
    const NAME: &'static str = "activity_logs";
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes are what actually enforce one ballot per voter and
/// election; they must exist before the first submission.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Receipt collection.
    let receipt_owner_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique.clone())
        .build();
    let receipt_code_index = IndexModel::builder()
        .keys(doc! {"receipt_code": 1})
        .options(unique.clone())
        .build();
    let receipt_hash_index = IndexModel::builder()
        .keys(doc! {"receipt_hash": 1})
        .build();
    Coll::<Receipt>::from_db(db)
        .create_indexes(
            [receipt_owner_index, receipt_code_index, receipt_hash_index],
            None,
        )
        .await?;

    // Ballot collection.
    let ballot_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Ballot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;

    // Vote choice collection.
    let choice_index = IndexModel::builder()
        .keys(doc! {"ballot_id": 1, "position_id": 1})
        .options(unique)
        .build();
    Coll::<VoteChoice>::from_db(db)
        .create_index(choice_index, None)
        .await?;

    // Anonymized vote collection.
    let tally_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "position_id": 1, "candidate_id": 1})
        .build();
    Coll::<AnonVote>::from_db(db)
        .create_index(tally_index, None)
        .await?;

    Ok(())
}
