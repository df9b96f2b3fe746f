use std::fmt::Display;

use log::{trace, warn};
use mongodb::{
    bson::{doc, from_document},
    options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern},
    Client, ClientSession, Database,
};
use rocket::futures::{future::BoxFuture, FutureExt, TryStreamExt};

use crate::model::{
    common::{AnonVote, Ballot, ElectionId, Receipt, VoteChoice, VoteCount, VoterId},
    store::{BallotStore, StoreError, StoreResult, StoreTransaction},
};

use super::{is_unknown_commit_result, Coll, Id};

/// Attempts at committing a transaction whose outcome the server could not
/// confirm. Only the commit is repeated, never the writes.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// MongoDB-backed [`BallotStore`]. Requires a replica set, since every
/// submission is a multi-document transaction.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    receipts: Coll<Receipt>,
    ballots: Coll<Ballot>,
    choices: Coll<VoteChoice>,
    anon_votes: Coll<AnonVote>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            receipts: Coll::from_db(db),
            ballots: Coll::from_db(db),
            choices: Coll::from_db(db),
            anon_votes: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut session = self.client.start_session(None).await?;
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .build();
        session.start_transaction(options).await?;
        Ok(Box::new(MongoTransaction {
            session,
            store: self.clone(),
        }))
    }

    async fn ballot_for(&self, voter: VoterId, election: ElectionId) -> StoreResult<Option<Ballot>> {
        let filter = doc! {
            "voter_id": voter,
            "election_id": election,
        };
        Ok(self.ballots.find_one(filter, None).await?)
    }

    async fn receipt_for(
        &self,
        voter: VoterId,
        election: ElectionId,
    ) -> StoreResult<Option<Receipt>> {
        let filter = doc! {
            "voter_id": voter,
            "election_id": election,
        };
        Ok(self.receipts.find_one(filter, None).await?)
    }

    async fn receipt_by_hash(&self, receipt_hash: &str) -> StoreResult<Option<Receipt>> {
        let filter = doc! {
            "receipt_hash": receipt_hash,
        };
        Ok(self.receipts.find_one(filter, None).await?)
    }

    async fn choices_for(&self, ballot: Id) -> StoreResult<Vec<VoteChoice>> {
        let filter = doc! {
            "ballot_id": *ballot,
        };
        Ok(self.choices.find(filter, None).await?.try_collect().await?)
    }

    async fn vote_counts(&self, election: ElectionId) -> StoreResult<Vec<VoteCount>> {
        let pipeline = [
            doc! {"$match": {"election_id": election}},
            doc! {"$group": {
                "_id": {"position_id": "$position_id", "candidate_id": "$candidate_id"},
                "votes": {"$sum": 1},
            }},
            doc! {"$project": {
                "_id": 0,
                "position_id": "$_id.position_id",
                "candidate_id": "$_id.candidate_id",
                "votes": 1,
            }},
        ];
        let mut cursor = self.anon_votes.aggregate(pipeline, None).await?;
        let mut counts = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            counts.push(from_document::<VoteCount>(document)?);
        }
        Ok(counts)
    }

    async fn ballot_count(&self, election: ElectionId) -> StoreResult<u64> {
        let filter = doc! {
            "election_id": election,
        };
        Ok(self.ballots.count_documents(filter, None).await?)
    }

    async fn receipt_count(&self, election: ElectionId) -> StoreResult<u64> {
        let filter = doc! {
            "election_id": election,
        };
        Ok(self.receipts.count_documents(filter, None).await?)
    }
}

/// An open MongoDB transaction.
struct MongoTransaction {
    session: ClientSession,
    store: MongoStore,
}

#[rocket::async_trait]
impl StoreTransaction for MongoTransaction {
    async fn insert_receipt(&mut self, receipt: &Receipt) -> StoreResult<()> {
        self.store
            .receipts
            .insert_one_with_session(receipt, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn insert_ballot(&mut self, ballot: &Ballot) -> StoreResult<()> {
        self.store
            .ballots
            .insert_one_with_session(ballot, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn insert_choice(&mut self, choice: &VoteChoice) -> StoreResult<()> {
        self.store
            .choices
            .insert_one_with_session(choice, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn insert_anon_vote(&mut self, vote: &AnonVote) -> StoreResult<()> {
        self.store
            .anon_votes
            .insert_one_with_session(vote, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn mark_anonymized(&mut self, choice: Id) -> StoreResult<()> {
        let update = doc! {
            "$set": {"anonymized": true}
        };
        let result = self
            .store
            .choices
            .update_one_with_session(choice.as_doc(), update, None, &mut self.session)
            .await?;
        if result.matched_count != 1 {
            return Err(StoreError::Backend(format!("No vote choice {choice}")));
        }
        Ok(())
    }

    async fn delete_choice(&mut self, choice: Id) -> StoreResult<()> {
        let result = self
            .store
            .choices
            .delete_one_with_session(choice.as_doc(), None, &mut self.session)
            .await?;
        if result.deleted_count != 1 {
            return Err(StoreError::Backend(format!("No vote choice {choice}")));
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        commit_settled(
            &mut self.session,
            |session| session.commit_transaction().boxed(),
            is_unknown_commit_result,
        )
        .await?;
        trace!("Transaction committed");
        Ok(())
    }

    async fn abort(mut self: Box<Self>) -> StoreResult<()> {
        self.session.abort_transaction().await?;
        trace!("Transaction aborted");
        Ok(())
    }
}

/// Commit through `commit`, repeating it while the outcome is `unknown`.
async fn commit_settled<S, E: Display>(
    target: &mut S,
    commit: for<'a> fn(&'a mut S) -> BoxFuture<'a, Result<(), E>>,
    unknown: fn(&E) -> bool,
) -> Result<(), E> {
    let mut attempt = 1;
    loop {
        match commit(target).await {
            Ok(()) => return Ok(()),
            Err(e) if unknown(&e) && attempt < MAX_COMMIT_ATTEMPTS => {
                warn!("Commit result unknown, committing again: {e}");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// A session whose commits play back scripted outcomes.
    struct Scripted {
        outcomes: VecDeque<Result<(), String>>,
        commits: u32,
    }

    impl Scripted {
        fn new(outcomes: impl IntoIterator<Item = Result<(), String>>) -> Self {
            Self {
                outcomes: outcomes.into_iter().collect(),
                commits: 0,
            }
        }
    }

    fn commit(session: &mut Scripted) -> BoxFuture<'_, Result<(), String>> {
        session.commits += 1;
        let outcome = session.outcomes.pop_front().unwrap_or(Ok(()));
        async move { outcome }.boxed()
    }

    fn unknown(e: &String) -> bool {
        e.starts_with("unknown")
    }

    #[backend_test]
    async fn unknown_outcome_commits_again() {
        let mut session = Scripted::new([Err("unknown".to_string()), Ok(())]);
        commit_settled(&mut session, commit, unknown).await.unwrap();
        assert_eq!(session.commits, 2);
    }

    #[backend_test]
    async fn other_failures_are_not_repeated() {
        let mut session = Scripted::new([Err("write conflict".to_string())]);
        let result = commit_settled(&mut session, commit, unknown).await;
        assert_eq!(result, Err("write conflict".to_string()));
        assert_eq!(session.commits, 1);
    }

    #[backend_test]
    async fn gives_up_after_the_last_attempt() {
        let mut session = Scripted::new((0..5).map(|i| Err(format!("unknown {i}"))));
        let result = commit_settled(&mut session, commit, unknown).await;
        assert_eq!(result, Err("unknown 2".to_string()));
        assert_eq!(session.commits, MAX_COMMIT_ATTEMPTS);
    }
}
