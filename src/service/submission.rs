//! The ballot transaction: one atomic write per submission.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::ChoiceRetention;
use crate::error::{Error, Result};
use crate::model::{
    api::{OwnVote, OwnVotes, ReceiptVerification, VoteStatus},
    common::{Ballot, CandidateId, ElectionId, PositionId, Receipt, VoteChoice, VoterId},
    store::{ActivityRecord, StoreError, StoreResult, StoreTransaction, VoteActivity},
};

use super::{anonymize::anonymize, rate_limit::VOTE_SUBMIT, receipts, BallotEngine};

/// Where a submission came from, as far as the transport can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything a submission writes.
struct Submission<'a> {
    voter: VoterId,
    election: ElectionId,
    choices: &'a BTreeMap<PositionId, CandidateId>,
    client: &'a ClientInfo,
    retention: ChoiceRetention,
    now: DateTime<Utc>,
}

impl Submission<'_> {
    /// Stage the receipt, the ballot, and each choice together with its
    /// anonymized vote.
    async fn write(&self, tx: &mut dyn StoreTransaction) -> StoreResult<(Ballot, Receipt)> {
        let receipt = receipts::issue(
            tx,
            self.voter,
            self.election,
            self.client.ip_address.clone(),
            self.now,
        )
        .await?;
        let ballot = Ballot::new(
            self.voter,
            self.election,
            receipt.id,
            self.client.ip_address.clone(),
            self.client.user_agent.as_deref(),
            self.now,
        );
        tx.insert_ballot(&ballot).await?;

        for (&position, &candidate) in self.choices {
            let mut choice = VoteChoice::new(&ballot, position, candidate, self.now);
            tx.insert_choice(&choice).await?;
            anonymize(tx, &mut choice, self.retention).await?;
        }

        Ok((ballot, receipt))
    }
}

impl BallotEngine {
    /// Record a voter's ballot.
    ///
    /// Either the receipt, the ballot, every choice and every anonymized vote
    /// are committed together, or nothing is. A unique key violation or a
    /// write conflict with a racing submission of the same voter is reported
    /// as [`Error::AlreadyVoted`]. Any other storage fault is retried once
    /// from scratch.
    pub async fn submit(
        &self,
        voter: VoterId,
        election: ElectionId,
        choices: &BTreeMap<PositionId, CandidateId>,
        client: &ClientInfo,
    ) -> Result<(Ballot, Receipt)> {
        if !self.limiter.allow(voter, VOTE_SUBMIT, Utc::now()).await {
            debug!("Voter {voter} rate limited in election {election}");
            return Err(Error::TooManyRequests);
        }

        self.check_preconditions(voter, election, choices).await?;

        let submission = Submission {
            voter,
            election,
            choices,
            client,
            retention: self.config.choice_retention(),
            now: Utc::now(),
        };
        let (ballot, receipt) = match self.commit(&submission).await {
            Ok(written) => written,
            Err(StoreError::Duplicate(_) | StoreError::Conflict(_)) => {
                return Err(Error::AlreadyVoted)
            }
            Err(first) => {
                warn!("Ballot transaction failed, retrying once: {first}");
                if self.store.ballot_for(voter, election).await?.is_some() {
                    return Err(Error::AlreadyVoted);
                }
                match self.commit(&submission).await {
                    Ok(written) => written,
                    Err(StoreError::Duplicate(_) | StoreError::Conflict(_)) => {
                        return Err(Error::AlreadyVoted)
                    }
                    Err(second) => {
                        error!("Ballot transaction failed again: {second}");
                        return Err(Error::Storage(second));
                    }
                }
            }
        };

        self.invalidate_results().await;
        info!(
            "Ballot {} committed in election {election} with receipt {}",
            ballot.id,
            receipt.masked()
        );

        let activity = VoteActivity {
            positions_voted: choices.len() as u32,
            masked_receipt: receipt.masked(),
        };
        if let Err(e) = self
            .audit
            .record(ActivityRecord::vote(voter, election, activity))
            .await
        {
            // The ballot is already final.
            warn!("Failed to record vote activity for ballot {}: {e}", ballot.id);
        }

        Ok((ballot, receipt))
    }

    /// Everything that must hold before the first write.
    async fn check_preconditions(
        &self,
        voter: VoterId,
        election: ElectionId,
        choices: &BTreeMap<PositionId, CandidateId>,
    ) -> Result<()> {
        if !self
            .directory
            .is_election_active(election, Utc::now())
            .await?
        {
            debug!("Rejected ballot for inactive election {election}");
            return Err(Error::ElectionNotActive);
        }

        if self.store.ballot_for(voter, election).await?.is_some() {
            debug!("Voter {voter} has already voted in election {election}");
            return Err(Error::AlreadyVoted);
        }

        if choices.is_empty() {
            return Err(Error::BadRequest("Ballot contains no choices".to_string()));
        }
        for (&position, &candidate) in choices {
            if !self
                .directory
                .is_candidate_valid_for(election, position, candidate)
                .await?
            {
                debug!("Rejected choice {candidate} for position {position} in election {election}");
                return Err(Error::InvalidChoice {
                    position,
                    candidate,
                });
            }
        }

        Ok(())
    }

    /// One attempt at the transaction. Aborts on any failure before commit.
    async fn commit(&self, submission: &Submission<'_>) -> StoreResult<(Ballot, Receipt)> {
        let mut tx = self.store.begin().await?;
        match submission.write(tx.as_mut()).await {
            Ok(written) => {
                tx.commit().await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(abort) = tx.abort().await {
                    warn!("Failed to abort ballot transaction: {abort}");
                }
                Err(e)
            }
        }
    }

    /// Has `voter` voted in `election`? Always read from the store.
    pub async fn vote_status(&self, voter: VoterId, election_id: ElectionId) -> Result<VoteStatus> {
        let election = self
            .directory
            .election(election_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No election with ID {election_id}")))?;
        let receipt = self.store.receipt_for(voter, election.id).await?;
        Ok(VoteStatus::new(election.id, election.title, receipt.as_ref()))
    }

    /// Check a receipt code presented by anyone.
    pub async fn verify_receipt(&self, code: &str) -> Result<ReceiptVerification> {
        Ok(receipts::verify(self.store.as_ref(), self.directory.as_ref(), code).await?)
    }

    /// Show `voter` the choices behind their own receipt.
    pub async fn votes_for_receipt(&self, voter: VoterId, code: &str) -> Result<OwnVotes> {
        let receipt = receipts::find(self.store.as_ref(), code)
            .await?
            .ok_or(Error::InvalidReceipt)?;
        if receipt.voter_id != voter {
            return Err(Error::Forbidden(
                "This receipt does not belong to you".to_string(),
            ));
        }
        let ballot = self
            .store
            .ballot_for(voter, receipt.election_id)
            .await?
            .ok_or_else(|| Error::NotFound("No votes found for this receipt".to_string()))?;

        let election = receipt.election_id;
        let title = self
            .directory
            .election(election)
            .await?
            .map(|e| e.title)
            .unwrap_or_default();
        let positions: HashMap<_, _> = self
            .directory
            .positions(election)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let candidates: HashMap<_, _> = self
            .directory
            .candidates(election)
            .await?
            .into_iter()
            .map(|c| (c.id, (c.name, c.party)))
            .collect();

        let mut choices = self.store.choices_for(ballot.id).await?;
        choices.sort_by_key(|c| c.position_id);
        let votes = choices
            .into_iter()
            .map(|choice| {
                let (candidate_name, party) = candidates
                    .get(&choice.candidate_id)
                    .cloned()
                    .unwrap_or_default();
                OwnVote {
                    position_id: choice.position_id,
                    position_name: positions
                        .get(&choice.position_id)
                        .cloned()
                        .unwrap_or_default(),
                    candidate_id: choice.candidate_id,
                    candidate_name,
                    party,
                }
            })
            .collect();

        Ok(OwnVotes {
            election_id: election,
            election_title: title,
            voted_at: receipt.created_at,
            votes,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::SecondsFormat;

    use crate::config::Config;
    use crate::model::common::{tally_day, HexDigest, ReceiptDigest};
    use crate::model::store::StoreOp;
    use crate::service::fixture::*;

    use super::*;

    fn ballot(choices: &[(PositionId, CandidateId)]) -> BTreeMap<PositionId, CandidateId> {
        choices.iter().copied().collect()
    }

    async fn nothing_written(fixture: &TestFixture) {
        assert!(fixture.store.receipts().await.is_empty());
        assert!(fixture.store.ballots().await.is_empty());
        assert!(fixture.store.choices().await.is_empty());
        assert!(fixture.store.anon_votes().await.is_empty());
    }

    #[backend_test]
    async fn submission_records_everything_anonymized(fixture: TestFixture) {
        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, ERIN)]);
        let client = ClientInfo {
            ip_address: Some("10.0.0.7".to_string()),
            user_agent: Some("x".repeat(300)),
        };
        let (ballot, receipt) = fixture
            .engine
            .submit(42, CURRENT, &choices, &client)
            .await
            .unwrap();

        assert_eq!(receipt.receipt_code.len(), 40);
        assert_eq!(ballot.receipt_id, receipt.id);
        assert_eq!(ballot.user_agent.len(), 255);
        assert_eq!(receipt.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(fixture.store.ballots().await, vec![ballot.clone()]);

        let stored = fixture.store.choices().await;
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|c| c.anonymized && c.ballot_id == ballot.id));

        let mut tallied: Vec<_> = fixture
            .store
            .anon_votes()
            .await
            .into_iter()
            .map(|v| (v.election_id, v.position_id, v.candidate_id))
            .collect();
        tallied.sort();
        assert_eq!(tallied, [(CURRENT, PRESIDENT, ALICE), (CURRENT, SECRETARY, ERIN)]);
    }

    #[backend_test]
    async fn activity_record_never_carries_the_code(fixture: TestFixture) {
        let choices = ballot(&[(PRESIDENT, BOB)]);
        let (_, receipt) = fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();

        let records = fixture.audit.records().await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!((record.actor, record.action.as_str()), (42, "vote"));
        assert_eq!(record.resource_id, CURRENT);
        assert_eq!(record.metadata.positions_voted, 1);
        assert_eq!(record.metadata.masked_receipt, receipt.masked());
        assert_ne!(record.metadata.masked_receipt, receipt.receipt_code);
    }

    #[backend_test]
    async fn second_submission_is_already_voted(fixture: TestFixture) {
        let choices = ballot(&[(PRESIDENT, ALICE)]);
        fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();
        let again = fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await;
        assert!(matches!(again, Err(Error::AlreadyVoted)));
        assert_eq!(fixture.store.ballots().await.len(), 1);
        assert_eq!(fixture.store.anon_votes().await.len(), 1);
    }

    #[backend_test]
    async fn concurrent_submissions_yield_one_ballot() {
        let fixture = TestFixture::with_config(Config::default().with_vote_rate_limit(100)).await;
        let choices = ballot(&[(PRESIDENT, CAROL), (SECRETARY, DAN)]);

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let engine = fixture.engine.clone();
                let choices = choices.clone();
                rocket::tokio::spawn(async move {
                    engine
                        .submit(42, CURRENT, &choices, &ClientInfo::default())
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        let mut already_voted = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(Error::AlreadyVoted) => already_voted += 1,
                Err(e) => panic!("unexpected failure: {e}"),
            }
        }
        assert_eq!((succeeded, already_voted), (1, 15));
        assert_eq!(fixture.store.receipts().await.len(), 1);
        assert_eq!(fixture.store.ballots().await.len(), 1);
        assert_eq!(fixture.store.choices().await.len(), 2);
        assert_eq!(fixture.store.anon_votes().await.len(), 2);
    }

    #[backend_test]
    async fn inactive_elections_refuse_ballots(fixture: TestFixture) {
        for (election, choices) in [
            (FINISHED, ballot(&[(TREASURER, FRANK)])),
            (UPCOMING, ballot(&[(AUDITOR, HEIDI)])),
            (999, ballot(&[(PRESIDENT, ALICE)])),
        ] {
            let result = fixture
                .engine
                .submit(42, election, &choices, &ClientInfo::default())
                .await;
            assert!(matches!(result, Err(Error::ElectionNotActive)));
        }
        nothing_written(&fixture).await;
    }

    #[backend_test]
    async fn invalid_choices_name_the_pair(fixture: TestFixture) {
        for (position, candidate) in [
            // Not approved.
            (PRESIDENT, MALLORY),
            // Standing for a different position.
            (SECRETARY, ALICE),
            // Belongs to a different election.
            (TREASURER, FRANK),
            (PRESIDENT, 999),
        ] {
            let choices = ballot(&[(PRESIDENT, BOB), (position, candidate)]);
            let result = fixture
                .engine
                .submit(42, CURRENT, &choices, &ClientInfo::default())
                .await;
            match result {
                Err(Error::InvalidChoice {
                    position: p,
                    candidate: c,
                }) => assert_eq!((p, c), (position, candidate)),
                other => panic!("expected an invalid choice, got {other:?}"),
            }
        }
        nothing_written(&fixture).await;
    }

    #[backend_test]
    async fn empty_ballot_is_rejected(fixture: TestFixture) {
        let result = fixture
            .engine
            .submit(42, CURRENT, &BTreeMap::new(), &ClientInfo::default())
            .await;
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[backend_test]
    async fn rate_limit_applies_before_anything_else() {
        let fixture = TestFixture::with_config(Config::default().with_vote_rate_limit(2)).await;
        let choices = ballot(&[(PRESIDENT, ALICE)]);
        let client = ClientInfo::default();
        let submit = || fixture.engine.submit(42, CURRENT, &choices, &client);

        assert!(submit().await.is_ok());
        assert!(matches!(submit().await, Err(Error::AlreadyVoted)));
        assert!(matches!(submit().await, Err(Error::TooManyRequests)));
        // Other voters are unaffected.
        assert!(fixture
            .engine
            .submit(43, CURRENT, &choices, &client)
            .await
            .is_ok());
    }

    #[backend_test]
    async fn persistent_fault_leaves_nothing_behind() {
        let fixture = TestFixture::with_config(Config::default().with_vote_rate_limit(100)).await;
        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, DAN)]);
        for op in [
            StoreOp::Begin,
            StoreOp::InsertReceipt,
            StoreOp::InsertBallot,
            StoreOp::InsertChoice,
            StoreOp::InsertAnonVote,
            StoreOp::MarkAnonymized,
            StoreOp::Commit,
        ] {
            fixture.store.fail_next(op, 2).await;
            let result = fixture
                .engine
                .submit(42, CURRENT, &choices, &ClientInfo::default())
                .await;
            assert!(
                matches!(result, Err(Error::Storage(_))),
                "{op:?} fault gave {result:?}"
            );
            nothing_written(&fixture).await;
            assert!(fixture.audit.records().await.is_empty());
        }
    }

    #[backend_test]
    async fn single_fault_is_retried() {
        let fixture = TestFixture::with_config(Config::default().with_vote_rate_limit(100)).await;
        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, DAN)]);
        for (voter, op) in [(1, StoreOp::InsertAnonVote), (2, StoreOp::Commit)] {
            fixture.store.fail_next(op, 1).await;
            fixture
                .engine
                .submit(voter, CURRENT, &choices, &ClientInfo::default())
                .await
                .unwrap();
        }
        assert_eq!(fixture.store.ballots().await.len(), 2);
        assert_eq!(fixture.store.anon_votes().await.len(), 4);
    }

    #[backend_test]
    async fn racing_writer_conflict_is_already_voted() {
        let fixture = TestFixture::with_config(Config::default().with_vote_rate_limit(100)).await;
        let choices = ballot(&[(PRESIDENT, ALICE)]);
        for op in [StoreOp::InsertReceipt, StoreOp::InsertBallot, StoreOp::Commit] {
            let conflict = StoreError::Conflict("WriteConflict".to_string());
            fixture.store.fail_next_with(op, 1, conflict).await;
            let result = fixture
                .engine
                .submit(42, CURRENT, &choices, &ClientInfo::default())
                .await;
            assert!(
                matches!(result, Err(Error::AlreadyVoted)),
                "{op:?} conflict gave {result:?}"
            );
            nothing_written(&fixture).await;
        }

        // The racing submission aborted, so a fresh attempt goes through.
        fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(fixture.store.ballots().await.len(), 1);
    }

    #[backend_test]
    async fn conflict_on_the_retry_is_already_voted(fixture: TestFixture) {
        // The first attempt fails before its ballot insert, the retry on it.
        fixture.store.fail_next(StoreOp::InsertReceipt, 1).await;
        let conflict = StoreError::Conflict("WriteConflict".to_string());
        fixture
            .store
            .fail_next_with(StoreOp::InsertBallot, 1, conflict)
            .await;
        let result = fixture
            .engine
            .submit(42, CURRENT, &ballot(&[(PRESIDENT, BOB)]), &ClientInfo::default())
            .await;
        assert!(matches!(result, Err(Error::AlreadyVoted)), "{result:?}");
        nothing_written(&fixture).await;
    }

    #[backend_test]
    async fn submission_refreshes_cached_results(fixture: TestFixture) {
        let before = fixture.engine.results(CURRENT).await.unwrap();
        assert_eq!(before.total_ballots, 0);

        fixture
            .engine
            .submit(42, CURRENT, &ballot(&[(PRESIDENT, BOB)]), &ClientInfo::default())
            .await
            .unwrap();

        let after = fixture.engine.results(CURRENT).await.unwrap();
        assert_eq!(after.total_ballots, 1);
        assert_eq!(after.positions[0].candidates[0].candidate_id, BOB);
        assert_eq!(fixture.engine.turnout(CURRENT).await.unwrap(), 10.0);
    }

    #[backend_test]
    async fn vote_status_tracks_the_receipt(fixture: TestFixture) {
        let status = fixture.engine.vote_status(42, CURRENT).await.unwrap();
        assert!(!status.has_voted);
        assert_eq!(status.masked_receipt, None);

        let (_, receipt) = fixture
            .engine
            .submit(42, CURRENT, &ballot(&[(PRESIDENT, BOB)]), &ClientInfo::default())
            .await
            .unwrap();

        let status = fixture.engine.vote_status(42, CURRENT).await.unwrap();
        assert!(status.has_voted);
        assert_eq!(status.voted_at, Some(receipt.created_at));
        assert_eq!(status.masked_receipt, Some(receipt.masked()));

        assert!(matches!(
            fixture.engine.vote_status(42, 999).await,
            Err(Error::NotFound(_))
        ));
    }

    #[backend_test]
    async fn own_votes_need_own_receipt(fixture: TestFixture) {
        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, ERIN)]);
        let (_, receipt) = fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();

        let own = fixture
            .engine
            .votes_for_receipt(42, &receipt.receipt_code)
            .await
            .unwrap();
        let summary: Vec<_> = own
            .votes
            .iter()
            .map(|v| (v.position_name.as_str(), v.candidate_name.as_str()))
            .collect();
        assert_eq!(summary, [("President", "Alice"), ("Secretary", "Erin")]);
        assert_eq!(own.votes[0].party.as_deref(), Some("Blue"));

        assert!(matches!(
            fixture
                .engine
                .votes_for_receipt(43, &receipt.receipt_code)
                .await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            fixture.engine.votes_for_receipt(42, "0123").await,
            Err(Error::InvalidReceipt)
        ));
    }

    #[backend_test(purge)]
    async fn purged_choices_cannot_be_looked_up(fixture: TestFixture) {
        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, ERIN)]);
        let (_, receipt) = fixture
            .engine
            .submit(42, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();

        assert!(fixture.store.choices().await.is_empty());
        assert_eq!(fixture.store.anon_votes().await.len(), 2);
        let own = fixture
            .engine
            .votes_for_receipt(42, &receipt.receipt_code)
            .await
            .unwrap();
        assert!(own.votes.is_empty());
    }

    #[backend_test(purge)]
    async fn tally_records_cannot_be_traced_to_a_ballot(fixture: TestFixture) {
        let client = ClientInfo::default();
        for (voter, president, secretary) in [(42, ALICE, ERIN), (43, BOB, DAN)] {
            let choices = ballot(&[(PRESIDENT, president), (SECRETARY, secretary)]);
            fixture
                .engine
                .submit(voter, CURRENT, &choices, &client)
                .await
                .unwrap();
        }
        let ballots = fixture.store.ballots().await;
        let target = ballots.iter().find(|b| b.voter_id == 42).unwrap();
        let votes = fixture.store.anon_votes().await;
        assert_eq!(votes.len(), 4);

        // Every vote carries the same day stamp, never the ballot's instant.
        let day = tally_day(target.submitted_at);
        for vote in &votes {
            assert_ne!(vote.created_at, target.submitted_at);
            assert_eq!(vote.created_at, day);
        }

        // Rebuilding a vote hash from what the ballot row exposes never works.
        let stamps = [
            target.submitted_at.to_rfc3339(),
            target.submitted_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            target.submitted_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            day.to_rfc3339_opts(SecondsFormat::Secs, true),
        ];
        let candidates = [
            (PRESIDENT, ALICE),
            (PRESIDENT, BOB),
            (PRESIDENT, CAROL),
            (SECRETARY, DAN),
            (SECRETARY, ERIN),
        ];
        for (position, candidate) in candidates {
            for stamp in &stamps {
                let input = format!("{CURRENT}:{position}:{candidate}:{stamp}");
                let guess = ReceiptDigest::hex(input.as_bytes());
                assert!(votes.iter().all(|v| v.vote_hash != guess));
            }
        }

        // Vote IDs are not dated next to the ballot's.
        let ballot_millis = target.id.timestamp().timestamp_millis();
        for vote in &votes {
            let apart = vote.id.timestamp().timestamp_millis() - ballot_millis;
            assert!(
                apart.abs() > 60 * 60 * 1000,
                "vote {} dated {apart}ms from its ballot",
                vote.id
            );
        }
    }

    #[backend_test]
    async fn end_to_end(fixture: TestFixture) {
        // Walks the whole engine, so enable logging.
        log4rs_test_utils::test_logging::init_logging_once_for(["anonvote_backend"], None, None);

        let choices = ballot(&[(PRESIDENT, ALICE), (SECRETARY, ERIN)]);
        let (_, receipt) = fixture
            .engine
            .submit(7, CURRENT, &choices, &ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(receipt.receipt_code.len(), 40);

        assert!(fixture.engine.vote_status(7, CURRENT).await.unwrap().has_voted);
        assert!(matches!(
            fixture
                .engine
                .submit(7, CURRENT, &choices, &ClientInfo::default())
                .await,
            Err(Error::AlreadyVoted)
        ));

        let verification = fixture
            .engine
            .verify_receipt(&receipt.receipt_code)
            .await
            .unwrap();
        assert!(verification.valid);

        let results = fixture.engine.results(CURRENT).await.unwrap();
        for (position, candidate) in [(PRESIDENT, ALICE), (SECRETARY, ERIN)] {
            let position = results
                .positions
                .iter()
                .find(|p| p.position_id == position)
                .unwrap();
            assert_eq!(position.total_votes, 1);
            let top = &position.candidates[0];
            assert_eq!((top.candidate_id, top.vote_count), (candidate, 1));
            assert!(!top.is_winner);
        }
    }
}
