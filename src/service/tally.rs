//! Results, statistics and winners, computed from anonymized votes only.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        CandidateResult, ElectionResults, ElectionStatistics, PositionResults,
        PositionStatistics, Winner,
    },
    common::{Candidate, CandidateId, ElectionId, Position, PositionId, VoteCount},
};

use super::{cache::cache_key, BallotEngine};

/// `part` as a percentage of `whole`, rounded to two decimal places.
/// Zero when there is nothing to divide by.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

/// Share of the eligible population that cast a ballot.
pub fn turnout_percentage(ballots: u64, eligible: u64) -> f64 {
    percentage(ballots, eligible)
}

/// Rank the candidates of one position.
///
/// Every approved candidate is listed, with zero votes if need be. Votes for a
/// candidate who is no longer approved still count and are listed after the
/// approved ones, without a name. Candidates are ordered by vote count, best
/// first; equal counts keep candidate ID order.
pub fn rank_position(
    position: &Position,
    candidates: &[Candidate],
    counts: &HashMap<CandidateId, u64>,
    finished: bool,
) -> PositionResults {
    let mut entries: Vec<(CandidateId, String, Option<String>, u64)> = candidates
        .iter()
        .filter(|c| c.position_id == position.id)
        .map(|c| {
            let votes = counts.get(&c.id).copied().unwrap_or(0);
            (c.id, c.name.clone(), c.party.clone(), votes)
        })
        .collect();
    let listed: BTreeSet<_> = entries.iter().map(|(id, ..)| *id).collect();
    let mut unlisted: Vec<_> = counts
        .iter()
        .filter(|(id, _)| !listed.contains(id))
        .map(|(id, votes)| (*id, String::new(), None, *votes))
        .collect();
    unlisted.sort_by_key(|(id, ..)| *id);
    entries.extend(unlisted);

    // Stable, so ties stay in ID order.
    entries.sort_by(|a, b| b.3.cmp(&a.3));

    let total_votes: u64 = entries.iter().map(|(.., votes)| votes).sum();
    let candidates = entries
        .into_iter()
        .enumerate()
        .map(|(idx, (candidate_id, candidate_name, party, vote_count))| CandidateResult {
            candidate_id,
            candidate_name,
            party,
            vote_count,
            percentage: percentage(vote_count, total_votes),
            rank: idx as u32 + 1,
            is_winner: idx == 0 && vote_count > 0 && finished,
        })
        .collect();

    PositionResults {
        position_id: position.id,
        position_name: position.name.clone(),
        total_votes,
        candidates,
    }
}

/// Vote counts of one position, keyed by candidate.
fn counts_for(counts: &[VoteCount], position: PositionId) -> HashMap<CandidateId, u64> {
    counts
        .iter()
        .filter(|c| c.position_id == position)
        .map(|c| (c.candidate_id, c.votes))
        .collect()
}

impl BallotEngine {
    /// Live results of every position, in display order. An unknown election
    /// yields an empty result rather than an error.
    pub async fn results(&self, election: ElectionId) -> Result<ElectionResults> {
        let key = cache_key("live_results", &[&election]);
        self.cached(key, self.config.live_results_ttl(), || {
            self.compute_results(election)
        })
        .await
    }

    async fn compute_results(&self, election_id: ElectionId) -> Result<ElectionResults> {
        let Some(election) = self.directory.election(election_id).await? else {
            return Ok(ElectionResults::empty(election_id));
        };
        let now = Utc::now();
        let finished = election.is_finished_at(now);

        let positions = self.directory.positions(election_id).await?;
        let candidates = self.directory.candidates(election_id).await?;
        let counts = self.store.vote_counts(election_id).await?;

        let positions = positions
            .iter()
            .map(|p| rank_position(p, &candidates, &counts_for(&counts, p.id), finished))
            .collect();

        Ok(ElectionResults {
            election_id,
            election_title: election.title.clone(),
            election_ended: finished,
            is_active: election.is_active_at(now),
            total_voters: self.store.receipt_count(election_id).await?,
            total_ballots: self.store.ballot_count(election_id).await?,
            positions,
        })
    }

    /// Live results of a single position.
    pub async fn position_results(
        &self,
        election: ElectionId,
        position: PositionId,
    ) -> Result<PositionResults> {
        let key = cache_key("position_results", &[&election, &position]);
        self.cached(key, self.config.position_results_ttl(), || {
            self.compute_position_results(election, position)
        })
        .await
    }

    async fn compute_position_results(
        &self,
        election_id: ElectionId,
        position_id: PositionId,
    ) -> Result<PositionResults> {
        let election = self
            .directory
            .election(election_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No election with ID {election_id}")))?;
        let position = self
            .directory
            .positions(election_id)
            .await?
            .into_iter()
            .find(|p| p.id == position_id)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No position {position_id} in election {election_id}"
                ))
            })?;
        let candidates = self.directory.candidates(election_id).await?;
        let counts = self.store.vote_counts(election_id).await?;

        Ok(rank_position(
            &position,
            &candidates,
            &counts_for(&counts, position_id),
            election.is_finished_at(Utc::now()),
        ))
    }

    /// Participation figures. An unknown election yields all zeros.
    pub async fn statistics(&self, election: ElectionId) -> Result<ElectionStatistics> {
        let key = cache_key("election_statistics", &[&election]);
        self.cached(key, self.config.statistics_ttl(), || {
            self.compute_statistics(election)
        })
        .await
    }

    async fn compute_statistics(&self, election_id: ElectionId) -> Result<ElectionStatistics> {
        let Some(election) = self.directory.election(election_id).await? else {
            return Ok(ElectionStatistics::empty(election_id));
        };

        let positions = self.directory.positions(election_id).await?;
        let candidates = self.directory.candidates(election_id).await?;
        let counts = self.store.vote_counts(election_id).await?;
        let total_voters = self.store.receipt_count(election_id).await?;
        let total_eligible_voters = self.directory.eligible_voter_count(election_id).await?;

        let position_statistics = positions
            .iter()
            .map(|p| PositionStatistics {
                position_id: p.id,
                position_name: p.name.clone(),
                total_votes: counts_for(&counts, p.id).values().sum(),
                candidates_count: candidates.iter().filter(|c| c.position_id == p.id).count()
                    as u64,
            })
            .collect();

        Ok(ElectionStatistics {
            election_id,
            election_title: election.title,
            total_voters,
            total_votes: counts.iter().map(|c| c.votes).sum(),
            total_positions: positions.len() as u64,
            total_eligible_voters,
            turnout_percentage: turnout_percentage(total_voters, total_eligible_voters),
            position_statistics,
        })
    }

    /// Percentage of the eligible population holding a ballot.
    pub async fn turnout(&self, election: ElectionId) -> Result<f64> {
        let key = cache_key("turnout", &[&election]);
        self.cached(key, self.config.statistics_ttl(), || async move {
            let ballots = self.store.ballot_count(election).await?;
            let eligible = self.directory.eligible_voter_count(election).await?;
            Ok(turnout_percentage(ballots, eligible))
        })
        .await
    }

    /// The elected candidate of each position. Empty until the election has
    /// finished; a position nobody voted for has no winner.
    pub async fn winners(&self, election: ElectionId) -> Result<Vec<Winner>> {
        let key = cache_key("winners", &[&election]);
        self.cached(key, self.config.live_results_ttl(), || async move {
            let results = self.results(election).await?;
            Ok(results
                .positions
                .into_iter()
                .filter_map(|position| {
                    let first = position.candidates.into_iter().next()?;
                    first.is_winner.then(|| Winner {
                        position_id: position.position_id,
                        position_name: position.position_name,
                        candidate_id: first.candidate_id,
                        candidate_name: first.candidate_name,
                        party: first.party,
                        vote_count: first.vote_count,
                        percentage: first.percentage,
                    })
                })
                .collect())
        })
        .await
    }
}
