use chrono::{DateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use data_encoding::HEXLOWER;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::{digest::HexDigest, CandidateId, ElectionId, PositionId, ReceiptDigest, VoterId};

/// Browsers can send arbitrarily long user agents; we keep this much.
const MAX_USER_AGENT_LEN: usize = 255;

/// Random bytes mixed into each vote hash.
const VOTE_NONCE_BYTES: usize = 16;

/// Proof that a voter took part in an election. One per (voter, election).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: VoterId,
    pub election_id: ElectionId,
    /// The one receipt issued for this ballot.
    pub receipt_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl Ballot {
    pub fn new(
        voter_id: VoterId,
        election_id: ElectionId,
        receipt_id: Id,
        ip_address: Option<String>,
        user_agent: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let user_agent = user_agent
            .unwrap_or_default()
            .chars()
            .take(MAX_USER_AGENT_LEN)
            .collect();
        Self {
            id: Id::new(),
            voter_id,
            election_id,
            receipt_id,
            submitted_at,
            ip_address,
            user_agent,
        }
    }
}

/// The linkable (ballot, position, candidate) record. It only carries meaning
/// until it has been anonymized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChoice {
    #[serde(rename = "_id")]
    pub id: Id,
    pub ballot_id: Id,
    pub election_id: ElectionId,
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub anonymized: bool,
}

impl VoteChoice {
    pub fn new(
        ballot: &Ballot,
        position_id: PositionId,
        candidate_id: CandidateId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Id::new(),
            ballot_id: ballot.id,
            election_id: ballot.election_id,
            position_id,
            candidate_id,
            created_at,
            anonymized: false,
        }
    }
}

/// A tally record. There is no voter or ballot reference in here, and there
/// must never be one, direct or derivable: the ID is random, the timestamp
/// only names the day, and the hash is salted with a nonce that is thrown
/// away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonVote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: ElectionId,
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
    /// SHA-256 over the election, position, candidate, day and a random nonce.
    pub vote_hash: String,
    /// Midnight UTC of the day the vote was anonymized.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AnonVote {
    pub fn new(
        election_id: ElectionId,
        position_id: PositionId,
        candidate_id: CandidateId,
        mut rng: impl RngCore + CryptoRng,
        now: DateTime<Utc>,
    ) -> Self {
        let created_at = tally_day(now);
        let mut nonce = [0u8; VOTE_NONCE_BYTES];
        rng.fill_bytes(&mut nonce);
        let hash_input = format!(
            "{election_id}:{position_id}:{candidate_id}:{}:{}",
            created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            HEXLOWER.encode(&nonce)
        );
        Self {
            id: Id::random(&mut rng),
            election_id,
            position_id,
            candidate_id,
            vote_hash: ReceiptDigest::hex(hash_input.as_bytes()),
            created_at,
        }
    }
}

/// The instant stored on a tally record made at `now`.
pub fn tally_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()))
}

/// Number of anonymized votes one candidate received for one position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
    pub votes: u64,
}
