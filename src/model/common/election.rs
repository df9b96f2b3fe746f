use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, PositionId};

/// An election, as owned by the election-management subsystem.
/// We only ever read these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    pub title: String,
    /// Voting opens at this instant (inclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes at this instant (exclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Administrative switch; an inactive election never accepts ballots.
    pub is_active: bool,
    /// If set, only members of this group are expected to vote.
    #[serde(default)]
    pub restricted_group: Option<String>,
}

impl Election {
    /// Is the election accepting ballots at `now`?
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time <= now && now < self.end_time
    }

    /// Has the voting window closed at `now`?
    pub fn is_finished_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}

/// A contestable office within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: PositionId,
    pub election_id: ElectionId,
    pub name: String,
    pub max_candidates: u32,
    pub display_order: u32,
}

/// A candidate for a position, approved (or not) by the application workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    pub election_id: ElectionId,
    pub position_id: PositionId,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    pub approved: bool,
}

#[cfg(test)]
pub(crate) mod examples {
    use chrono::Duration;

    use super::*;

    impl Election {
        /// An election that opened an hour ago and closes in an hour.
        pub fn current_example(id: ElectionId) -> Self {
            let now = Utc::now();
            Self {
                id,
                title: format!("Student Council {id}"),
                start_time: now - Duration::hours(1),
                end_time: now + Duration::hours(1),
                is_active: true,
                restricted_group: None,
            }
        }

        /// An election whose window closed a minute ago.
        pub fn finished_example(id: ElectionId) -> Self {
            let now = Utc::now();
            Self {
                start_time: now - Duration::days(1),
                end_time: now - Duration::minutes(1),
                ..Self::current_example(id)
            }
        }

        /// An election that opens tomorrow.
        pub fn future_example(id: ElectionId) -> Self {
            let now = Utc::now();
            Self {
                start_time: now + Duration::days(1),
                end_time: now + Duration::days(2),
                ..Self::current_example(id)
            }
        }
    }

    #[test]
    fn window_is_half_open() {
        let election = Election::current_example(1);
        assert!(election.is_active_at(election.start_time));
        assert!(!election.is_active_at(election.end_time));
        assert!(!election.is_finished_at(election.start_time));
        assert!(election.is_finished_at(election.end_time));
    }

    #[test]
    fn deactivated_election_is_never_active() {
        let election = Election {
            is_active: false,
            ..Election::current_example(1)
        };
        assert!(!election.is_active_at(Utc::now()));
    }
}
