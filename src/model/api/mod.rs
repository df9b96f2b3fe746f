//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Document IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.

mod ballot;
mod receipt;
mod results;

pub use ballot::{SubmitBallotRequest, SubmittedBallot, VoteStatus};
pub use receipt::{OwnVote, OwnVotes, ReceiptCodeRequest, ReceiptVerification};
pub use results::{
    CandidateResult, ElectionResults, ElectionStatistics, PositionResults, PositionStatistics,
    Winner,
};
