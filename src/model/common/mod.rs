//! Domain records shared by the storage layer, the services and the API.

mod ballot;
mod digest;
mod election;
mod receipt;

pub use ballot::{tally_day, AnonVote, Ballot, VoteChoice, VoteCount};
pub use digest::{CacheKeyDigest, HexDigest, ReceiptDigest};
pub use election::{Candidate, Election, Position};
pub use receipt::{Receipt, RECEIPT_CODE_BYTES};

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our position IDs are integers.
pub type PositionId = u32;
/// Our candidate IDs are integers.
pub type CandidateId = u32;
/// Voter IDs are handed to us by the account subsystem.
pub type VoterId = u32;
