use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    serde::json::serde_json::json,
    Request, Response,
};
use std::io::Cursor;
use thiserror::Error;

use crate::model::{
    common::{CandidateId, PositionId},
    store::StoreError,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("You have already voted in this election")]
    AlreadyVoted,
    #[error("Election is not accepting ballots")]
    ElectionNotActive,
    #[error("Candidate {candidate} is not standing for position {position} in this election")]
    InvalidChoice {
        position: PositionId,
        candidate: CandidateId,
    },
    #[error("Too many submissions, try again shortly")]
    TooManyRequests,
    #[error("Invalid receipt code")]
    InvalidReceipt,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Self::AlreadyVoted => Status::Conflict,
            Self::ElectionNotActive | Self::Forbidden(_) => Status::Forbidden,
            Self::InvalidChoice { .. } | Self::BadRequest(_) => Status::BadRequest,
            Self::TooManyRequests => Status::TooManyRequests,
            Self::InvalidReceipt | Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Storage(_) => Status::ServiceUnavailable,
        }
    }

    /// Short machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already_voted",
            Self::ElectionNotActive => "election_not_active",
            Self::InvalidChoice { .. } => "invalid_choice",
            Self::TooManyRequests => "too_many_requests",
            Self::InvalidReceipt => "invalid_receipt",
            Self::Storage(_) => "storage_fault",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        // Storage details stay in the logs.
        let detail = match &self {
            Self::Storage(_) => "Temporary storage failure, please retry".to_string(),
            other => other.to_string(),
        };
        let body = json!({
            "error": self.kind(),
            "detail": detail,
        })
        .to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(Error::AlreadyVoted.status(), Status::Conflict);
        assert_eq!(Error::ElectionNotActive.status(), Status::Forbidden);
        assert_eq!(
            Error::InvalidChoice {
                position: 1,
                candidate: 2
            }
            .status(),
            Status::BadRequest
        );
        assert_eq!(Error::TooManyRequests.status(), Status::TooManyRequests);
        assert_eq!(Error::InvalidReceipt.status(), Status::NotFound);
        assert_eq!(
            Error::Storage(StoreError::Transient("x".to_string())).status(),
            Status::ServiceUnavailable
        );
    }

    #[test]
    fn invalid_choice_names_the_pair() {
        let err = Error::InvalidChoice {
            position: 3,
            candidate: 17,
        };
        let message = err.to_string();
        assert!(message.contains("17"));
        assert!(message.contains("3"));
    }
}
