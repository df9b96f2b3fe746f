//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps and classifies driver errors for the
//! storage layer.

use std::collections::HashSet;

use mongodb::error::{
    Error as DbError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};

use crate::model::store::StoreError;

pub const DUPLICATE_KEY: i32 = 11000;
pub const WRITE_CONFLICT: i32 = 112;

/// The server error code carried by the given error, if any.
pub fn error_code(err: &DbError) -> Option<i32> {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => Some(e.code),
        ErrorKind::Command(ref e) => Some(e.code),
        _ => None,
    }
}

/// Return true if the given error is a duplicate key violation.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    error_code(err) == Some(DUPLICATE_KEY)
}

/// Return true if the commit may or may not have been applied, in which case
/// committing again is safe and settles it.
pub fn is_unknown_commit_result(err: &DbError) -> bool {
    err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
}

/// Codes win over labels. A write conflict also carries the transient label.
fn classify(code: Option<i32>, labels: &HashSet<String>, message: String) -> StoreError {
    match code {
        Some(DUPLICATE_KEY) => StoreError::Duplicate(message),
        Some(WRITE_CONFLICT) => StoreError::Conflict(message),
        _ if labels.contains(TRANSIENT_TRANSACTION_ERROR)
            || labels.contains(UNKNOWN_TRANSACTION_COMMIT_RESULT) =>
        {
            StoreError::Transient(message)
        }
        _ => StoreError::Backend(message),
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        classify(error_code(&err), err.labels(), err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Backend(format!("Malformed document: {err}"))
    }
}
