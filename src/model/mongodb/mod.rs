mod bson;
mod collection;
mod directory;
mod errors;
mod store;

pub use bson::Id;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use directory::{MongoAuditLog, MongoDirectory};
pub use errors::{
    error_code, is_duplicate_key_error, is_unknown_commit_result, DUPLICATE_KEY, WRITE_CONFLICT,
};
pub use store::MongoStore;
