pub mod api;
pub mod common;
pub mod mongodb;
pub mod store;
