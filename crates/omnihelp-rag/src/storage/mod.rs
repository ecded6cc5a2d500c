//! Storage module for persistent data storage
//!
//! SQLite persistence for orders and customers, plus the in-process vector
//! index that backs document retrieval.

mod database;
mod index;

pub use database::{OrderDb, SCHEMA_DESCRIPTION};
pub use index::InMemoryIndex;
