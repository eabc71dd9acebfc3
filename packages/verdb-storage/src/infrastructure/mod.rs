//! Infrastructure layer - Storage adapters
//!
//! - `memory_store`: in-memory repository with a working-set write API
//! - `sqlite`: persisted read store

pub mod memory_store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory_store::{InMemoryRepository, DEFAULT_BRANCH};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCommitStore;
