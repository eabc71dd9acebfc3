//! verdb-storage: commit-addressed table storage
//!
//! Tables are stored as immutable, content-addressed objects tied to commits
//! in a DAG. Readers go through the [`CommitStore`] port; two adapters ship
//! with the crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verdb_storage::{Column, ColumnType, CommitMeta, CommitStore, InMemoryRepository, TableSchema, Value};
//!
//! let repo = InMemoryRepository::init(CommitMeta::new("me", "me@example.com", "init"))?;
//! repo.create_table("test", TableSchema::new(vec![
//!     Column::new("pk", ColumnType::Int).primary_key(),
//!     Column::new("c0", ColumnType::Int),
//! ])?)?;
//! repo.insert("test", vec![vec![Value::Int(0), Value::Int(0)]])?;
//! let head = repo.commit(CommitMeta::new("me", "me@example.com", "rows"))?;
//!
//! let parent = repo.resolve_ref("HEAD~1")?;
//! let table = repo.read_table_root(&head, "test")?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, StorageError, StorageResult};

pub use domain::{
    compute_content_hash, resolve_ref, Ancestry, Column, ColumnType, Commit, CommitHash,
    CommitMeta, CommitStore, Key, RefSpec, RepositoryObjects, RootHash, RootValue, Row, TableData,
    TableHash, TableRoot, TableSchema, Value, HASH_LEN,
};

pub use infrastructure::{InMemoryRepository, DEFAULT_BRANCH};

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteCommitStore;
