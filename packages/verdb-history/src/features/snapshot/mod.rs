//! Row Snapshot Loader
//!
//! Resolves (commit, table) to a key-ordered, immutable row set. A table
//! that does not exist at a commit yields an empty snapshot; a table that
//! exists at no reachable commit is reported once, at plan time, by
//! [`resolve_schema`].

mod loader;
mod table_snapshot;

pub use loader::{resolve_schema, SnapshotLoader};
pub use table_snapshot::{schemas_compatible, TableSnapshot};
