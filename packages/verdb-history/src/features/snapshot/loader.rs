use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};
use verdb_storage::{CommitHash, CommitStore, TableSchema};

use super::table_snapshot::TableSnapshot;
use crate::errors::{HistoryError, Result};
use crate::features::commit_walk::{CommitWalker, WalkBound, WalkOrder};

/// Loads snapshots of one table, memoizing recent commits.
///
/// Consecutive history rows and diff pairs touch the same commit twice
/// (as child, then as parent), so a small cache halves storage reads.
pub struct SnapshotLoader {
    store: Arc<dyn CommitStore>,
    table: String,
    cache: LruCache<CommitHash, TableSnapshot>,
    hits: u64,
    misses: u64,
}

impl SnapshotLoader {
    pub fn new(store: Arc<dyn CommitStore>, table: impl Into<String>, capacity: NonZeroUsize) -> Self {
        Self {
            store,
            table: table.into(),
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Rows of the table at `commit`; empty if the table is absent there
    pub fn load(&mut self, commit: &CommitHash) -> Result<TableSnapshot> {
        if let Some(snapshot) = self.cache.get(commit) {
            self.hits += 1;
            trace!(commit = %commit, table = %self.table, "snapshot cache hit");
            return Ok(snapshot.clone());
        }
        self.misses += 1;

        let snapshot = match self
            .store
            .read_table_root(commit, &self.table)
            .map_err(|e| HistoryError::storage_read(commit, &self.table, e))?
        {
            Some(root) => TableSnapshot::from_root(commit.clone(), &root),
            None => TableSnapshot::empty(Some(commit.clone())),
        };

        self.cache.put(commit.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// (hits, misses)
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Schema of `table` at the newest commit reachable from `head` that
/// has the table. `UnknownTable` when no such commit exists.
pub fn resolve_schema(
    store: &Arc<dyn CommitStore>,
    head: &CommitHash,
    table: &str,
    order: WalkOrder,
) -> Result<TableSchema> {
    let walker = CommitWalker::new(Arc::clone(store), head.clone(), WalkBound::Unbounded, order)?;
    for commit in walker {
        let commit = commit?;
        if let Some(schema) = store
            .table_schema(&commit.hash, table)
            .map_err(|e| HistoryError::storage_read(&commit.hash, table, e))?
        {
            debug!(table, commit = %commit.hash, "resolved table schema");
            return Ok(schema);
        }
    }
    Err(HistoryError::UnknownTable(table.to_string()))
}
