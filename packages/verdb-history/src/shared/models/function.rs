//! Scalar functions that need repository access (`HASHOF`)

use std::sync::Arc;
use verdb_storage::{resolve_ref, Commit, CommitHash, CommitStore, StorageResult, TableRoot, TableSchema};

use crate::errors::{HistoryError, Result};

/// Functions the expression evaluator may call
pub trait FunctionContext {
    /// `HASHOF(spec)`: resolve a reference to a commit hash
    fn hash_of(&self, spec: &str) -> Result<CommitHash>;
}

/// Store view whose `HEAD` is fixed for the duration of one query.
///
/// Branch names and hashes resolve normally; only `HEAD` is pinned.
pub struct PinnedRefs<'a> {
    store: &'a dyn CommitStore,
    head: CommitHash,
}

impl<'a> PinnedRefs<'a> {
    pub fn new(store: &'a dyn CommitStore, head: CommitHash) -> Self {
        Self { store, head }
    }

    /// Pin the store's current head
    pub fn pin(store: &'a dyn CommitStore) -> Result<Self> {
        let head = store.head()?;
        Ok(Self::new(store, head))
    }

    pub fn head_hash(&self) -> &CommitHash {
        &self.head
    }
}

impl CommitStore for PinnedRefs<'_> {
    fn current_branch(&self) -> StorageResult<String> {
        self.store.current_branch()
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        self.store.branch_head(branch)
    }

    fn head(&self) -> StorageResult<CommitHash> {
        Ok(self.head.clone())
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        self.store.contains_commit(hash)
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        self.store.read_commit(hash)
    }

    fn read_table_root(
        &self,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<Arc<TableRoot>>> {
        self.store.read_table_root(commit, table)
    }

    fn table_schema(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<TableSchema>> {
        self.store.table_schema(commit, table)
    }
}

impl FunctionContext for PinnedRefs<'_> {
    fn hash_of(&self, spec: &str) -> Result<CommitHash> {
        resolve_ref(self, spec).map_err(|e| HistoryError::resolving(spec, e))
    }
}
