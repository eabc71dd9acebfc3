//! Commit Store Port (Trait Interface)
//!
//! Port/Adapter pattern for backend flexibility:
//! - Testing: `InMemoryRepository` (also the write side)
//! - Persisted: `SqliteCommitStore`

use std::sync::Arc;

use super::models::{Commit, CommitHash, TableRoot};
use super::refspec;
use super::schema::TableSchema;
use crate::error::{StorageError, StorageResult};

/// Read access to commits, refs and table roots.
///
/// Historical objects are immutable; only branch heads move.
pub trait CommitStore: Send + Sync {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Refs
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Name of the checked-out branch
    fn current_branch(&self) -> StorageResult<String>;

    /// Head commit of a branch, `None` if the branch does not exist
    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>>;

    /// Head commit of the checked-out branch
    fn head(&self) -> StorageResult<CommitHash> {
        let branch = self.current_branch()?;
        self.branch_head(&branch)?
            .ok_or_else(|| StorageError::not_found(format!("head of branch '{}'", branch)))
    }

    /// Resolve `HEAD`, `HEAD~N`, `<branch>^N`, hashes, ...
    fn resolve_ref(&self, spec: &str) -> StorageResult<CommitHash> {
        refspec::resolve_ref(self, spec)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Commits
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool>;

    /// Fails with `ErrorKind::NotFound` for unknown hashes
    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Tables
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Table state at a commit, `None` when the table does not exist there
    fn read_table_root(
        &self,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<Arc<TableRoot>>>;

    /// Schema only; backends may answer without loading rows
    fn table_schema(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<TableSchema>> {
        Ok(self
            .read_table_root(commit, table)?
            .map(|root| root.schema.clone()))
    }
}

impl<S: CommitStore + ?Sized> CommitStore for Arc<S> {
    fn current_branch(&self) -> StorageResult<String> {
        (**self).current_branch()
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        (**self).branch_head(branch)
    }

    fn head(&self) -> StorageResult<CommitHash> {
        (**self).head()
    }

    fn resolve_ref(&self, spec: &str) -> StorageResult<CommitHash> {
        (**self).resolve_ref(spec)
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        (**self).contains_commit(hash)
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        (**self).read_commit(hash)
    }

    fn read_table_root(
        &self,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<Arc<TableRoot>>> {
        (**self).read_table_root(commit, table)
    }

    fn table_schema(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<TableSchema>> {
        (**self).table_schema(commit, table)
    }
}
