//! Store wrappers for observing and breaking storage reads

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use verdb_storage::{Commit, CommitHash, CommitStore, StorageError, StorageResult, TableRoot};

/// Counts table-root reads
pub struct CountingStore {
    inner: Arc<dyn CommitStore>,
    table_reads: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn CommitStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            table_reads: AtomicUsize::new(0),
        })
    }

    pub fn table_reads(&self) -> usize {
        self.table_reads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.table_reads.store(0, Ordering::SeqCst);
    }
}

impl CommitStore for CountingStore {
    fn current_branch(&self) -> StorageResult<String> {
        self.inner.current_branch()
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        self.inner.branch_head(branch)
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        self.inner.contains_commit(hash)
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        self.inner.read_commit(hash)
    }

    fn read_table_root(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<Arc<TableRoot>>> {
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_table_root(commit, table)
    }
}

/// Fails table-root reads at the given commits
pub struct FailingStore {
    inner: Arc<dyn CommitStore>,
    broken: HashSet<CommitHash>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn CommitStore>, broken: impl IntoIterator<Item = CommitHash>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            broken: broken.into_iter().collect(),
        })
    }
}

impl CommitStore for FailingStore {
    fn current_branch(&self) -> StorageResult<String> {
        self.inner.current_branch()
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        self.inner.branch_head(branch)
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        self.inner.contains_commit(hash)
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        self.inner.read_commit(hash)
    }

    fn read_table_root(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<Arc<TableRoot>>> {
        if self.broken.contains(commit) {
            return Err(StorageError::database("disk I/O error"));
        }
        self.inner.read_table_root(commit, table)
    }
}
