//! In-Memory Repository
//!
//! Content-addressed object maps plus a working set. The write API is the
//! small subset of a version-control CLI needed to build histories:
//! `create_table` / `insert` / `update_where` / `delete_where`, `commit`,
//! `create_branch`, `checkout`.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    Commit, CommitHash, CommitMeta, CommitStore, RepositoryObjects, RootHash, RootValue, Row,
    TableData, TableHash, TableRoot, TableSchema,
};
use crate::error::{StorageError, StorageResult};

/// Name of the branch created by `init`
pub const DEFAULT_BRANCH: &str = "master";

struct RepoState {
    commits: HashMap<CommitHash, Arc<Commit>>,
    roots: HashMap<RootHash, Arc<RootValue>>,
    tables: HashMap<TableHash, Arc<TableRoot>>,
    branches: BTreeMap<String, CommitHash>,
    current_branch: String,
    working: BTreeMap<String, TableData>,
}

impl RepoState {
    fn head(&self) -> StorageResult<CommitHash> {
        self.branches
            .get(&self.current_branch)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("branch '{}'", self.current_branch)))
    }

    fn commit(&self, hash: &CommitHash) -> StorageResult<&Arc<Commit>> {
        self.commits
            .get(hash)
            .ok_or_else(|| StorageError::not_found(format!("commit {}", hash)))
    }

    fn root_of(&self, hash: &CommitHash) -> StorageResult<&Arc<RootValue>> {
        let commit = self.commit(hash)?;
        self.roots
            .get(&commit.root)
            .ok_or_else(|| StorageError::corrupt(format!("commit {} has no root {}", hash, commit.root)))
    }

    fn table_mut(&mut self, table: &str) -> StorageResult<&mut TableData> {
        self.working
            .get_mut(table)
            .ok_or_else(|| StorageError::not_found(format!("table '{}'", table)))
    }

    /// Store the working set as content-addressed objects, return its root hash
    fn write_working_root(&mut self) -> StorageResult<RootHash> {
        let mut root = RootValue::default();
        for (name, data) in &self.working {
            let table = data.to_root();
            let hash = table.content_hash()?;
            self.tables.entry(hash.clone()).or_insert_with(|| Arc::new(table));
            root.tables.insert(name.clone(), hash);
        }
        let root_hash = root.content_hash()?;
        self.roots.entry(root_hash.clone()).or_insert_with(|| Arc::new(root));
        Ok(root_hash)
    }

    fn add_commit(&mut self, parents: Vec<CommitHash>, meta: CommitMeta) -> StorageResult<CommitHash> {
        let root = self.write_working_root()?;
        let commit = Commit::new(parents, root, meta)?;
        let hash = commit.hash.clone();
        self.commits.insert(hash.clone(), Arc::new(commit));
        self.branches.insert(self.current_branch.clone(), hash.clone());
        debug!(commit = %hash, branch = %self.current_branch, "created commit");
        Ok(hash)
    }

    fn load_working(&mut self, commit: &CommitHash) -> StorageResult<()> {
        let root = Arc::clone(self.root_of(commit)?);
        let mut working = BTreeMap::new();
        for (name, hash) in &root.tables {
            let table = self
                .tables
                .get(hash)
                .ok_or_else(|| StorageError::corrupt(format!("missing table object {}", hash)))?;
            working.insert(name.clone(), TableData::from_root(table));
        }
        self.working = working;
        Ok(())
    }
}

/// Shared, cloneable in-memory repository
#[derive(Clone)]
pub struct InMemoryRepository {
    state: Arc<RwLock<RepoState>>,
}

impl InMemoryRepository {
    /// Create a repository with an initial empty commit on `master`
    pub fn init(meta: CommitMeta) -> StorageResult<Self> {
        let mut state = RepoState {
            commits: HashMap::new(),
            roots: HashMap::new(),
            tables: HashMap::new(),
            branches: BTreeMap::new(),
            current_branch: DEFAULT_BRANCH.to_string(),
            working: BTreeMap::new(),
        };
        state.add_commit(Vec::new(), meta)?;
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Working set
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn create_table(&self, name: &str, schema: TableSchema) -> StorageResult<()> {
        let mut state = self.state.write();
        if state.working.contains_key(name) {
            return Err(StorageError::invalid_schema(format!(
                "table '{}' already exists",
                name
            )));
        }
        state.working.insert(name.to_string(), TableData::new(schema));
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> StorageResult<()> {
        let mut state = self.state.write();
        state
            .working
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(format!("table '{}'", name)))
    }

    /// Insert rows; a duplicate primary key rejects the whole batch
    pub fn insert(&self, table: &str, rows: Vec<Row>) -> StorageResult<()> {
        let mut state = self.state.write();
        let data = state.table_mut(table)?;

        let mut staged = data.rows.clone();
        for row in rows {
            data.schema.validate_row(&row)?;
            let key = data.schema.key_of(&row);
            if staged.contains_key(&key) {
                return Err(StorageError::invalid_schema(format!(
                    "duplicate primary key {:?} in '{}'",
                    key, table
                )));
            }
            staged.insert(key, row);
        }
        data.rows = staged;
        Ok(())
    }

    /// Rewrite every row matching `predicate`; returns the number updated
    pub fn update_where<P, F>(&self, table: &str, predicate: P, mut update: F) -> StorageResult<usize>
    where
        P: Fn(&Row) -> bool,
        F: FnMut(&mut Row),
    {
        let mut state = self.state.write();
        let data = state.table_mut(table)?;

        let mut staged = BTreeMap::new();
        let mut updated = 0;
        for (key, row) in &data.rows {
            let mut row = row.clone();
            let mut new_key = key.clone();
            if predicate(&row) {
                update(&mut row);
                data.schema.validate_row(&row)?;
                new_key = data.schema.key_of(&row);
                updated += 1;
            }
            if staged.insert(new_key.clone(), row).is_some() {
                return Err(StorageError::invalid_schema(format!(
                    "duplicate primary key {:?} in '{}'",
                    new_key, table
                )));
            }
        }
        data.rows = staged;
        Ok(updated)
    }

    /// Delete every row matching `predicate`; returns the number deleted
    pub fn delete_where<P>(&self, table: &str, predicate: P) -> StorageResult<usize>
    where
        P: Fn(&Row) -> bool,
    {
        let mut state = self.state.write();
        let data = state.table_mut(table)?;
        let before = data.rows.len();
        data.rows.retain(|_, row| !predicate(row));
        Ok(before - data.rows.len())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Commits & branches
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Commit the working set onto the current branch
    pub fn commit(&self, meta: CommitMeta) -> StorageResult<CommitHash> {
        let mut state = self.state.write();
        let head = state.head()?;
        state.add_commit(vec![head], meta)
    }

    /// Commit the working set with `other`'s head recorded as second parent.
    /// No conflict handling: the working set is taken as-is.
    pub fn commit_merge(&self, other: &str, meta: CommitMeta) -> StorageResult<CommitHash> {
        let mut state = self.state.write();
        let head = state.head()?;
        let other_head = state
            .branches
            .get(other)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("branch '{}'", other)))?;
        state.add_commit(vec![head, other_head], meta)
    }

    /// New branch at the current head
    pub fn create_branch(&self, name: &str) -> StorageResult<()> {
        let mut state = self.state.write();
        if state.branches.contains_key(name) {
            return Err(StorageError::invalid_ref(format!(
                "branch '{}' already exists",
                name
            )));
        }
        let head = state.head()?;
        state.branches.insert(name.to_string(), head);
        Ok(())
    }

    /// Switch branches; uncommitted working-set changes are discarded
    pub fn checkout(&self, name: &str) -> StorageResult<()> {
        let mut state = self.state.write();
        let head = state
            .branches
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("branch '{}'", name)))?;
        state.load_working(&head)?;
        state.current_branch = name.to_string();
        Ok(())
    }

    /// Copy of every stored object, for exporting into another store
    pub fn objects(&self) -> RepositoryObjects {
        let state = self.state.read();
        RepositoryObjects {
            commits: state.commits.values().map(|c| (**c).clone()).collect(),
            roots: state
                .roots
                .iter()
                .map(|(h, r)| (h.clone(), (**r).clone()))
                .collect(),
            tables: state
                .tables
                .iter()
                .map(|(h, t)| (h.clone(), (**t).clone()))
                .collect(),
            branches: state.branches.clone(),
            current_branch: state.current_branch.clone(),
        }
    }
}

impl CommitStore for InMemoryRepository {
    fn current_branch(&self) -> StorageResult<String> {
        Ok(self.state.read().current_branch.clone())
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        Ok(self.state.read().branches.get(branch).cloned())
    }

    fn head(&self) -> StorageResult<CommitHash> {
        self.state.read().head()
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        Ok(self.state.read().commits.contains_key(hash))
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        self.state.read().commit(hash).map(|c| (**c).clone())
    }

    fn read_table_root(
        &self,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<Arc<TableRoot>>> {
        let state = self.state.read();
        let root = state.root_of(commit)?;
        match root.table(table) {
            None => Ok(None),
            Some(hash) => state
                .tables
                .get(hash)
                .cloned()
                .map(Some)
                .ok_or_else(|| StorageError::corrupt(format!("missing table object {}", hash))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnType, Value};
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};

    fn meta(message: &str, minute: u32) -> CommitMeta {
        CommitMeta::new("Tester", "tester@example.com", message)
            .at(Utc.with_ymd_and_hms(2020, 1, 1, 0, minute, 0).unwrap())
    }

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("c0", ColumnType::Int),
        ])
        .unwrap()
    }

    fn row(pk: i64, c0: i64) -> Row {
        vec![Value::Int(pk), Value::Int(c0)]
    }

    #[test]
    fn test_init_creates_root_commit() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        let head = repo.head().unwrap();
        let commit = repo.read_commit(&head).unwrap();

        assert!(commit.is_root());
        assert_eq!(repo.current_branch().unwrap(), DEFAULT_BRANCH);
        assert!(repo.read_table_root(&head, "test").unwrap().is_none());
    }

    #[test]
    fn test_commit_and_read_table() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        repo.insert("test", vec![row(1, 1), row(0, 0)]).unwrap();
        let c1 = repo.commit(meta("rows", 1)).unwrap();

        let root = repo.read_table_root(&c1, "test").unwrap().unwrap();
        assert_eq!(root.rows, vec![row(0, 0), row(1, 1)]);
        assert!(root.is_key_ordered());

        let commit = repo.read_commit(&c1).unwrap();
        assert_eq!(commit.parents.len(), 1);
    }

    #[test]
    fn test_unchanged_tables_are_shared() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        repo.insert("test", vec![row(0, 0)]).unwrap();
        let c1 = repo.commit(meta("one", 1)).unwrap();
        let c2 = repo.commit(meta("two", 2)).unwrap();

        let a = repo.read_table_root(&c1, "test").unwrap().unwrap();
        let b = repo.read_table_root(&c2, "test").unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_update_and_delete() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        repo.insert("test", (0..4).map(|i| row(i, i)).collect()).unwrap();

        let updated = repo
            .update_where(
                "test",
                |r| r[1].as_i64().map_or(false, |v| v % 2 == 0),
                |r| r[1] = Value::Int(r[1].as_i64().unwrap_or(0) + 10),
            )
            .unwrap();
        assert_eq!(updated, 2);

        let deleted = repo.delete_where("test", |r| r[0] == Value::Int(3)).unwrap();
        assert_eq!(deleted, 1);

        let head = repo.commit(meta("edit", 1)).unwrap();
        let root = repo.read_table_root(&head, "test").unwrap().unwrap();
        assert_eq!(root.rows, vec![row(0, 10), row(1, 1), row(2, 12)]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        repo.insert("test", vec![row(0, 0)]).unwrap();

        let err = repo.insert("test", vec![row(1, 1), row(0, 5)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);

        // batch rejected as a whole
        let head = repo.commit(meta("after", 1)).unwrap();
        let root = repo.read_table_root(&head, "test").unwrap().unwrap();
        assert_eq!(root.rows.len(), 1);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table(
            "ratios",
            TableSchema::new(vec![
                Column::new("pk", ColumnType::Int).primary_key(),
                Column::new("ratio", ColumnType::Float),
            ])
            .unwrap(),
        )
        .unwrap();
        repo.insert("ratios", vec![vec![Value::Int(0), Value::Float(0.25)]]).unwrap();

        let err = repo
            .insert("ratios", vec![vec![Value::Int(1), Value::Float(f64::NAN)]])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);

        let err = repo
            .update_where("ratios", |_| true, |r| r[1] = Value::Float(f64::INFINITY))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_branch_and_checkout() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        let base = repo.commit(meta("table", 1)).unwrap();

        repo.create_branch("other").unwrap();
        repo.checkout("other").unwrap();
        repo.insert("test", vec![row(8, 8)]).unwrap();
        let other_head = repo.commit(meta("on other", 2)).unwrap();

        repo.checkout("master").unwrap();
        assert_eq!(repo.head().unwrap(), base);
        assert_eq!(repo.branch_head("other").unwrap(), Some(other_head.clone()));

        repo.insert("test", vec![row(2, 2)]).unwrap();
        let merge = repo.commit_merge("other", meta("merge", 3)).unwrap();
        let commit = repo.read_commit(&merge).unwrap();
        assert_eq!(commit.parents, vec![base, other_head]);
    }

    #[test]
    fn test_resolve_ref_relative() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        let init = repo.head().unwrap();
        repo.create_table("test", schema()).unwrap();
        let c1 = repo.commit(meta("one", 1)).unwrap();
        let c2 = repo.commit(meta("two", 2)).unwrap();

        assert_eq!(repo.resolve_ref("HEAD").unwrap(), c2);
        assert_eq!(repo.resolve_ref("head~1").unwrap(), c1);
        assert_eq!(repo.resolve_ref("master~2").unwrap(), init);
        assert_eq!(repo.resolve_ref("HEAD^").unwrap(), c1);
        assert_eq!(repo.resolve_ref(c1.as_str()).unwrap(), c1);

        let err = repo.resolve_ref("head~3").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRef);
        let err = repo.resolve_ref("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRef);
    }

    #[test]
    fn test_objects_export() {
        let repo = InMemoryRepository::init(meta("init", 0)).unwrap();
        repo.create_table("test", schema()).unwrap();
        repo.insert("test", vec![row(0, 0)]).unwrap();
        repo.commit(meta("one", 1)).unwrap();

        let objects = repo.objects();
        assert_eq!(objects.commits.len(), 2);
        assert_eq!(objects.tables.len(), 1);
        assert_eq!(objects.current_branch, "master");
    }
}
