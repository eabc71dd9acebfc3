//! Fixture repositories
//!
//! Each fixture is built by an explicit function and handed out as an
//! immutable handle. The shared instances are cached per test binary.

use chrono::{TimeZone, Utc};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use verdb_history::{Catalog, EngineConfig, Query, QueryContext, QueryEngine, ResultSet, TemporalSchema};
use verdb_storage::{Column, ColumnType, CommitHash, CommitMeta, CommitStore, InMemoryRepository, TableSchema, Value};

/// Read-only repository plus the `master` commits, newest first
pub struct Fixture {
    store: Arc<dyn CommitStore>,
    pub commits: Vec<CommitHash>,
}

impl Fixture {
    pub fn new(store: Arc<dyn CommitStore>, commits: Vec<CommitHash>) -> Self {
        Self { store, commits }
    }

    pub fn store(&self) -> Arc<dyn CommitStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> QueryEngine {
        self.engine_with(EngineConfig::default())
    }

    pub fn engine_with(&self, config: EngineConfig) -> QueryEngine {
        engine_over(self.store(), config)
    }

    /// Run with the default engine, panicking on error
    pub fn run(&self, query: Query) -> ResultSet {
        self.engine()
            .execute(&query, QueryContext::new())
            .unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e))
    }

    pub fn hash(&self, index: usize) -> &str {
        self.commits[index].as_str()
    }
}

pub fn engine_over(store: Arc<dyn CommitStore>, config: EngineConfig) -> QueryEngine {
    let catalog = Arc::new(Catalog::new());
    catalog.register_schema(Arc::new(TemporalSchema::new(Arc::clone(&store), config).unwrap()));
    QueryEngine::new(catalog, store)
}

pub fn meta(message: &str, minute: u32) -> CommitMeta {
    CommitMeta::new("Test User", "test@example.com", message)
        .at(Utc.with_ymd_and_hms(2020, 1, 1, 0, minute, 0).unwrap())
}

pub fn test_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("pk", ColumnType::Int).primary_key(),
        Column::new("c0", ColumnType::Int),
    ])
    .unwrap()
}

pub fn int_row(pk: i64, c0: i64) -> Vec<Value> {
    vec![Value::Int(pk), Value::Int(c0)]
}

/// Sequential history on `master`:
/// `(0,0),(1,1)`, then `(2,2),(3,3)`, then `c0 = c0 + 10` where `c0` is even.
///
/// Returns the repository and `[update, second insert, first insert, init]`.
pub fn build_history_repo() -> (InMemoryRepository, Vec<CommitHash>) {
    let repo = InMemoryRepository::init(meta("Initialize data repository", 0)).unwrap();
    let init = repo.head().unwrap();

    repo.create_table("test", test_schema()).unwrap();
    repo.insert("test", vec![int_row(0, 0), int_row(1, 1)]).unwrap();
    let first = repo.commit(meta("Inserted 0, 1", 1)).unwrap();

    repo.insert("test", vec![int_row(2, 2), int_row(3, 3)]).unwrap();
    let second = repo.commit(meta("Inserted 2, 3", 2)).unwrap();

    let updated = repo
        .update_where(
            "test",
            |row| matches!(row[1], Value::Int(c) if c % 2 == 0),
            |row| {
                if let Value::Int(c) = row[1] {
                    row[1] = Value::Int(c + 10);
                }
            },
        )
        .unwrap();
    assert_eq!(updated, 2);
    let third = repo.commit(meta("Updated even c0", 3)).unwrap();

    (repo, vec![third, second, first, init])
}

/// Two branches off the first insert:
/// `master` adds `(2,2),(3,3)`; `other` adds `(8,8),(9,9)`.
///
/// Commits are the `master` chain: `[master insert, first insert, init]`.
pub fn build_diff_repo() -> (InMemoryRepository, Vec<CommitHash>) {
    let repo = InMemoryRepository::init(meta("Initialize data repository", 0)).unwrap();
    let init = repo.head().unwrap();

    repo.create_table("test", test_schema()).unwrap();
    repo.insert("test", vec![int_row(0, 0), int_row(1, 1)]).unwrap();
    let first = repo.commit(meta("Inserted 0, 1", 1)).unwrap();

    repo.create_branch("other").unwrap();
    repo.checkout("other").unwrap();
    repo.insert("test", vec![int_row(8, 8), int_row(9, 9)]).unwrap();
    repo.commit(meta("Inserted 8, 9 on other", 2)).unwrap();

    repo.checkout("master").unwrap();
    repo.insert("test", vec![int_row(2, 2), int_row(3, 3)]).unwrap();
    let master = repo.commit(meta("Inserted 2, 3 on master", 3)).unwrap();

    (repo, vec![master, first, init])
}

/// Shared [`build_history_repo`] fixture
pub fn history_fixture() -> &'static Fixture {
    static FIXTURE: OnceCell<Fixture> = OnceCell::new();
    FIXTURE.get_or_init(|| {
        let (repo, commits) = build_history_repo();
        Fixture::new(Arc::new(repo), commits)
    })
}

/// Shared [`build_diff_repo`] fixture
pub fn diff_fixture() -> &'static Fixture {
    static FIXTURE: OnceCell<Fixture> = OnceCell::new();
    FIXTURE.get_or_init(|| {
        let (repo, commits) = build_diff_repo();
        Fixture::new(Arc::new(repo), commits)
    })
}
