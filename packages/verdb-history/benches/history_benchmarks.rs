//! Temporal Table Benchmarks
//!
//! Measures:
//! 1. Full history scan (scaling with commit count)
//! 2. Commit-hash equality with and without pushdown
//! 3. Diff table scan over adjacent commits
//! 4. Raw snapshot differ on large tables

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use verdb_history::features::history_table::COMMIT_HASH;
use verdb_history::{
    diff_snapshots, DiffTable, EngineConfig, ExprBuilder, HistoryTable, QueryContext, TableSnapshot,
};
use verdb_storage::{
    Column, ColumnType, CommitHash, CommitMeta, CommitStore, InMemoryRepository, TableRoot, TableSchema,
    Value,
};

fn test_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("pk", ColumnType::Int).primary_key(),
        Column::new("c0", ColumnType::Int),
        Column::new("label", ColumnType::Text),
    ])
    .unwrap()
}

/// Helper: `commits` commits, each inserting `rows_per_commit` new rows
/// and touching one existing row
fn create_test_repo(commits: usize, rows_per_commit: usize) -> Arc<dyn CommitStore> {
    let repo = InMemoryRepository::init(CommitMeta::new("bench", "bench@example.com", "init")).unwrap();
    repo.create_table("test", test_schema()).unwrap();

    let mut next_pk = 0i64;
    for i in 0..commits {
        let rows = (0..rows_per_commit)
            .map(|_| {
                next_pk += 1;
                vec![
                    Value::Int(next_pk),
                    Value::Int(next_pk % 7),
                    Value::Text(format!("row-{}", next_pk)),
                ]
            })
            .collect();
        repo.insert("test", rows).unwrap();
        repo.update_where("test", |r| r[0] == Value::Int(1), |r| r[1] = Value::Int(i as i64))
            .unwrap();
        repo.commit(CommitMeta::new("bench", "bench@example.com", format!("commit {}", i)))
            .unwrap();
    }
    Arc::new(repo)
}

fn create_snapshot(commit: &str, rows: i64, offset: i64) -> TableSnapshot {
    let root = TableRoot {
        schema: test_schema(),
        rows: (0..rows)
            .map(|i| {
                vec![
                    Value::Int(i * 2 + offset),
                    Value::Int(i % 5),
                    Value::Text(format!("row-{}", i)),
                ]
            })
            .collect(),
    };
    TableSnapshot::from_root(CommitHash::new(commit), &root)
}

/// Benchmark 1: Full history scan
fn bench_history_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_full_scan");

    for commits in [10, 50, 200].iter() {
        let store = create_test_repo(*commits, 10);
        let table = HistoryTable::open(store, "test", EngineConfig::default()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(commits), commits, |b, _| {
            b.iter(|| {
                let rows = table.scan(QueryContext::new(), None).unwrap().count();
                black_box(rows)
            });
        });
    }

    group.finish();
}

/// Benchmark 2: `commit_hash = HASHOF('HEAD~5')`, pushdown on vs off
fn bench_history_pushdown(c: &mut Criterion) {
    let store = create_test_repo(200, 10);
    let filter = ExprBuilder::eq_expr(ExprBuilder::column(COMMIT_HASH), ExprBuilder::hash_of("HEAD~5"));
    let mut group = c.benchmark_group("history_commit_filter");

    for pushdown in [true, false] {
        let config = EngineConfig::default().pushdown(pushdown);
        let table = HistoryTable::open(Arc::clone(&store), "test", config).unwrap();
        let name = if pushdown { "pushdown" } else { "full_walk" };

        group.bench_function(name, |b| {
            b.iter(|| {
                let rows = table.scan(QueryContext::new(), Some(&filter)).unwrap().count();
                black_box(rows)
            });
        });
    }

    group.finish();
}

/// Benchmark 3: Diff table scan
fn bench_diff_scan(c: &mut Criterion) {
    let store = create_test_repo(100, 10);
    let table = DiffTable::open(store, "test", EngineConfig::default()).unwrap();

    c.bench_function("diff_table_scan_100_commits", |b| {
        b.iter(|| {
            let rows = table.scan(QueryContext::new(), None).unwrap().count();
            black_box(rows)
        });
    });
}

/// Benchmark 4: Differ merge-walk
fn bench_snapshot_differ(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_differ");

    for rows in [1_000i64, 10_000, 100_000].iter() {
        // even keys on one side, odd on the other
        let from = create_snapshot("a", *rows, 0);
        let to = create_snapshot("b", *rows, 1);

        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                let entries = diff_snapshots(&from, &to, "test").unwrap().count();
                black_box(entries)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_history_full_scan,
    bench_history_pushdown,
    bench_diff_scan,
    bench_snapshot_differ,
);
criterion_main!(benches);
