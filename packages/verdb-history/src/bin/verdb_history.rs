//! verdb-history CLI
//!
//! Prints temporal tables of a SQLite-backed repository as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! # Write a small sample history
//! verdb-history seed --db /tmp/repo.db
//!
//! # Every row at every commit
//! verdb-history query --db /tmp/repo.db --table dolt_history_test
//!
//! # Only the rows of one commit
//! verdb-history query --db /tmp/repo.db --table dolt_history_test --commit HEAD~1
//!
//! # Changes between two refs
//! verdb-history diff --db /tmp/repo.db --table test --from HEAD~2 --to HEAD
//! ```

use anyhow::{bail, Context};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use verdb_history::features::diff_table::TO_COMMIT_HASH;
use verdb_history::features::history_table::COMMIT_HASH;
use verdb_history::{
    Catalog, EngineConfig, ExprBuilder, Query, QueryContext, QueryEngine, QueryRows, TableProvider,
    TemporalSchema,
};
use verdb_storage::{
    Column, ColumnType, CommitMeta, CommitStore, InMemoryRepository, SqliteCommitStore, TableSchema, Value,
};

#[derive(Parser)]
#[command(name = "verdb-history")]
#[command(about = "Query history, diff and log tables of a versioned database", long_about = None)]
struct Cli {
    /// YAML engine configuration (version: 1)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a temporal table
    Query {
        /// SQLite repository
        #[arg(long)]
        db: PathBuf,

        /// Virtual table, e.g. dolt_history_test
        #[arg(short, long)]
        table: String,

        /// Restrict to one commit (hash, branch, HEAD~N, ...)
        #[arg(long)]
        commit: Option<String>,

        /// Comma-separated output columns
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Diff one user table between two refs
    Diff {
        #[arg(long)]
        db: PathBuf,

        /// User table name
        #[arg(short, long)]
        table: String,

        #[arg(long)]
        from: String,

        #[arg(long, default_value = "HEAD")]
        to: String,
    },

    /// Write a sample history (table `test`) into a new repository
    Seed {
        #[arg(long)]
        db: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Query {
            db,
            table,
            commit,
            columns,
            limit,
        } => run_query(&db, config, table, commit, columns, limit),
        Commands::Diff { db, table, from, to } => run_diff(&db, config, &table, &from, &to),
        Commands::Seed { db } => seed(&db),
    }
}

fn open_store(db: &Path) -> anyhow::Result<Arc<dyn CommitStore>> {
    if !db.exists() {
        bail!("repository {} does not exist", db.display());
    }
    let store = SqliteCommitStore::new(db).with_context(|| format!("opening {}", db.display()))?;
    Ok(Arc::new(store))
}

fn run_query(
    db: &Path,
    config: EngineConfig,
    table: String,
    commit: Option<String>,
    columns: Option<Vec<String>>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let store = open_store(db)?;
    let commit_column = if table.to_ascii_lowercase().starts_with(&config.diff_prefix) {
        TO_COMMIT_HASH
    } else {
        COMMIT_HASH
    };

    let catalog = Arc::new(Catalog::new());
    catalog.register_schema(Arc::new(TemporalSchema::new(Arc::clone(&store), config)?));
    let engine = QueryEngine::new(catalog, store);

    let mut query = Query::select_all(table);
    query.columns = columns;
    query.limit = limit;
    if let Some(reference) = commit {
        query = query.filter(ExprBuilder::eq_expr(
            ExprBuilder::column(commit_column),
            ExprBuilder::hash_of(&reference),
        ));
    }

    let rows = engine.execute_iter(&query, QueryContext::new())?;
    let count = print_rows(rows)?;
    info!(rows = count, table = %query.table, "query complete");
    Ok(())
}

fn run_diff(db: &Path, config: EngineConfig, table: &str, from: &str, to: &str) -> anyhow::Result<()> {
    let store = open_store(db)?;
    let schema = TemporalSchema::new(Arc::clone(&store), config)?;
    let provider = schema.diff_between(table, from, to)?;

    let catalog = Arc::new(Catalog::new());
    catalog.register_table(Arc::clone(&provider));
    let engine = QueryEngine::new(catalog, store);

    let rows = engine.execute_iter(&Query::select_all(provider.name()), QueryContext::new())?;
    let count = print_rows(rows)?;
    info!(rows = count, table, from, to, "diff complete");
    Ok(())
}

fn print_rows(rows: QueryRows) -> anyhow::Result<usize> {
    let columns = rows.columns().to_vec();
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut count = 0;
    for row in rows {
        let row = row?;
        let object: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .zip(&row)
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::to_writer(&mut out, &object)?;
        writeln!(out)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Three commits on `master`: two inserts and one update
fn seed(db: &Path) -> anyhow::Result<()> {
    if db.exists() {
        bail!("{} already exists", db.display());
    }

    let meta = |message: &str, minute: u32| -> anyhow::Result<CommitMeta> {
        let at = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, minute, 0)
            .single()
            .context("invalid timestamp")?;
        Ok(CommitMeta::new("verdb", "verdb@example.com", message).at(at))
    };

    let repo = InMemoryRepository::init(meta("Initialize data repository", 0)?)?;
    repo.create_table(
        "test",
        TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("c0", ColumnType::Int),
        ])?,
    )?;
    repo.insert("test", vec![vec![Value::Int(0), Value::Int(0)], vec![Value::Int(1), Value::Int(1)]])?;
    repo.commit(meta("insert 0, 1", 1)?)?;
    repo.insert("test", vec![vec![Value::Int(2), Value::Int(2)], vec![Value::Int(3), Value::Int(3)]])?;
    repo.commit(meta("insert 2, 3", 2)?)?;
    repo.update_where(
        "test",
        |row| matches!(row[1], Value::Int(c) if c % 2 == 0),
        |row| {
            if let Value::Int(c) = row[1] {
                row[1] = Value::Int(c + 10);
            }
        },
    )?;
    let head = repo.commit(meta("c0 += 10 where even", 3)?)?;

    let store = SqliteCommitStore::new(db)?;
    store.import(&repo.objects())?;
    info!(db = %db.display(), head = %head, "seeded repository");
    println!("{}", head);
    Ok(())
}
