use std::sync::Arc;
use tracing::{debug, trace};
use verdb_storage::{ColumnType, CommitHash, CommitStore, Row, TableSchema, Value};

use crate::config::EngineConfig;
use crate::errors::{HistoryError, Result};
use crate::features::commit_walk::CommitWalker;
use crate::features::pushdown::plan_walk;
use crate::features::snapshot::{resolve_schema, SnapshotLoader, TableSnapshot};
use crate::shared::models::{CheckedStream, ColumnDef, Expr, QueryContext, RowProducer, VirtualSchema};

pub const COMMIT_HASH: &str = "commit_hash";
pub const COMMITTER: &str = "committer";
pub const COMMIT_DATE: &str = "commit_date";

/// History of one user table, planned against a pinned head
pub struct HistoryTable {
    store: Arc<dyn CommitStore>,
    table: String,
    head: CommitHash,
    user_schema: Arc<TableSchema>,
    schema: VirtualSchema,
    config: EngineConfig,
}

impl HistoryTable {
    /// Plan against `head`. Fails with `UnknownTable` if the table exists
    /// at no commit reachable from it.
    pub fn new(store: Arc<dyn CommitStore>, table: &str, head: CommitHash, config: EngineConfig) -> Result<Self> {
        let user_schema = resolve_schema(&store, &head, table, config.walk_order)?;

        let mut columns = VirtualSchema::user_columns(&user_schema, "", false);
        columns.push(ColumnDef::new(COMMIT_HASH, ColumnType::Text, false));
        columns.push(ColumnDef::new(COMMITTER, ColumnType::Text, false));
        columns.push(ColumnDef::new(COMMIT_DATE, ColumnType::Timestamp, false));
        let schema = VirtualSchema::new(format!("{}{}", config.history_prefix, table), columns);

        Ok(Self {
            store,
            table: table.to_string(),
            head,
            user_schema: Arc::new(user_schema),
            schema,
            config,
        })
    }

    /// Plan against the store's current head
    pub fn open(store: Arc<dyn CommitStore>, table: &str, config: EngineConfig) -> Result<Self> {
        let head = store.head()?;
        Self::new(store, table, head, config)
    }

    pub fn schema(&self) -> &VirtualSchema {
        &self.schema
    }

    pub fn head(&self) -> &CommitHash {
        &self.head
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Rows, optionally narrowed by a `commit_hash` filter. The filter is
    /// not applied to rows here; that is the caller's job.
    pub fn scan(&self, ctx: QueryContext, filter: Option<&Expr>) -> Result<CheckedStream<HistoryRows>> {
        let Some(walker) = plan_walk(&self.store, &self.head, filter, COMMIT_HASH, &self.config)? else {
            return Ok(CheckedStream::empty(ctx));
        };
        debug!(table = %self.schema.table(), head = %self.head, "history scan");

        Ok(CheckedStream::new(
            ctx,
            HistoryRows {
                walker,
                loader: SnapshotLoader::new(
                    Arc::clone(&self.store),
                    self.table.clone(),
                    self.config.cache_capacity(),
                ),
                user_schema: Arc::clone(&self.user_schema),
                head: self.head.clone(),
                cursor: None,
            },
        ))
    }
}

/// Position inside one commit's snapshot
struct Cursor {
    snapshot: TableSnapshot,
    index: usize,
    synthetic: [Value; 3],
}

/// Producer behind [`HistoryTable::scan`]
pub struct HistoryRows {
    walker: CommitWalker,
    loader: SnapshotLoader,
    user_schema: Arc<TableSchema>,
    head: CommitHash,
    cursor: Option<Cursor>,
}

impl RowProducer for HistoryRows {
    fn produce(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(cursor) = self.cursor.as_mut() {
                if let Some((_, row)) = cursor.snapshot.get(cursor.index) {
                    cursor.index += 1;
                    let mut out = Vec::with_capacity(row.len() + cursor.synthetic.len());
                    out.extend_from_slice(row);
                    out.extend_from_slice(&cursor.synthetic);
                    return Ok(Some(out));
                }
            }

            let Some(commit) = self.walker.next().transpose()? else {
                return Ok(None);
            };
            let snapshot = self.loader.load(&commit.hash)?;
            if !snapshot.is_compatible_with(&self.user_schema) {
                return Err(HistoryError::SchemaMismatch {
                    table: self.loader.table().to_string(),
                    from: snapshot.label(),
                    to: self.head.to_string(),
                });
            }
            trace!(commit = %commit.hash, rows = snapshot.len(), "history snapshot");

            self.cursor = Some(Cursor {
                snapshot,
                index: 0,
                synthetic: [
                    Value::Text(commit.hash.to_string()),
                    Value::Text(commit.meta.name),
                    Value::Timestamp(commit.meta.timestamp),
                ],
            });
        }
    }
}
