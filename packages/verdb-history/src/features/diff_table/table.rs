use std::sync::Arc;
use tracing::{debug, trace};
use verdb_storage::{ColumnType, Commit, CommitHash, CommitStore, Row, TableSchema, Value};

use crate::config::EngineConfig;
use crate::errors::{HistoryError, Result};
use crate::features::commit_walk::CommitWalker;
use crate::features::diff::{diff_snapshots, DiffEntry, SnapshotDiff};
use crate::features::pushdown::{plan_commit_selection, plan_walk};
use crate::features::snapshot::{resolve_schema, SnapshotLoader, TableSnapshot};
use crate::shared::models::{
    CheckedStream, ColumnDef, Expr, PinnedRefs, QueryContext, RowProducer, VirtualSchema,
};

pub const TO_PREFIX: &str = "to_";
pub const FROM_PREFIX: &str = "from_";
pub const TO_COMMIT_HASH: &str = "to_commit_hash";
pub const FROM_COMMIT_HASH: &str = "from_commit_hash";
pub const TO_COMMIT_DATE: &str = "to_commit_date";
pub const FROM_COMMIT_DATE: &str = "from_commit_date";
pub const DIFF_TYPE: &str = "diff_type";

/// Which commit pairs a scan diffs
#[derive(Debug, Clone)]
enum DiffRange {
    /// Every walked commit against its first parent
    Walk,
    /// One explicit pair
    Between { from: Commit, to: Commit },
}

/// Diff history of one user table, planned against a pinned head
pub struct DiffTable {
    store: Arc<dyn CommitStore>,
    table: String,
    head: CommitHash,
    range: DiffRange,
    user_schema: Arc<TableSchema>,
    schema: VirtualSchema,
    config: EngineConfig,
}

impl DiffTable {
    /// Adjacent pairs along the walk from `head`
    pub fn new(store: Arc<dyn CommitStore>, table: &str, head: CommitHash, config: EngineConfig) -> Result<Self> {
        let user_schema = resolve_schema(&store, &head, table, config.walk_order)?;
        Ok(Self::build(store, table, head, DiffRange::Walk, user_schema, config))
    }

    /// Plan against the store's current head
    pub fn open(store: Arc<dyn CommitStore>, table: &str, config: EngineConfig) -> Result<Self> {
        let head = store.head()?;
        Self::new(store, table, head, config)
    }

    /// Single pair `from_ref..to_ref`. Both refs are resolved here, with
    /// `HEAD` pinned to the store's current head.
    pub fn between(
        store: Arc<dyn CommitStore>,
        table: &str,
        from_ref: &str,
        to_ref: &str,
        config: EngineConfig,
    ) -> Result<Self> {
        let refs = PinnedRefs::pin(store.as_ref())?;
        let resolve = |spec: &str| -> Result<Commit> {
            let hash = refs
                .resolve_ref(spec)
                .map_err(|e| HistoryError::resolving(spec, e))?;
            Ok(refs.read_commit(&hash)?)
        };
        let from = resolve(from_ref)?;
        let to = resolve(to_ref)?;
        let head = refs.head_hash().clone();

        let user_schema = match resolve_schema(&store, &to.hash, table, config.walk_order) {
            Err(HistoryError::UnknownTable(_)) => {
                resolve_schema(&store, &from.hash, table, config.walk_order)?
            }
            other => other?,
        };
        debug!(table, from = %from.hash, to = %to.hash, "diff between explicit refs");
        Ok(Self::build(
            store,
            table,
            head,
            DiffRange::Between { from, to },
            user_schema,
            config,
        ))
    }

    fn build(
        store: Arc<dyn CommitStore>,
        table: &str,
        head: CommitHash,
        range: DiffRange,
        user_schema: TableSchema,
        config: EngineConfig,
    ) -> Self {
        let mut columns = VirtualSchema::user_columns(&user_schema, TO_PREFIX, true);
        columns.extend(VirtualSchema::user_columns(&user_schema, FROM_PREFIX, true));
        columns.push(ColumnDef::new(TO_COMMIT_HASH, ColumnType::Text, false));
        columns.push(ColumnDef::new(FROM_COMMIT_HASH, ColumnType::Text, true));
        columns.push(ColumnDef::new(TO_COMMIT_DATE, ColumnType::Timestamp, false));
        columns.push(ColumnDef::new(FROM_COMMIT_DATE, ColumnType::Timestamp, true));
        columns.push(ColumnDef::new(DIFF_TYPE, ColumnType::Text, false));

        Self {
            schema: VirtualSchema::new(format!("{}{}", config.diff_prefix, table), columns),
            store,
            table: table.to_string(),
            head,
            range,
            user_schema: Arc::new(user_schema),
            config,
        }
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

    /// Rows, optionally narrowed by a `to_commit_hash` filter
    pub fn scan(&self, ctx: QueryContext, filter: Option<&Expr>) -> Result<CheckedStream<DiffRows>> {
        let pairs = match &self.range {
            DiffRange::Walk => {
                match plan_walk(&self.store, &self.head, filter, TO_COMMIT_HASH, &self.config)? {
                    Some(walker) => Pairs::Walk(walker),
                    None => return Ok(CheckedStream::empty(ctx)),
                }
            }
            DiffRange::Between { from, to } => {
                if let Some(filter) = filter.filter(|_| self.config.pushdown) {
                    let refs = PinnedRefs::new(self.store.as_ref(), self.head.clone());
                    if !plan_commit_selection(filter, TO_COMMIT_HASH, &refs)?.contains(&to.hash) {
                        return Ok(CheckedStream::empty(ctx));
                    }
                }
                Pairs::Single(Some((to.clone(), Some(from.clone()))))
            }
        };
        debug!(table = %self.schema.table(), head = %self.head, "diff scan");

        Ok(CheckedStream::new(
            ctx,
            DiffRows {
                store: Arc::clone(&self.store),
                pairs,
                loader: SnapshotLoader::new(
                    Arc::clone(&self.store),
                    self.table.clone(),
                    self.config.cache_capacity(),
                ),
                user_schema: Arc::clone(&self.user_schema),
                current: None,
            },
        ))
    }
}

enum Pairs {
    Walk(CommitWalker),
    Single(Option<(Commit, Option<Commit>)>),
}

/// One (to, from) pair being emitted
struct PairCursor {
    diff: SnapshotDiff,
    stamps: [Value; 4],
}

/// Producer behind [`DiffTable::scan`]
pub struct DiffRows {
    store: Arc<dyn CommitStore>,
    pairs: Pairs,
    loader: SnapshotLoader,
    user_schema: Arc<TableSchema>,
    current: Option<PairCursor>,
}

impl DiffRows {
    /// Next (child, parent) pair; the root's parent is `None`
    fn next_pair(&mut self) -> Result<Option<(Commit, Option<Commit>)>> {
        match &mut self.pairs {
            Pairs::Single(pair) => Ok(pair.take()),
            Pairs::Walk(walker) => {
                let Some(child) = walker.next().transpose()? else {
                    return Ok(None);
                };
                let parent = match child.first_parent() {
                    Some(hash) => Some(self.store.read_commit(hash)?),
                    None => None,
                };
                Ok(Some((child, parent)))
            }
        }
    }

    fn load_checked(&mut self, commit: &Commit) -> Result<TableSnapshot> {
        let snapshot = self.loader.load(&commit.hash)?;
        if !snapshot.is_compatible_with(&self.user_schema) {
            return Err(HistoryError::SchemaMismatch {
                table: self.loader.table().to_string(),
                from: snapshot.label(),
                to: commit.hash.to_string(),
            });
        }
        Ok(snapshot)
    }

    fn row(&self, entry: &DiffEntry, stamps: &[Value; 4]) -> Row {
        let width = self.user_schema.len();
        let mut out = Vec::with_capacity(width * 2 + stamps.len() + 1);
        for side in [entry.to_row(), entry.from_row()] {
            match side {
                Some(values) => out.extend_from_slice(values),
                None => out.extend(std::iter::repeat(Value::Null).take(width)),
            }
        }
        out.extend_from_slice(stamps);
        out.push(Value::Text(entry.kind().as_str().to_string()));
        out
    }
}

impl RowProducer for DiffRows {
    fn produce(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(entry) = cursor.diff.next() {
                    let stamps = cursor.stamps.clone();
                    return Ok(Some(self.row(&entry, &stamps)));
                }
            }

            let Some((to, from)) = self.next_pair()? else {
                return Ok(None);
            };
            let to_snapshot = self.load_checked(&to)?;
            let from_snapshot = match &from {
                Some(parent) => self.load_checked(parent)?,
                None => TableSnapshot::empty(None),
            };
            let diff = diff_snapshots(&from_snapshot, &to_snapshot, self.loader.table())?;
            trace!(to = %to.hash, from = ?from.as_ref().map(|c| c.hash.as_str()), "diff pair");

            self.current = Some(PairCursor {
                diff,
                stamps: [
                    Value::Text(to.hash.to_string()),
                    from.as_ref()
                        .map_or(Value::Null, |c| Value::Text(c.hash.to_string())),
                    Value::Timestamp(to.meta.timestamp),
                    from.as_ref()
                        .map_or(Value::Null, |c| Value::Timestamp(c.meta.timestamp)),
                ],
            });
        }
    }
}
