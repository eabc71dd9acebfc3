use std::sync::Arc;
use tracing::debug;
use verdb_storage::{ColumnType, CommitHash, CommitStore, Row, Value};

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::features::commit_walk::CommitWalker;
use crate::features::history_table::{COMMITTER, COMMIT_HASH};
use crate::features::pushdown::plan_walk;
use crate::shared::models::{CheckedStream, ColumnDef, Expr, QueryContext, RowProducer, VirtualSchema};

pub const EMAIL: &str = "email";
pub const DATE: &str = "date";
pub const MESSAGE: &str = "message";

pub struct LogTable {
    store: Arc<dyn CommitStore>,
    head: CommitHash,
    schema: VirtualSchema,
    config: EngineConfig,
}

impl LogTable {
    pub fn new(store: Arc<dyn CommitStore>, head: CommitHash, config: EngineConfig) -> Self {
        let schema = VirtualSchema::new(
            config.log_table.clone(),
            vec![
                ColumnDef::new(COMMIT_HASH, ColumnType::Text, false),
                ColumnDef::new(COMMITTER, ColumnType::Text, false),
                ColumnDef::new(EMAIL, ColumnType::Text, false),
                ColumnDef::new(DATE, ColumnType::Timestamp, false),
                ColumnDef::new(MESSAGE, ColumnType::Text, false),
            ],
        );
        Self {
            store,
            head,
            schema,
            config,
        }
    }

    pub fn open(store: Arc<dyn CommitStore>, config: EngineConfig) -> Result<Self> {
        let head = store.head()?;
        Ok(Self::new(store, head, config))
    }

    pub fn schema(&self) -> &VirtualSchema {
        &self.schema
    }

    pub fn head(&self) -> &CommitHash {
        &self.head
    }

    pub fn scan(&self, ctx: QueryContext, filter: Option<&Expr>) -> Result<CheckedStream<LogRows>> {
        match plan_walk(&self.store, &self.head, filter, COMMIT_HASH, &self.config)? {
            Some(walker) => {
                debug!(head = %self.head, "log scan");
                Ok(CheckedStream::new(ctx, LogRows { walker }))
            }
            None => Ok(CheckedStream::empty(ctx)),
        }
    }
}

/// Producer behind [`LogTable::scan`]
pub struct LogRows {
    walker: CommitWalker,
}

impl RowProducer for LogRows {
    fn produce(&mut self) -> Result<Option<Row>> {
        let Some(commit) = self.walker.next().transpose()? else {
            return Ok(None);
        };
        Ok(Some(vec![
            Value::Text(commit.hash.to_string()),
            Value::Text(commit.meta.name),
            Value::Text(commit.meta.email),
            Value::Timestamp(commit.meta.timestamp),
            Value::Text(commit.meta.message),
        ]))
    }
}
