use std::sync::Arc;
use tracing::debug;
use verdb_storage::{CommitHash, CommitStore};

use super::provider::{ScanRequest, SchemaProvider, TableProvider};
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::features::diff_table::DiffTable;
use crate::features::history_table::HistoryTable;
use crate::features::log_table::LogTable;
use crate::shared::models::{CheckedStream, RowStream, VirtualSchema};

/// Serves `<history_prefix><table>`, `<diff_prefix><table>` and the log
/// table over one commit store. Every lookup pins the store's current head.
pub struct TemporalSchema {
    store: Arc<dyn CommitStore>,
    config: EngineConfig,
}

impl TemporalSchema {
    pub fn new(store: Arc<dyn CommitStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diff table over one explicit `from_ref..to_ref` pair
    pub fn diff_between(&self, table: &str, from_ref: &str, to_ref: &str) -> Result<Arc<dyn TableProvider>> {
        let diff = DiffTable::between(
            Arc::clone(&self.store),
            table,
            from_ref,
            to_ref,
            self.config.clone(),
        )?;
        Ok(Arc::new(diff))
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) && name.len() > prefix.len() {
        Some(&name[prefix.len()..])
    } else {
        None
    }
}

impl SchemaProvider for TemporalSchema {
    fn table(&self, name: &str) -> Result<Option<Arc<dyn TableProvider>>> {
        let store = Arc::clone(&self.store);
        let config = self.config.clone();

        if name.eq_ignore_ascii_case(&self.config.log_table) {
            return Ok(Some(Arc::new(LogTable::open(store, config)?)));
        }
        if let Some(table) = strip_prefix_ignore_case(name, &self.config.history_prefix) {
            debug!(table, "resolving history table");
            return Ok(Some(Arc::new(HistoryTable::open(store, table, config)?)));
        }
        if let Some(table) = strip_prefix_ignore_case(name, &self.config.diff_prefix) {
            debug!(table, "resolving diff table");
            return Ok(Some(Arc::new(DiffTable::open(store, table, config)?)));
        }
        Ok(None)
    }
}

impl TableProvider for HistoryTable {
    fn name(&self) -> &str {
        self.schema().table()
    }

    fn schema(&self) -> &VirtualSchema {
        HistoryTable::schema(self)
    }

    fn pinned_head(&self) -> Option<&CommitHash> {
        Some(self.head())
    }

    fn scan(&self, request: ScanRequest) -> Result<RowStream> {
        HistoryTable::scan(self, request.ctx, request.filter.as_ref()).map(CheckedStream::into_stream)
    }
}

impl TableProvider for DiffTable {
    fn name(&self) -> &str {
        self.schema().table()
    }

    fn schema(&self) -> &VirtualSchema {
        DiffTable::schema(self)
    }

    fn pinned_head(&self) -> Option<&CommitHash> {
        Some(self.head())
    }

    fn scan(&self, request: ScanRequest) -> Result<RowStream> {
        DiffTable::scan(self, request.ctx, request.filter.as_ref()).map(CheckedStream::into_stream)
    }
}

impl TableProvider for LogTable {
    fn name(&self) -> &str {
        self.schema().table()
    }

    fn schema(&self) -> &VirtualSchema {
        LogTable::schema(self)
    }

    fn pinned_head(&self) -> Option<&CommitHash> {
        Some(self.head())
    }

    fn scan(&self, request: ScanRequest) -> Result<RowStream> {
        LogTable::scan(self, request.ctx, request.filter.as_ref()).map(CheckedStream::into_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HistoryError;
    use verdb_storage::{Column, ColumnType, CommitMeta, InMemoryRepository, TableSchema};

    fn schema_provider(config: EngineConfig) -> TemporalSchema {
        let repo = InMemoryRepository::init(CommitMeta::new("Tester", "t@example.com", "init")).unwrap();
        repo.create_table(
            "test",
            TableSchema::new(vec![Column::new("pk", ColumnType::Int).primary_key()]).unwrap(),
        )
        .unwrap();
        repo.commit(CommitMeta::new("Tester", "t@example.com", "create")).unwrap();
        TemporalSchema::new(Arc::new(repo), config).unwrap()
    }

    #[test]
    fn test_resolves_by_prefix() {
        let schema = schema_provider(EngineConfig::default());

        let history = schema.table("dolt_history_test").unwrap().unwrap();
        assert_eq!(history.name(), "dolt_history_test");
        let diff = schema.table("DOLT_DIFF_test").unwrap().unwrap();
        assert_eq!(diff.name(), "dolt_diff_test");
        let log = schema.table("dolt_log").unwrap().unwrap();
        assert_eq!(log.schema().len(), 5);

        assert!(schema.table("test").unwrap().is_none());
        assert!(schema.table("dolt_history_").unwrap().is_none());
    }

    #[test]
    fn test_unknown_user_table_fails_at_lookup() {
        let schema = schema_provider(EngineConfig::default());
        let err = schema.table("dolt_history_nope").err().unwrap();
        assert!(matches!(err, HistoryError::UnknownTable(ref t) if t == "nope"));
    }

    #[test]
    fn test_custom_names() {
        let schema = schema_provider(
            EngineConfig::default()
                .history_prefix("hist_")
                .diff_prefix("delta_")
                .log_table("commits"),
        );
        assert!(schema.table("hist_test").unwrap().is_some());
        assert!(schema.table("delta_test").unwrap().is_some());
        assert!(schema.table("commits").unwrap().is_some());
        assert!(schema.table("dolt_history_test").unwrap().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let repo = InMemoryRepository::init(CommitMeta::new("Tester", "t@example.com", "init")).unwrap();
        let err = TemporalSchema::new(Arc::new(repo), EngineConfig::default().snapshot_cache_capacity(0))
            .err()
            .unwrap();
        assert!(matches!(err, HistoryError::Config(_)));
    }
}
