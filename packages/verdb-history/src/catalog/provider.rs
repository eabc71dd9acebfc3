use std::sync::Arc;
use verdb_storage::CommitHash;

use crate::errors::Result;
use crate::shared::models::{Expr, QueryContext, RowStream, VirtualSchema};

/// What the host hands a table when it starts a scan
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub ctx: QueryContext,
    /// Full filter with constants folded. Tables may use it to skip work
    /// but must not rely on it being applied for them.
    pub filter: Option<Expr>,
}

impl ScanRequest {
    pub fn new(ctx: QueryContext) -> Self {
        Self { ctx, filter: None }
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A read-only table the host can scan
pub trait TableProvider: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &VirtualSchema;

    /// Head commit the table was planned against, if it reads history
    fn pinned_head(&self) -> Option<&CommitHash> {
        None
    }

    fn scan(&self, request: ScanRequest) -> Result<RowStream>;
}

/// Resolves table names to providers
pub trait SchemaProvider: Send + Sync {
    /// `Ok(None)` when the name is not handled by this provider
    fn table(&self, name: &str) -> Result<Option<Arc<dyn TableProvider>>>;
}
