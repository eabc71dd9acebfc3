use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{SchemaProvider, TableProvider};
use crate::errors::{HistoryError, Result};

/// Name → provider registry
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, Arc<dyn TableProvider>>>,
    schemas: RwLock<Vec<Arc<dyn SchemaProvider>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema providers are asked in registration order
    pub fn register_schema(&self, schema: Arc<dyn SchemaProvider>) {
        self.schemas.write().push(schema);
    }

    /// Fixed table; shadows schema providers. Returns the replaced one.
    pub fn register_table(&self, table: Arc<dyn TableProvider>) -> Option<Arc<dyn TableProvider>> {
        let key = table.name().to_ascii_lowercase();
        debug!(table = %key, "registering table");
        self.tables.write().insert(key, table)
    }

    pub fn deregister_table(&self, name: &str) -> Option<Arc<dyn TableProvider>> {
        self.tables.write().remove(&name.to_ascii_lowercase())
    }

    /// Provider for `name`, or `UnknownTable`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn TableProvider>> {
        if let Some(table) = self.tables.read().get(&name.to_ascii_lowercase()) {
            return Ok(Arc::clone(table));
        }

        let schemas: Vec<_> = self.schemas.read().iter().cloned().collect();
        for schema in schemas {
            if let Some(table) = schema.table(name)? {
                return Ok(table);
            }
        }
        Err(HistoryError::UnknownTable(name.to_string()))
    }
}
