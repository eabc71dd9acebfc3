use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use verdb_storage::{CommitHash, CommitStore, Row, Value};

use super::catalog::Catalog;
use super::statement::Query;
use crate::catalog::ScanRequest;
use crate::errors::{HistoryError, Result};
use crate::shared::models::{Expr, FunctionContext, PinnedRefs, QueryContext, RowStream, VirtualSchema};

/// Executes [`Query`] values against a [`Catalog`]
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    store: Arc<dyn CommitStore>,
}

/// `HASHOF` for row-level evaluation, with `HEAD` fixed for the query
struct HeadRefs {
    store: Arc<dyn CommitStore>,
    head: CommitHash,
}

impl FunctionContext for HeadRefs {
    fn hash_of(&self, spec: &str) -> Result<CommitHash> {
        PinnedRefs::new(self.store.as_ref(), self.head.clone()).hash_of(spec)
    }
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn CommitStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Plan and run to completion
    pub fn execute(&self, query: &Query, ctx: QueryContext) -> Result<ResultSet> {
        let rows = self.execute_iter(query, ctx)?;
        let columns = rows.columns().to_vec();
        let rows = rows.collect::<Result<Vec<_>>>()?;
        Ok(ResultSet { columns, rows })
    }

    /// Plan and return a lazy row iterator.
    ///
    /// Planning errors (`UnknownTable`, `UnknownColumn`, `InvalidRef` in a
    /// constant `HASHOF`) surface here, before any row is read.
    pub fn execute_iter(&self, query: &Query, ctx: QueryContext) -> Result<QueryRows> {
        let provider = self.catalog.resolve(&query.table)?;
        let schema = provider.schema().clone();

        let head = match provider.pinned_head() {
            Some(head) => head.clone(),
            None => self.store.head()?,
        };
        let refs = HeadRefs {
            store: Arc::clone(&self.store),
            head,
        };

        let filter = match &query.filter {
            Some(filter) => Some(filter.fold_constants(&refs)?),
            None => None,
        };

        let projection = match &query.columns {
            Some(names) => names
                .iter()
                .map(|name| column_index(&schema, name))
                .collect::<Result<Vec<_>>>()?,
            None => (0..schema.len()).collect(),
        };
        if let Some(filter) = &filter {
            for name in filter.columns() {
                column_index(&schema, name)?;
            }
            filter.check_types(&|name: &str| schema.index_of(name).map(|i| schema.columns()[i].ty))?;
        }
        let columns = projection
            .iter()
            .map(|&i| schema.columns()[i].name.clone())
            .collect();

        let stream = if query.limit == Some(0) {
            None
        } else {
            let mut request = ScanRequest::new(ctx);
            request.filter = filter.clone();
            Some(provider.scan(request)?)
        };
        debug!(
            table = %schema.table(),
            filtered = filter.is_some(),
            limit = ?query.limit,
            "query planned"
        );

        Ok(QueryRows {
            stream,
            schema,
            filter,
            refs,
            projection,
            columns,
            remaining: query.limit,
        })
    }
}

fn column_index(schema: &VirtualSchema, name: &str) -> Result<usize> {
    schema.index_of(name).ok_or_else(|| HistoryError::UnknownColumn {
        table: schema.table().to_string(),
        column: name.to_string(),
    })
}

/// Filtered, projected rows of one query
pub struct QueryRows {
    stream: Option<RowStream>,
    schema: VirtualSchema,
    filter: Option<Expr>,
    refs: HeadRefs,
    projection: Vec<usize>,
    columns: Vec<String>,
    remaining: Option<usize>,
}

impl QueryRows {
    /// Output column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn keep(&self, row: &Row) -> Result<bool> {
        match &self.filter {
            Some(filter) => filter.matches(&self.schema.bind(row), &self.refs),
            None => Ok(true),
        }
    }
}

impl Iterator for QueryRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.stream.as_mut()?.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => {
                    self.stream = None;
                    return Some(Err(e));
                }
                None => {
                    self.stream = None;
                    return None;
                }
            };

            match self.keep(&row) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    self.stream = None;
                    return Some(Err(e));
                }
            }

            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    // release the walker and snapshots now
                    self.stream = None;
                }
            }
            return Some(Ok(self.projection.iter().map(|&i| row[i].clone()).collect()));
        }
    }
}

impl std::iter::FusedIterator for QueryRows {}

/// Materialized query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of one output column
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))?;
        Some(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<serde_json::Map<_, _>>()
                    .into()
            })
            .collect()
    }
}
