use std::sync::Arc;
use verdb_storage::{CommitHash, Key, Row, TableRoot, TableSchema};

/// Same column names and types, in the same order
pub fn schemas_compatible(a: &TableSchema, b: &TableSchema) -> bool {
    a.len() == b.len()
        && a
            .columns()
            .iter()
            .zip(b.columns())
            .all(|(x, y)| x.name.eq_ignore_ascii_case(&y.name) && x.ty == y.ty)
}

/// One table's rows at one commit, ordered by primary key.
///
/// Cloning is cheap; rows are shared.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    commit: Option<CommitHash>,
    schema: Option<Arc<TableSchema>>,
    rows: Arc<Vec<(Key, Row)>>,
}

impl TableSnapshot {
    /// No table: the synthetic parent of a root commit, or a commit
    /// where the table does not exist
    pub fn empty(commit: Option<CommitHash>) -> Self {
        Self {
            commit,
            schema: None,
            rows: Arc::new(Vec::new()),
        }
    }

    /// Build from a stored table root, sorting if storage did not keep
    /// key order
    pub fn from_root(commit: CommitHash, root: &TableRoot) -> Self {
        let mut rows: Vec<(Key, Row)> = root
            .rows
            .iter()
            .map(|r| (root.schema.key_of(r), r.clone()))
            .collect();
        if !rows.windows(2).all(|w| w[0].0 < w[1].0) {
            rows.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Self {
            commit: Some(commit),
            schema: Some(Arc::new(root.schema.clone())),
            rows: Arc::new(rows),
        }
    }

    pub fn commit(&self) -> Option<&CommitHash> {
        self.commit.as_ref()
    }

    /// `None` when the table is absent
    pub fn schema(&self) -> Option<&Arc<TableSchema>> {
        self.schema.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.schema.is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&(Key, Row)> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, Row)> {
        self.rows.iter()
    }

    /// Absent tables are compatible with any schema
    pub fn is_compatible_with(&self, schema: &TableSchema) -> bool {
        self.schema
            .as_deref()
            .map_or(true, |own| schemas_compatible(own, schema))
    }

    /// Label used in error messages
    pub fn label(&self) -> String {
        self.commit
            .as_ref()
            .map_or_else(|| "<empty>".to_string(), |c| c.to_string())
    }
}
