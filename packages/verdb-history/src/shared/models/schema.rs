//! Virtual table schemas

use serde::{Deserialize, Serialize};
use verdb_storage::{ColumnType, Row, TableSchema, Value};

use super::expression::ColumnSource;

/// One output column of a virtual table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }
}

/// Column list of a virtual table, fixed at plan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSchema {
    table: String,
    columns: Vec<ColumnDef>,
}

impl VirtualSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// User columns of a stored table, optionally renamed with a prefix
    pub fn user_columns(schema: &TableSchema, prefix: &str, force_nullable: bool) -> Vec<ColumnDef> {
        schema
            .columns()
            .iter()
            .map(|c| {
                ColumnDef::new(
                    format!("{}{}", prefix, c.name),
                    c.ty,
                    force_nullable || c.nullable,
                )
            })
            .collect()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Case-insensitive lookup
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn bind<'a>(&'a self, row: &'a Row) -> RowView<'a> {
        RowView { schema: self, row }
    }
}

/// A row seen through its schema, for expression evaluation
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a VirtualSchema,
    row: &'a Row,
}

impl ColumnSource for RowView<'_> {
    fn source_name(&self) -> &str {
        self.schema.table()
    }

    fn value_of(&self, column: &str) -> Option<&Value> {
        self.schema.index_of(column).and_then(|i| self.row.get(i))
    }
}
