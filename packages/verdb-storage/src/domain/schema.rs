//! Table schemas

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::value::{Key, Row, Value};
use crate::error::{StorageError, StorageResult};

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytes",
            ColumnType::Timestamp => "timestamp",
        }
    }

    /// Whether a value can be stored in a column of this type.
    /// `NULL` is accepted here; nullability is checked by the schema.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Bool, Value::Bool(_))
                | (ColumnType::Int, Value::Int(_))
                | (ColumnType::Float, Value::Float(_))
                | (ColumnType::Float, Value::Int(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Bytes, Value::Bytes(_))
                | (ColumnType::Timestamp, Value::Timestamp(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Nullable, non-key column
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            nullable: true,
        }
    }

    /// Mark as part of the primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Ordered column list with at least one primary-key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> StorageResult<Self> {
        let schema = Self { columns };
        schema.validate()?;
        Ok(schema)
    }

    /// Re-check invariants, e.g. after deserializing
    pub fn validate(&self) -> StorageResult<()> {
        if self.columns.is_empty() {
            return Err(StorageError::invalid_schema("schema has no columns"));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(StorageError::invalid_schema(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if column.primary_key && column.nullable {
                return Err(StorageError::invalid_schema(format!(
                    "primary key column '{}' must be NOT NULL",
                    column.name
                )));
            }
        }

        if !self.columns.iter().any(|c| c.primary_key) {
            return Err(StorageError::invalid_schema("schema has no primary key"));
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Extract the primary-key tuple of a row
    pub fn key_of(&self, row: &Row) -> Key {
        self.columns
            .iter()
            .zip(row.iter())
            .filter(|(c, _)| c.primary_key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn validate_row(&self, row: &Row) -> StorageResult<()> {
        if row.len() != self.columns.len() {
            return Err(StorageError::invalid_schema(format!(
                "row has {} values, schema has {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        for (column, value) in self.columns.iter().zip(row.iter()) {
            if value.is_null() && !column.nullable {
                return Err(StorageError::invalid_schema(format!(
                    "column '{}' is NOT NULL",
                    column.name
                )));
            }
            if let Value::Float(f) = value {
                if !f.is_finite() {
                    return Err(StorageError::invalid_schema(format!(
                        "column '{}' cannot store non-finite float {}",
                        column.name, f
                    )));
                }
            }
            if !column.ty.accepts(value) {
                return Err(StorageError::invalid_schema(format!(
                    "column '{}' expects {}, got {}",
                    column.name,
                    column.ty,
                    value.type_name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn pk_c0() -> TableSchema {
        TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("c0", ColumnType::Int),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_requires_primary_key() {
        let err = TableSchema::new(vec![Column::new("c0", ColumnType::Int)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_schema_rejects_duplicate_columns() {
        let err = TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("PK", ColumnType::Text),
        ])
        .unwrap_err();
        assert!(err.message.contains("duplicate column"));
    }

    #[test]
    fn test_key_of_and_lookup() {
        let schema = pk_c0();
        let row = vec![Value::Int(4), Value::Int(40)];
        assert_eq!(schema.key_of(&row), vec![Value::Int(4)]);
        assert_eq!(schema.column_index("C0"), Some(1));
        assert_eq!(schema.primary_key_indices(), vec![0]);
    }

    #[test]
    fn test_validate_row() {
        let schema = pk_c0();
        assert!(schema.validate_row(&vec![Value::Int(1), Value::Null]).is_ok());
        assert!(schema.validate_row(&vec![Value::Null, Value::Int(1)]).is_err());
        assert!(schema
            .validate_row(&vec![Value::Int(1), Value::Text("x".into())])
            .is_err());
        assert!(schema.validate_row(&vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn test_validate_row_rejects_non_finite_floats() {
        let schema = TableSchema::new(vec![
            Column::new("pk", ColumnType::Int).primary_key(),
            Column::new("ratio", ColumnType::Float),
        ])
        .unwrap();
        assert!(schema.validate_row(&vec![Value::Int(1), Value::Float(0.5)]).is_ok());
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = schema
                .validate_row(&vec![Value::Int(1), Value::Float(bad)])
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidSchema);
            assert!(err.message.contains("non-finite"));
        }
    }

    #[test]
    fn test_float_column_accepts_int() {
        assert!(ColumnType::Float.accepts(&Value::Int(1)));
        assert!(!ColumnType::Int.accepts(&Value::Float(1.0)));
    }
}
