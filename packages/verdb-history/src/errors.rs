//! Error types for the temporal tables

use thiserror::Error;
use verdb_storage::{CommitHash, ErrorKind, StorageError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reference could not be parsed or resolved
    #[error("Invalid reference '{spec}': {reason}")]
    InvalidRef { spec: String, reason: String },

    /// Table exists at no commit reachable from the pinned head
    #[error("Table not found: {0}")]
    UnknownTable(String),

    /// Storage failure while loading one table at one commit
    #[error("Failed to read table '{table}' at commit {commit}: {source}")]
    StorageRead {
        commit: CommitHash,
        table: String,
        #[source]
        source: StorageError,
    },

    /// Storage failure outside of a table read (refs, commits)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Two snapshots of one table disagree on columns
    #[error("Schema of table '{table}' differs between {from} and {to}")]
    SchemaMismatch {
        table: String,
        from: String,
        to: String,
    },

    #[error("Unknown column '{column}' in '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Expression evaluation on incompatible values
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Query deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

impl HistoryError {
    /// Map a storage error raised while resolving `spec`.
    /// Unknown refs and missing ancestors become `InvalidRef`.
    pub fn resolving(spec: &str, err: StorageError) -> Self {
        match err.kind {
            ErrorKind::InvalidRef | ErrorKind::NotFound => HistoryError::InvalidRef {
                spec: spec.to_string(),
                reason: err.message,
            },
            _ => HistoryError::Storage(err),
        }
    }

    pub fn storage_read(commit: &CommitHash, table: &str, source: StorageError) -> Self {
        HistoryError::StorageRead {
            commit: commit.clone(),
            table: table.to_string(),
            source,
        }
    }

    /// Errors that mean the caller stopped the query
    pub fn is_interrupt(&self) -> bool {
        matches!(self, HistoryError::Cancelled | HistoryError::DeadlineExceeded)
    }
}
