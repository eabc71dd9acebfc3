//! Storage errors
//!
//! A single error struct shared by every backend: a coarse [`ErrorKind`]
//! to match on, a message naming the object involved, and the backend
//! error underneath when there is one.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Commit, root or table object missing from the store
    NotFound,
    /// Unparsable or unresolvable commit reference
    InvalidRef,
    /// Schema or row rejected by validation
    InvalidSchema,
    /// SQLite failure
    Database,
    /// Stored JSON that does not decode
    Serialization,
    /// Object whose content no longer matches its hash
    Corrupt,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidRef => "invalid ref",
            ErrorKind::InvalidSchema => "invalid schema",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Corrupt => "corrupt object",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxedSource>,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the backend error this one was raised from
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// `what` names the object, e.g. `commit 3f2a...` or `head of branch 'x'`
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, what)
    }

    pub fn invalid_ref(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRef, message)
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSchema, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Corrupt, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        StorageError::database(message).with_source(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("stored object does not decode: {}", err);
        StorageError::serialization(message).with_source(err)
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_kind_and_object() {
        let err = StorageError::not_found("commit abc123");
        assert_eq!(err.to_string(), "not found: commit abc123");
        assert!(err.is_not_found());

        let err = StorageError::invalid_ref("'HEAD~x': unexpected character 'x'");
        assert_eq!(err.to_string(), "invalid ref: 'HEAD~x': unexpected character 'x'");
        assert!(err.source.is_none());
    }

    #[test]
    fn test_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file");
        let err = StorageError::database("cannot open repository").with_source(io_err);

        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("read-only file"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_from_rusqlite_error() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind, ErrorKind::Database);
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<Vec<i64>>("[1,").unwrap_err();
        let err = StorageError::from(json_err);
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.starts_with("stored object does not decode"));
    }
}
