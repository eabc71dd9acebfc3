//! Configuration errors
//!
//! Every validation failure names the offending field and carries a hint
//! that is printed verbatim by the CLI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Numeric setting outside `1..=max`
    #[error("{field} = {value} is outside 1..={max}: {hint}")]
    Range {
        field: &'static str,
        value: usize,
        max: usize,
        hint: &'static str,
    },

    /// Table name or prefix the catalog could not dispatch on
    #[error("{field} = {value:?} is not a usable table name: {hint}")]
    TableName {
        field: &'static str,
        value: String,
        hint: &'static str,
    },

    #[error("config version {found} is not supported (expected one of {supported:?})")]
    UnsupportedVersion {
        found: u32,
        supported: &'static [u32],
    },

    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn range(field: &'static str, value: usize, max: usize, hint: &'static str) -> Self {
        Self::Range {
            field,
            value,
            max,
            hint,
        }
    }

    pub fn table_name(field: &'static str, value: impl Into<String>, hint: &'static str) -> Self {
        Self::TableName {
            field,
            value: value.into(),
            hint,
        }
    }

    /// Name of the setting at fault, if the error is about one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Range { field, .. } | Self::TableName { field, .. } => Some(field),
            _ => None,
        }
    }
}
