//! Engine configuration and its YAML v1 file format

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use crate::features::commit_walk::WalkOrder;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

const MAX_CACHE_CAPACITY: usize = 4096;

/// Tunables for the temporal tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Snapshots kept per query (LRU)
    pub snapshot_cache_capacity: usize,

    /// Commit enumeration order for history, diff and log tables
    pub walk_order: WalkOrder,

    /// Narrow commit walks from commit-hash filters
    pub pushdown: bool,

    pub history_prefix: String,
    pub diff_prefix: String,
    pub log_table: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_cache_capacity: 64,
            walk_order: WalkOrder::FirstParent,
            pushdown: true,
            history_prefix: "dolt_history_".to_string(),
            diff_prefix: "dolt_diff_".to_string(),
            log_table: "dolt_log".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn snapshot_cache_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_cache_capacity = capacity;
        self
    }

    pub fn walk_order(mut self, order: WalkOrder) -> Self {
        self.walk_order = order;
        self
    }

    pub fn pushdown(mut self, enabled: bool) -> Self {
        self.pushdown = enabled;
        self
    }

    pub fn history_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.history_prefix = prefix.into();
        self
    }

    pub fn diff_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.diff_prefix = prefix.into();
        self
    }

    pub fn log_table(mut self, name: impl Into<String>) -> Self {
        self.log_table = name.into();
        self
    }

    /// Cache capacity as the LRU wants it
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.snapshot_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.snapshot_cache_capacity == 0 || self.snapshot_cache_capacity > MAX_CACHE_CAPACITY {
            return Err(ConfigError::range(
                "snapshot_cache_capacity",
                self.snapshot_cache_capacity,
                MAX_CACHE_CAPACITY,
                "diff scans need at least one cached snapshot",
            ));
        }

        for (field, value) in [
            ("history_prefix", &self.history_prefix),
            ("diff_prefix", &self.diff_prefix),
            ("log_table", &self.log_table),
        ] {
            if value.is_empty()
                || !value
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(ConfigError::table_name(
                    field,
                    value.as_str(),
                    "use lowercase letters, digits and '_'",
                ));
            }
        }

        if self.history_prefix.starts_with(&self.diff_prefix)
            || self.diff_prefix.starts_with(&self.history_prefix)
        {
            return Err(ConfigError::table_name(
                "diff_prefix",
                self.diff_prefix.as_str(),
                "history and diff prefixes must not overlap",
            ));
        }

        Ok(())
    }

    /// Load and validate a YAML v1 file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        // Version check
        if !SUPPORTED_VERSIONS.contains(&file.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: file.version,
                supported: SUPPORTED_VERSIONS,
            });
        }

        file.engine.validate()?;
        Ok(file.engine)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: 1,
            engine: self.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    #[serde(default)]
    pub engine: EngineConfig,
}
