//! Engine configuration
//!
//! Defaults work out of the box; a YAML file (schema `version: 1`) can
//! override any field.
//!
//! ```yaml
//! version: 1
//! engine:
//!   snapshot_cache_capacity: 128
//!   walk_order: all_ancestors
//!   pushdown: true
//! ```

pub mod engine_config;
pub mod error;

pub use engine_config::{ConfigFileV1, EngineConfig, SUPPORTED_VERSIONS};
pub use error::{ConfigError, ConfigResult};
