/*
 * verdb-history - Temporal system tables over a versioned table store
 *
 * Feature-First Architecture:
 * - shared/      : Common models (VirtualSchema, Expr, QueryContext, row streams)
 * - features/    : Vertical slices (commit_walk → snapshot → diff → pushdown → tables)
 * - catalog/     : Table-provider seam for host engines
 * - query/       : Reference query host
 * - config/      : Engine configuration (YAML v1)
 *
 * Iteration is single-threaded and pull-based; HEAD is pinned once per query.
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (walker, loader, differ, planner, virtual tables)
pub mod features;

/// Table and schema provider traits
pub mod catalog;

/// Query host: catalog, planning, post-filtering
pub mod query;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use catalog::{ScanRequest, SchemaProvider, TableProvider, TemporalSchema};
pub use config::{ConfigError, EngineConfig};
pub use errors::{HistoryError, Result};
pub use features::commit_walk::{CommitWalker, WalkBound, WalkOrder};
pub use features::diff::{diff_snapshots, DiffEntry, DiffKind, DiffStats};
pub use features::diff_table::DiffTable;
pub use features::history_table::HistoryTable;
pub use features::log_table::LogTable;
pub use features::pushdown::{plan_commit_selection, CommitSelection};
pub use features::snapshot::{SnapshotLoader, TableSnapshot};
pub use query::{Catalog, Query, QueryEngine, QueryRows, ResultSet};
pub use shared::models::{Expr, ExprBuilder, QueryContext, RowStream, VirtualSchema};
