//! Vertical feature slices
//!
//! Leaves first: `commit_walk` → `snapshot` → `diff` → `pushdown`, then
//! the three virtual tables built on them.

pub mod commit_walk;
pub mod diff;
pub mod diff_table;
pub mod history_table;
pub mod log_table;
pub mod pushdown;
pub mod snapshot;
