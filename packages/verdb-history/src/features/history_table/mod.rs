//! `dolt_history_<table>`
//!
//! One row per (commit, stored row): the table's user columns followed by
//! `commit_hash`, `committer` and `commit_date`. Commits come in walk order
//! from the pinned head; rows within a commit in primary-key order.

mod table;

pub use table::{HistoryRows, HistoryTable, COMMITTER, COMMIT_DATE, COMMIT_HASH};
