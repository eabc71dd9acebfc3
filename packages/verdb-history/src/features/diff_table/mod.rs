//! `dolt_diff_<table>`
//!
//! One row per changed key between a commit and its first parent, in walk
//! order, or between one explicit pair of refs. Columns: `to_<col>...`,
//! `from_<col>...`, `to_commit_hash`, `from_commit_hash`, `to_commit_date`,
//! `from_commit_date`, `diff_type`. The root commit is diffed against an
//! empty table; its `from_commit_*` columns are NULL.

mod table;

pub use table::{
    DiffRows, DiffTable, DIFF_TYPE, FROM_COMMIT_DATE, FROM_COMMIT_HASH, FROM_PREFIX, TO_COMMIT_DATE,
    TO_COMMIT_HASH, TO_PREFIX,
};
