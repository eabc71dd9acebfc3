//! `dolt_log`: one row per commit reachable from the pinned head

mod table;

pub use table::{LogRows, LogTable, DATE, EMAIL, MESSAGE};
