//! Snapshot Differ
//!
//! Merge-walks two key-ordered snapshots and classifies each primary key
//! as added, removed or modified. Keys with identical rows on both sides
//! produce nothing.

mod differ;
mod entry;

pub use differ::{diff_snapshots, SnapshotDiff};
pub use entry::{DiffEntry, DiffKind, DiffStats};
