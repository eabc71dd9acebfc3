//! Predicate Pushdown Planner
//!
//! Turns a filter over a temporal table into the set of commits whose
//! snapshots can contribute rows. The result only narrows the commit walk;
//! the host still applies the full filter to every produced row.

mod planner;
mod selection;

pub use planner::{plan_commit_selection, plan_walk};
pub use selection::CommitSelection;
