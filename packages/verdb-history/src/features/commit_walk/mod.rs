//! Commit Graph Walker
//!
//! Enumerates commits reachable from a start commit, most recent first.
//! `FirstParent` follows only first parents (history order);
//! `AllAncestors` visits every reachable commit by timestamp.
//!
//! A walk can be bounded by a commit set or a count, and stops as soon as
//! the bound is met instead of reaching the root.

mod walker;

pub use walker::{CommitWalker, WalkBound, WalkOrder};
