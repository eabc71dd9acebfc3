//! Common test utilities for verdb-history
//!
//! Fixture repositories, wrapping stores for fault injection and
//! row-set assertions shared by the integration tests.

#![allow(dead_code)]

mod assertions;
mod fixtures;
mod stores;

pub use assertions::*;
pub use fixtures::*;
pub use stores::*;
