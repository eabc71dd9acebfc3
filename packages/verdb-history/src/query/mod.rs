//! Reference query host
//!
//! Plays the embedding engine's part: resolves a table through the
//! registered providers, pins `HEAD`, folds constants, scans, applies the
//! full filter to every row, projects and limits. There is no SQL parser;
//! queries are built as values.

mod catalog;
mod engine;
mod statement;

pub use catalog::Catalog;
pub use engine::{QueryEngine, QueryRows, ResultSet};
pub use statement::Query;
