//! Table-provider seam between the temporal tables and a host engine
//!
//! A host registers [`SchemaProvider`]s and asks them for tables by name;
//! each table is a [`TableProvider`] exposing a schema and a row stream.

mod provider;
mod temporal;

pub use provider::{ScanRequest, SchemaProvider, TableProvider};
pub use temporal::TemporalSchema;
