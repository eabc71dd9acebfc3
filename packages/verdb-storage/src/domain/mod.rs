//! Domain layer - Core business models and ports

pub mod models;
pub mod ports;
pub mod refspec;
pub mod schema;
pub mod value;

pub use models::{
    compute_content_hash, Commit, CommitHash, CommitMeta, RepositoryObjects, RootHash, RootValue,
    TableData, TableHash, TableRoot, HASH_LEN,
};
pub use ports::CommitStore;
pub use refspec::{resolve_ref, Ancestry, RefSpec};
pub use schema::{Column, ColumnType, TableSchema};
pub use value::{Key, Row, Value};
