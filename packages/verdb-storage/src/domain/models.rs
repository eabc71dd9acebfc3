//! Storage Domain Models
//!
//! Content-addressed objects:
//! - `TableRoot`: one table's schema and rows, addressed by `TableHash`
//! - `RootValue`: table name -> table hash, addressed by `RootHash`
//! - `Commit`: parents + root + metadata, addressed by `CommitHash`
//!
//! Identical content always hashes to the same identifier, so unchanged
//! tables are shared between commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use super::schema::TableSchema;
use super::value::{Key, Row};
use crate::error::StorageResult;

/// Length of every object identifier (hex chars)
pub const HASH_LEN: usize = 32;

macro_rules! object_hash {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a string without checking its shape
            pub fn new(hash: impl Into<String>) -> Self {
                Self(hash.into())
            }

            /// Accept only well-formed identifiers (lowercased)
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                if s.len() == HASH_LEN && s.chars().all(|c| c.is_ascii_hexdigit()) {
                    Some(Self(s.to_ascii_lowercase()))
                } else {
                    None
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for String {
            fn from(h: $name) -> String {
                h.0
            }
        }
    };
}

object_hash!(
    /// Commit identifier
    CommitHash
);
object_hash!(
    /// Root value identifier
    RootHash
);
object_hash!(
    /// Table root identifier
    TableHash
);

/// SHA256 of the canonical JSON encoding, hex, truncated to `HASH_LEN`
pub fn compute_content_hash<T: Serialize + ?Sized>(value: &T) -> StorageResult<String> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(HASH_LEN);
    Ok(hex)
}

/// One table's state: schema plus rows.
///
/// Rows written by the repositories in this crate are key-ordered, but
/// readers must not rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRoot {
    pub schema: TableSchema,
    pub rows: Vec<Row>,
}

impl TableRoot {
    pub fn content_hash(&self) -> StorageResult<TableHash> {
        compute_content_hash(self).map(TableHash)
    }

    /// Whether rows are strictly ascending by primary key
    pub fn is_key_ordered(&self) -> bool {
        let keys: Vec<Key> = self.rows.iter().map(|r| self.schema.key_of(r)).collect();
        keys.windows(2).all(|w| w[0] < w[1])
    }
}

/// Mutable working copy of a table, keyed by primary key
#[derive(Debug, Clone)]
pub struct TableData {
    pub schema: TableSchema,
    pub rows: BTreeMap<Key, Row>,
}

impl TableData {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_root(root: &TableRoot) -> Self {
        let rows = root
            .rows
            .iter()
            .map(|r| (root.schema.key_of(r), r.clone()))
            .collect();
        Self {
            schema: root.schema.clone(),
            rows,
        }
    }

    pub fn to_root(&self) -> TableRoot {
        TableRoot {
            schema: self.schema.clone(),
            rows: self.rows.values().cloned().collect(),
        }
    }
}

/// Whole-repository state at a commit: table name -> table hash
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootValue {
    pub tables: BTreeMap<String, TableHash>,
}

impl RootValue {
    pub fn content_hash(&self) -> StorageResult<RootHash> {
        compute_content_hash(self).map(RootHash)
    }

    pub fn table(&self, name: &str) -> Option<&TableHash> {
        self.tables.get(name)
    }
}

/// Commit metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl CommitMeta {
    /// Metadata stamped with the current time
    pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Serialize)]
struct CommitBody<'a> {
    parents: &'a [CommitHash],
    root: &'a RootHash,
    meta: &'a CommitMeta,
}

/// Immutable commit node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: CommitHash,
    pub parents: Vec<CommitHash>,
    pub root: RootHash,
    pub meta: CommitMeta,
}

impl Commit {
    pub fn new(parents: Vec<CommitHash>, root: RootHash, meta: CommitMeta) -> StorageResult<Self> {
        let hash = Self::compute_hash(&parents, &root, &meta)?;
        Ok(Self {
            hash,
            parents,
            root,
            meta,
        })
    }

    pub fn compute_hash(
        parents: &[CommitHash],
        root: &RootHash,
        meta: &CommitMeta,
    ) -> StorageResult<CommitHash> {
        compute_content_hash(&CommitBody { parents, root, meta }).map(CommitHash)
    }

    /// Recompute the hash and compare with the stored one
    pub fn verify(&self) -> StorageResult<bool> {
        Ok(Self::compute_hash(&self.parents, &self.root, &self.meta)? == self.hash)
    }

    pub fn first_parent(&self) -> Option<&CommitHash> {
        self.parents.first()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Every object reachable in a repository, used to copy between stores
#[derive(Debug, Clone, Default)]
pub struct RepositoryObjects {
    pub commits: Vec<Commit>,
    pub roots: Vec<(RootHash, RootValue)>,
    pub tables: Vec<(TableHash, TableRoot)>,
    pub branches: BTreeMap<String, CommitHash>,
    pub current_branch: String,
}
