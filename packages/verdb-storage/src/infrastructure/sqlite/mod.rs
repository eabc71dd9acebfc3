//! SQLite Commit Store
//!
//! File-based persistent storage of commits, refs and table roots.
//! Schemas and rows are stored as JSON; row order is kept through an
//! explicit ordinal column.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    Commit, CommitHash, CommitMeta, CommitStore, RepositoryObjects, RootHash, Row, TableHash,
    TableRoot, TableSchema,
};
use crate::error::{StorageError, StorageResult};

const CURRENT_BRANCH_KEY: &str = "current_branch";

/// SQLite-based CommitStore implementation
#[derive(Clone)]
pub struct SqliteCommitStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCommitStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock();

        // Commits table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS commits (
                hash TEXT PRIMARY KEY,
                parents TEXT NOT NULL,
                root_hash TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_email TEXT NOT NULL,
                committed_at TEXT NOT NULL,
                message TEXT NOT NULL
            )",
            [],
        )?;

        // Branches table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS branches (
                name TEXT PRIMARY KEY,
                head TEXT NOT NULL,
                FOREIGN KEY (head) REFERENCES commits(hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS repo_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        // Root value entries: one row per (root, table)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS root_tables (
                root_hash TEXT NOT NULL,
                table_name TEXT NOT NULL,
                table_hash TEXT NOT NULL,
                PRIMARY KEY (root_hash, table_name)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS table_schemas (
                table_hash TEXT PRIMARY KEY,
                schema_json TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS table_rows (
                table_hash TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                row_json TEXT NOT NULL,
                PRIMARY KEY (table_hash, ordinal)
            )",
            [],
        )?;

        Ok(())
    }

    /// Copy every object of another repository into this store.
    ///
    /// Objects are immutable, so existing rows are kept; branch heads and the
    /// current branch are overwritten. Commits whose hash does not match
    /// their content are rejected.
    pub fn import(&self, objects: &RepositoryObjects) -> StorageResult<()> {
        for commit in &objects.commits {
            if !commit.verify()? {
                return Err(StorageError::corrupt(format!(
                    "commit {} does not match its content",
                    commit.hash
                )));
            }
        }

        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;

        for (hash, table) in &objects.tables {
            tx.execute(
                "INSERT OR IGNORE INTO table_schemas (table_hash, schema_json) VALUES (?1, ?2)",
                params![hash.as_str(), serde_json::to_string(&table.schema)?],
            )?;
            for (ordinal, row) in table.rows.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO table_rows (table_hash, ordinal, row_json)
                     VALUES (?1, ?2, ?3)",
                    params![hash.as_str(), ordinal as i64, serde_json::to_string(row)?],
                )?;
            }
        }

        for (root_hash, root) in &objects.roots {
            for (name, table_hash) in &root.tables {
                tx.execute(
                    "INSERT OR IGNORE INTO root_tables (root_hash, table_name, table_hash)
                     VALUES (?1, ?2, ?3)",
                    params![root_hash.as_str(), name, table_hash.as_str()],
                )?;
            }
        }

        for commit in &objects.commits {
            tx.execute(
                "INSERT OR IGNORE INTO commits
                 (hash, parents, root_hash, author_name, author_email, committed_at, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    commit.hash.as_str(),
                    serde_json::to_string(&commit.parents)?,
                    commit.root.as_str(),
                    commit.meta.name,
                    commit.meta.email,
                    commit.meta.timestamp,
                    commit.meta.message,
                ],
            )?;
        }

        for (name, head) in &objects.branches {
            tx.execute(
                "INSERT OR REPLACE INTO branches (name, head) VALUES (?1, ?2)",
                params![name, head.as_str()],
            )?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO repo_state (key, value) VALUES (?1, ?2)",
            params![CURRENT_BRANCH_KEY, objects.current_branch],
        )?;

        tx.commit()?;
        debug!(
            commits = objects.commits.len(),
            tables = objects.tables.len(),
            "imported repository objects"
        );
        Ok(())
    }

    fn root_hash_of(conn: &Connection, commit: &CommitHash) -> StorageResult<RootHash> {
        conn.query_row(
            "SELECT root_hash FROM commits WHERE hash = ?1",
            params![commit.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .map(RootHash::new)
        .ok_or_else(|| StorageError::not_found(format!("commit {}", commit)))
    }

    fn table_hash_of(
        conn: &Connection,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<TableHash>> {
        let root = Self::root_hash_of(conn, commit)?;
        let hash = conn
            .query_row(
                "SELECT table_hash FROM root_tables WHERE root_hash = ?1 AND table_name = ?2",
                params![root.as_str(), table],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(hash.map(TableHash::new))
    }

    fn load_schema(conn: &Connection, hash: &TableHash) -> StorageResult<TableSchema> {
        let json: String = conn
            .query_row(
                "SELECT schema_json FROM table_schemas WHERE table_hash = ?1",
                params![hash.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::corrupt(format!("missing schema for table {}", hash)))?;
        let schema: TableSchema = serde_json::from_str(&json)?;
        schema.validate()?;
        Ok(schema)
    }
}

impl CommitStore for SqliteCommitStore {
    fn current_branch(&self) -> StorageResult<String> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM repo_state WHERE key = ?1",
            params![CURRENT_BRANCH_KEY],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("current branch"))
    }

    fn branch_head(&self, branch: &str) -> StorageResult<Option<CommitHash>> {
        let conn = self.conn.lock();
        let head = conn
            .query_row(
                "SELECT head FROM branches WHERE name = ?1",
                params![branch],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(head.map(CommitHash::new))
    }

    fn contains_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commits WHERE hash = ?1",
            params![hash.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn read_commit(&self, hash: &CommitHash) -> StorageResult<Commit> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT parents, root_hash, author_name, author_email, committed_at, message
                 FROM commits WHERE hash = ?1",
                params![hash.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, DateTime<Utc>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found(format!("commit {}", hash)))?;

        let (parents, root, name, email, timestamp, message) = raw;
        Ok(Commit {
            hash: hash.clone(),
            parents: serde_json::from_str(&parents)?,
            root: RootHash::new(root),
            meta: CommitMeta {
                name,
                email,
                timestamp,
                message,
            },
        })
    }

    fn read_table_root(
        &self,
        commit: &CommitHash,
        table: &str,
    ) -> StorageResult<Option<Arc<TableRoot>>> {
        let conn = self.conn.lock();
        let Some(hash) = Self::table_hash_of(&conn, commit, table)? else {
            return Ok(None);
        };
        let schema = Self::load_schema(&conn, &hash)?;

        let mut stmt = conn.prepare(
            "SELECT row_json FROM table_rows WHERE table_hash = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map(params![hash.as_str()], |row| row.get::<_, String>(0))?
            .enumerate()
            .map(|(ordinal, json)| -> StorageResult<Row> {
                let row: Row = serde_json::from_str(&json?)?;
                schema.validate_row(&row).map_err(|e| {
                    StorageError::corrupt(format!(
                        "corrupt row {} of table '{}' at commit {}: {}",
                        ordinal, table, commit, e.message
                    ))
                })?;
                Ok(row)
            })
            .collect::<StorageResult<Vec<Row>>>()?;

        Ok(Some(Arc::new(TableRoot { schema, rows })))
    }

    fn table_schema(&self, commit: &CommitHash, table: &str) -> StorageResult<Option<TableSchema>> {
        let conn = self.conn.lock();
        match Self::table_hash_of(&conn, commit, table)? {
            Some(hash) => Self::load_schema(&conn, &hash).map(Some),
            None => Ok(None),
        }
    }
}
