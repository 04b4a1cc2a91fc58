//! Persistent store
//!
//! Owns the SQLite connection and the two durable relations:
//!
//! - **sources**: `(id, src UNIQUE)` - registered origins of loaded data
//! - **mappings**: `(id, src_id -> sources, key, val)` - normalized records,
//!   deleted by cascade when their source is purged
//!
//! The connection is opened exactly once by the command dispatcher and passed
//! by reference to every component that needs it; nothing else owns the
//! open/close lifecycle. All staged-record batches are committed as single
//! transactions, so an interrupted run leaves the store at the last committed
//! batch boundary.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod error;

pub use error::{StoreError, StoreResult};

/// Schema bootstrap, idempotent across invocations
const BOOTSTRAP: &str = "
    CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY NOT NULL,
        src TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS mappings (
        id INTEGER PRIMARY KEY NOT NULL,
        src_id INTEGER NOT NULL,
        key TEXT NOT NULL,
        val TEXT NOT NULL,
        FOREIGN KEY (src_id) REFERENCES sources(id) ON DELETE CASCADE
    );
";

/// One record staged for insertion into `mappings`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMapping {
    pub src_id: i64,
    pub key: String,
    pub val: String,
}

/// Handle to the durable SQLite store
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open (creating if absent) the store at `path` and bootstrap the schema
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_connection(conn, path.to_path_buf())
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            error: e.to_string(),
        })?;

        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> StoreResult<Self> {
        // Foreign keys must be enabled per connection; purge relies on the
        // ON DELETE CASCADE from mappings to sources.
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA encoding = 'UTF-8';
            ",
        )?;

        conn.execute_batch(BOOTSTRAP)?;

        Ok(Self { conn, path })
    }

    // ==================== Source Registry ====================

    /// Get-or-create the integer handle for a source identifier.
    ///
    /// Repeated calls with the same identifier return the same handle and
    /// create exactly one row. The insert-then-reselect pair is not a single
    /// atomic unit: a concurrent writer registering the same new identifier
    /// can interleave, but `INSERT OR IGNORE` makes the lost race harmless
    /// and both callers converge on the same row via the reselect.
    pub fn source_id(&self, identifier: &str) -> StoreResult<i64> {
        const LOOKUP: &str = "SELECT id FROM sources WHERE src = ? LIMIT 1";

        let existing: Option<i64> = self
            .conn
            .query_row(LOOKUP, params![identifier], |row| row.get(0))
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO sources(src) VALUES (?)",
            params![identifier],
        )?;

        // Reselect as the source of truth, whoever won the insert
        let id = self
            .conn
            .query_row(LOOKUP, params![identifier], |row| row.get(0))?;

        Ok(id)
    }

    /// List all registered sources as (id, identifier)
    pub fn sources(&self) -> StoreResult<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare("SELECT id, src FROM sources")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==================== Bulk Insert ====================

    /// Copy a batch of staged records into `mappings` as one transaction.
    ///
    /// Either every record in the batch becomes durable or none does; a
    /// constraint violation rolls the whole batch back and is surfaced to
    /// the caller. Empty batches are a no-op.
    pub fn insert_mappings(&mut self, records: &[StagedMapping]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO mappings(src_id, key, val) VALUES (?, ?, ?)")?;
            for record in records {
                stmt.execute(params![record.src_id, record.key, record.val])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// Count of persisted mappings (used by tests and diagnostics)
    pub fn mapping_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mappings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Direct connection access for the query and index layers
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
