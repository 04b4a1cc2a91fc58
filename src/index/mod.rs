//! Secondary index management
//!
//! Optional B-tree indexes over the `key` and `val` columns of `mappings`.
//! They trade disk space and load speed for lookup speed and never affect
//! correctness. Creation is idempotent; dropping an index that does not
//! exist is an explicit error, not a silent no-op.

use crate::store::{Store, StoreError, StoreResult};
use rusqlite::{params, OptionalExtension};

/// Indexable columns of the `mappings` relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexColumn {
    Key,
    Val,
}

impl IndexColumn {
    /// The `mappings` column this index covers
    pub fn column(self) -> &'static str {
        match self {
            IndexColumn::Key => "key",
            IndexColumn::Val => "val",
        }
    }

    /// Name of the index in the schema
    pub fn index_name(self) -> &'static str {
        match self {
            IndexColumn::Key => "fast_key_index",
            IndexColumn::Val => "fast_val_index",
        }
    }
}

/// Create the index for `column`; no-op if already present.
pub fn create_index(store: &Store, column: IndexColumn) -> StoreResult<()> {
    let sql = format!(
        "CREATE INDEX IF NOT EXISTS {} ON mappings({})",
        column.index_name(),
        column.column()
    );
    store.conn().execute(&sql, [])?;

    tracing::info!(index = column.index_name(), "index created");
    Ok(())
}

/// Drop the index for `column`; fails when it does not exist.
pub fn drop_index(store: &Store, column: IndexColumn) -> StoreResult<()> {
    if !index_exists(store, column)? {
        return Err(StoreError::IndexNotFound(column.index_name().to_string()));
    }

    store
        .conn()
        .execute(&format!("DROP INDEX {}", column.index_name()), [])?;

    tracing::info!(index = column.index_name(), "index dropped");
    Ok(())
}

/// Whether the index for `column` is present in the schema
pub fn index_exists(store: &Store, column: IndexColumn) -> StoreResult<bool> {
    let found: Option<String> = store
        .conn()
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?",
            params![column.index_name()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}
