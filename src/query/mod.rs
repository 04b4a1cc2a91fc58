//! Match-set query layer
//!
//! Every query invocation builds an ephemeral term set and executes one
//! set-membership read (or delete) against the store:
//!
//! - **key lookup**: distinct (key, val\[, src_id\]) rows whose key is in
//!   the set; key terms are trimmed and lowercased, so matching is
//!   case-insensitive against the normalized keys
//! - **value lookup**: distinct rows whose value is in the set; values are
//!   stored verbatim, so matching is case-sensitive
//! - **dump**: all (key, val) rows owned by the named sources
//! - **purge**: delete the named sources, cascading to their mappings
//!
//! The set lives in a TEMP table scoped to the connection and is recreated
//! per operation; it never touches durable state. Row output is CSV with
//! standard quoting, one record per line.

use crate::store::{Store, StoreResult};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

/// Ephemeral set of query terms; duplicates collapse, insertion order is
/// irrelevant.
#[derive(Debug, Default)]
pub struct MatchSet {
    terms: BTreeSet<String>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key term: trimmed and lowercased to match normalized keys
    pub fn add_key_term(&mut self, term: &str) {
        self.terms.insert(term.trim().to_lowercase());
    }

    /// Add a value or source term: trimmed only, case preserved
    pub fn add_term(&mut self, term: &str) {
        self.terms.insert(term.trim().to_string());
    }

    /// Read key terms, one per line, from a reader
    pub fn add_key_terms_from(&mut self, reader: impl BufRead) -> std::io::Result<()> {
        for line in reader.lines() {
            self.add_key_term(&line?);
        }
        Ok(())
    }

    /// Read value terms, one per line, from a reader
    pub fn add_terms_from(&mut self, reader: impl BufRead) -> std::io::Result<()> {
        for line in reader.lines() {
            self.add_term(&line?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One row produced by a lookup or dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub key: String,
    pub val: String,
    /// Present only for key lookups requesting the source column
    pub src_id: Option<i64>,
}

/// Recreate the scratch table and stage the set's terms into it
fn stage_terms(store: &Store, set: &MatchSet) -> StoreResult<()> {
    let conn = store.conn();
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS temp.match_set;
        CREATE TEMP TABLE match_set (term TEXT NOT NULL UNIQUE);
        ",
    )?;

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO match_set(term) VALUES (?)")?;
    for term in &set.terms {
        stmt.execute([term])?;
    }

    Ok(())
}

/// Distinct rows whose key is in the set
pub fn lookup_keys(
    store: &Store,
    set: &MatchSet,
    with_source: bool,
) -> StoreResult<Vec<MappingRow>> {
    stage_terms(store, set)?;

    let sql = if with_source {
        "SELECT DISTINCT key, val, src_id FROM mappings
         WHERE key IN (SELECT term FROM match_set)"
    } else {
        "SELECT DISTINCT key, val FROM mappings
         WHERE key IN (SELECT term FROM match_set)"
    };

    let mut stmt = store.conn().prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MappingRow {
                key: row.get(0)?,
                val: row.get(1)?,
                src_id: if with_source { Some(row.get(2)?) } else { None },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Distinct rows whose value is in the set (case-sensitive)
pub fn lookup_values(store: &Store, set: &MatchSet) -> StoreResult<Vec<MappingRow>> {
    stage_terms(store, set)?;

    let mut stmt = store.conn().prepare(
        "SELECT DISTINCT key, val FROM mappings
         WHERE val IN (SELECT term FROM match_set)",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MappingRow {
                key: row.get(0)?,
                val: row.get(1)?,
                src_id: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// All (key, val) rows owned by the sources named in the set
pub fn dump_sources(store: &Store, set: &MatchSet) -> StoreResult<Vec<MappingRow>> {
    stage_terms(store, set)?;

    let mut stmt = store.conn().prepare(
        "SELECT key, val FROM mappings
         WHERE src_id IN (
             SELECT id FROM sources WHERE src IN (SELECT term FROM match_set)
         )",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MappingRow {
                key: row.get(0)?,
                val: row.get(1)?,
                src_id: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Delete the sources named in the set; their mappings go with them via the
/// foreign-key cascade. Returns the number of source rows deleted.
pub fn purge_sources(store: &Store, set: &MatchSet) -> StoreResult<usize> {
    stage_terms(store, set)?;

    let deleted = store.conn().execute(
        "DELETE FROM sources WHERE src IN (SELECT term FROM match_set)",
        [],
    )?;

    tracing::info!(sources = deleted, "purged");
    Ok(deleted)
}

// ==================== Row Output ====================

/// Write lookup/dump rows as CSV, one record per line
pub fn write_rows<W: Write>(out: W, rows: &[MappingRow]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    for row in rows {
        match row.src_id {
            Some(src_id) => {
                writer.write_record([&row.key, &row.val, &src_id.to_string()])?
            }
            None => writer.write_record([&row.key, &row.val])?,
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write the sources listing as CSV
pub fn write_sources<W: Write>(out: W, sources: &[(i64, String)]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    for (id, src) in sources {
        writer.write_record([&id.to_string(), src])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StagedMapping;

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.source_id("feed-a.txt").unwrap();
        let b = store.source_id("feed-b.txt").unwrap();

        store
            .insert_mappings(&[
                StagedMapping {
                    src_id: a,
                    key: "foo@bar.com".to_string(),
                    val: "Secret".to_string(),
                },
                StagedMapping {
                    src_id: a,
                    key: "alice@example.com".to_string(),
                    val: "hunter2".to_string(),
                },
                StagedMapping {
                    src_id: b,
                    key: "foo@bar.com".to_string(),
                    val: "Secret".to_string(),
                },
                StagedMapping {
                    src_id: b,
                    key: "bob@example.net".to_string(),
                    val: "s3cr3t".to_string(),
                },
            ])
            .unwrap();

        store
    }

    #[test]
    fn test_key_lookup_is_case_insensitive() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_key_term("Foo@BAR.com");

        let rows = lookup_keys(&store, &set, false).unwrap();
        assert_eq!(rows.len(), 1); // distinct collapses the two sources
        assert_eq!(rows[0].key, "foo@bar.com");
        assert_eq!(rows[0].val, "Secret");
    }

    #[test]
    fn test_key_lookup_with_source_column() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_key_term("foo@bar.com");

        let rows = lookup_keys(&store, &set, true).unwrap();
        // With src_id the two sources are distinct rows
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.src_id.is_some()));
    }

    #[test]
    fn test_value_lookup_is_case_sensitive() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_term("secret");
        assert!(lookup_values(&store, &set).unwrap().is_empty());

        let mut set = MatchSet::new();
        set.add_term("Secret");
        let rows = lookup_values(&store, &set).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "foo@bar.com");
    }

    #[test]
    fn test_match_set_collapses_duplicates() {
        let mut set = MatchSet::new();
        set.add_key_term("A@B.com");
        set.add_key_term(" a@b.com ");
        set.add_key_term("a@b.com");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_terms_from_reader() {
        let mut set = MatchSet::new();
        set.add_key_terms_from(&b"Foo@Bar.com\nbaz@qux.net\n"[..]).unwrap();
        assert_eq!(set.len(), 2);

        let mut vals = MatchSet::new();
        vals.add_terms_from(&b"Secret\nSecret\n"[..]).unwrap();
        assert_eq!(vals.len(), 1);
    }

    #[test]
    fn test_dump_by_source() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_term("feed-a.txt");

        let rows = dump_sources(&store, &set).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.key == "alice@example.com"));
    }

    #[test]
    fn test_purge_cascades_and_isolates() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_term("feed-a.txt");

        let deleted = purge_sources(&store, &set).unwrap();
        assert_eq!(deleted, 1);

        // feed-a rows are gone, feed-b rows untouched
        assert_eq!(store.mapping_count().unwrap(), 2);
        let remaining = store.sources().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].1, "feed-b.txt");
    }

    #[test]
    fn test_purge_unknown_source_deletes_nothing() {
        let store = seeded_store();

        let mut set = MatchSet::new();
        set.add_term("never-loaded.txt");

        assert_eq!(purge_sources(&store, &set).unwrap(), 0);
        assert_eq!(store.mapping_count().unwrap(), 4);
    }

    #[test]
    fn test_csv_output_quotes_embedded_delimiters() {
        let rows = vec![MappingRow {
            key: "a@b.com".to_string(),
            val: "with,comma".to_string(),
            src_id: None,
        }];

        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a@b.com,\"with,comma\"\n");
    }

    #[test]
    fn test_csv_output_with_source_column() {
        let rows = vec![MappingRow {
            key: "a@b.com".to_string(),
            val: "v".to_string(),
            src_id: Some(7),
        }];

        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a@b.com,v,7\n");
    }
}
