//! Bulk load pipeline
//!
//! Feeds raw input lines through the extraction cascade and stages the
//! results in a bounded-memory buffer that auto-flushes into the store.
//!
//! ```text
//! Load Path:
//!   File -> (gz/bz2 unwrap) -> sanitize -> Extractor -> LoadBuffer -> Store
//! ```
//!
//! Each flush is one transaction: either the whole staged batch becomes
//! durable or none of it does. A load session always ends with a final
//! flush so end-of-input never strands staged records. Rejected lines are
//! logged with their 1-based line number and never abort the load.

use crate::config::Config;
use crate::extract::{sanitize_line, Extractor};
use crate::store::{StagedMapping, Store, StoreResult};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Staging buffer for one load session.
///
/// Borrows the store for the whole session; `add` auto-flushes once the
/// staged count reaches the threshold, and the session driver calls the
/// final `flush` before the buffer is dropped.
pub struct LoadBuffer<'a> {
    store: &'a mut Store,
    src_id: i64,
    threshold: usize,
    staged: Vec<StagedMapping>,
    flushes: u64,
}

impl<'a> LoadBuffer<'a> {
    pub fn new(store: &'a mut Store, src_id: i64, threshold: usize) -> Self {
        Self {
            store,
            src_id,
            threshold: threshold.max(1),
            staged: Vec::new(),
            flushes: 0,
        }
    }

    /// Stage one record; flushes automatically at the threshold.
    pub fn add(&mut self, key: String, val: String) -> StoreResult<()> {
        self.staged.push(StagedMapping {
            src_id: self.src_id,
            key,
            val,
        });

        if self.staged.len() >= self.threshold {
            self.flush()?;
        }

        Ok(())
    }

    /// Transactionally copy all staged records into the store and clear
    /// staging. No-op when nothing is staged. On failure nothing is applied
    /// and the error is surfaced; there is no retry.
    pub fn flush(&mut self) -> StoreResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }

        self.store.insert_mappings(&self.staged)?;
        self.staged.clear();
        self.flushes += 1;

        Ok(())
    }

    /// Number of records currently staged
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Number of flushes performed so far
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }
}

/// Outcome of one load session
#[derive(Debug, Default)]
pub struct LoadReport {
    pub lines_read: u64,
    pub records_loaded: u64,
    pub blank_values: u64,
    pub rejects: u64,
}

/// Open an input file, unwrapping a recognized compressed container by
/// name suffix. Contents are decoded permissively later, line by line.
pub fn open_input(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let name = path.to_string_lossy();

    if name.ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else if name.ends_with(".bz2") {
        Ok(Box::new(BufReader::new(MultiBzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Drive one load session over an already-open reader.
///
/// Reads lines as raw bytes, sanitizes (truncate, strip CR/LF, permissive
/// decode), extracts, stages. Blank extracted values are dropped before
/// staging; unmatched lines are logged and skipped. Ends with the final
/// flush.
pub fn load_reader<R: BufRead>(
    store: &mut Store,
    extractor: &Extractor,
    src_id: i64,
    mut reader: R,
    config: &Config,
) -> StoreResult<LoadReport> {
    let mut buffer = LoadBuffer::new(store, src_id, config.flush_threshold);
    let mut report = LoadReport::default();
    let mut raw = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_no += 1;

        let line = sanitize_line(&raw, config.max_line_bytes);

        match extractor.extract(&line) {
            Some(hit) if !hit.value.is_empty() => {
                buffer.add(hit.key, hit.value)?;
                report.records_loaded += 1;
            }
            Some(_) => {
                // Matched but blank value: never persisted
                report.blank_values += 1;
            }
            None => {
                // The log shows the line as read, not the truncated and
                // decoded form the cascade saw
                let raw_text = String::from_utf8_lossy(&raw);
                tracing::warn!(line_no, line = %raw_text.trim_end_matches(['\r', '\n']), "reject");
                report.rejects += 1;
            }
        }
    }

    buffer.flush()?;
    report.lines_read = line_no;

    Ok(report)
}

/// Load one file under its own source: register the source, open the input
/// (unwrapping compression by suffix), run the session.
pub fn load_file(
    store: &mut Store,
    extractor: &Extractor,
    path: &Path,
    config: &Config,
) -> StoreResult<LoadReport> {
    tracing::info!(file = %path.display(), "loading");

    let src_id = store.source_id(&path.to_string_lossy())?;
    let reader = open_input(path)?;
    let report = load_reader(store, extractor, src_id, reader, config)?;

    tracing::info!(
        file = %path.display(),
        lines = report.lines_read,
        records = report.records_loaded,
        rejects = report.rejects,
        "loaded"
    );

    Ok(report)
}
