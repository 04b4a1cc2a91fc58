//! # Kvstash
//!
//! Bulk key/value loader: folds messy, inconsistently formatted external
//! feeds into a queryable SQLite mapping table keyed by normalized
//! `local@domain` identifiers.
//!
//! ## Features
//!
//! - **Extraction cascade**: seven prioritized strategies turn one raw feed
//!   line into a normalized (key, value) pair, or reject it advisorily
//! - **Bounded-memory loads**: records stage in a buffer that flushes
//!   transactionally at a configurable threshold
//! - **Set-membership queries**: lookup by key or value, dump and purge by
//!   source, all driven by ephemeral per-invocation term sets
//! - **Compressed input**: gz and bz2 feeds unwrap by file suffix
//!
//! ## Modules
//!
//! - [`extract`]: the record extraction cascade
//! - [`load`]: buffered bulk-load pipeline
//! - [`store`]: SQLite-backed persistent store and source registry
//! - [`index`]: optional secondary indexes over keys and values
//! - [`query`]: match-set lookups, dump and purge
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kvstash::{Config, Extractor, Store};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut store = Store::open(&config.db_path)?;
//!     let extractor = Extractor::new()?;
//!
//!     let report = kvstash::load::load_file(
//!         &mut store,
//!         &extractor,
//!         std::path::Path::new("feed.txt.gz"),
//!         &config,
//!     )?;
//!
//!     println!("loaded {} records", report.records_loaded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod extract;
pub mod index;
pub mod load;
pub mod query;
pub mod store;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig};

pub use extract::{Extraction, Extractor, SAMPLE_LINES};

pub use load::{LoadBuffer, LoadReport};

pub use index::IndexColumn;

pub use query::{MappingRow, MatchSet};

pub use store::{StagedMapping, Store, StoreError, StoreResult};
