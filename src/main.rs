//! Kvstash CLI
//!
//! One command per invocation against the persisted store:
//! - Load feed files (plain, gz or bz2) under their own sources
//! - Look up rows by key or value, from arguments or term files
//! - Dump or purge whole sources
//! - Manage the optional key/val indexes

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvstash::{extract, index, load, query, Config, Extractor, Store};
use kvstash::index::IndexColumn;
use kvstash::query::MatchSet;

#[derive(Parser)]
#[command(name = "kvstash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fold messy key/value feeds into a queryable mapping table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the SQLite database (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract and load each file under its own source
    Load {
        /// Feed files; .gz and .bz2 are unwrapped by suffix
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List all (id, identifier) sources
    Sources,

    /// Emit (key,value) rows owned by the named sources
    Dump {
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Delete the named sources and their rows
    Purge {
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Look up rows by key (case-insensitive)
    Key {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Include the source id column in the output
        #[arg(long)]
        with_source: bool,
    },

    /// Look up rows by value (case-sensitive)
    Val {
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Look up rows by keys read one-per-line from files
    KeyFile {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Look up rows by values read one-per-line from files
    ValFile {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Create the key index (slow, eats disk space)
    IndexKey,

    /// Create the val index (slow, eats disk space)
    IndexVal,

    /// Create both indexes
    IndexAll,

    /// Drop the key index
    IdropKey,

    /// Drop the val index
    IdropVal,

    /// Drop both indexes
    IdropAll,

    /// Run the extractor against the built-in sample vector
    Test,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = {
        let mut config = match &cli.config {
            Some(path) => Config::load_with_env(path)?,
            None => Config::load_default(),
        };
        if let Some(db) = &cli.db {
            config.db_path = db.clone();
        }
        config
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("kvstash={}", config.logging.level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // The dispatcher owns the store handle for the whole invocation; every
    // operation borrows it and it closes on all exit paths.
    let mut store = Store::open(&config.db_path)?;
    let stdout = std::io::stdout();

    match cli.command {
        Commands::Load { files } => {
            let extractor = Extractor::new()?;
            for path in &files {
                let report = load::load_file(&mut store, &extractor, path, &config)?;
                println!(
                    "{}: {} records from {} lines ({} rejected, {} blank)",
                    path.display(),
                    report.records_loaded,
                    report.lines_read,
                    report.rejects,
                    report.blank_values
                );
            }
        }

        Commands::Sources => {
            let sources = store.sources()?;
            query::write_sources(stdout.lock(), &sources)?;
        }

        Commands::Dump { sources } => {
            let mut set = MatchSet::new();
            for term in &sources {
                set.add_term(term);
            }
            let rows = query::dump_sources(&store, &set)?;
            query::write_rows(stdout.lock(), &rows)?;
        }

        Commands::Purge { sources } => {
            let mut set = MatchSet::new();
            for term in &sources {
                set.add_term(term);
            }
            let deleted = query::purge_sources(&store, &set)?;
            println!("purged {} source(s)", deleted);
        }

        Commands::Key { terms, with_source } => {
            let mut set = MatchSet::new();
            for term in &terms {
                set.add_key_term(term);
            }
            let rows = query::lookup_keys(&store, &set, with_source)?;
            query::write_rows(stdout.lock(), &rows)?;
        }

        Commands::Val { terms } => {
            let mut set = MatchSet::new();
            for term in &terms {
                set.add_term(term);
            }
            let rows = query::lookup_values(&store, &set)?;
            query::write_rows(stdout.lock(), &rows)?;
        }

        Commands::KeyFile { files } => {
            let mut set = MatchSet::new();
            for path in &files {
                set.add_key_terms_from(BufReader::new(File::open(path)?))?;
            }
            let rows = query::lookup_keys(&store, &set, false)?;
            query::write_rows(stdout.lock(), &rows)?;
        }

        Commands::ValFile { files } => {
            let mut set = MatchSet::new();
            for path in &files {
                set.add_terms_from(BufReader::new(File::open(path)?))?;
            }
            let rows = query::lookup_values(&store, &set)?;
            query::write_rows(stdout.lock(), &rows)?;
        }

        Commands::IndexKey => index::create_index(&store, IndexColumn::Key)?,
        Commands::IndexVal => index::create_index(&store, IndexColumn::Val)?,
        Commands::IndexAll => {
            index::create_index(&store, IndexColumn::Key)?;
            index::create_index(&store, IndexColumn::Val)?;
        }

        Commands::IdropKey => index::drop_index(&store, IndexColumn::Key)?,
        Commands::IdropVal => index::drop_index(&store, IndexColumn::Val)?,
        Commands::IdropAll => {
            index::drop_index(&store, IndexColumn::Key)?;
            index::drop_index(&store, IndexColumn::Val)?;
        }

        Commands::Test => {
            let extractor = Extractor::new()?;
            for line in extract::SAMPLE_LINES {
                match extractor.extract_traced(line) {
                    Some((strategy, hit)) => {
                        println!("{:<18} {:?} -> ({:?}, {:?})", strategy, line, hit.key, hit.value)
                    }
                    None => println!("{:<18} {:?}", "reject", line),
                }
            }
        }
    }

    Ok(())
}
