//! Record extraction
//!
//! Turns one raw feed line into a normalized `(key, value)` pair, or rejects
//! it. The extractor is a pure function over its input: no state between
//! lines, no I/O.
//!
//! # Cascade
//!
//! Seven strategies are tried in fixed priority, first success wins:
//!
//! 1. strict anchored (ASCII, `:`/`;`/whitespace separator)
//! 2. numeric address (all-digit local, optional `+`/`%2b` prefix)
//! 3. unicode-aware (exactly one `:`)
//! 4. multi-colon (`::+` separator)
//! 5. colon-split (value:address\[:16-hex-token\])
//! 6. loose search (unanchored strategy 3)
//! 7. loose search after `{newline}` placeholder removal
//!
//! The colon-split rule runs ahead of the unanchored searches: a fully
//! colon-structured line is keyed on its second field with the first field
//! as the value, which the loose search would otherwise misread.
//!
//! Every successful match is normalized the same way: lowercase local part
//! and domain, `+tag` suffix discarded, joined as `local@domain`. A miss is
//! advisory, never an error; callers log the line and move on.

pub mod matchers;

use matchers::{
    ColonSplit, LoosePlaceholder, LooseSearch, Matcher, MultiColon, NumericAddress,
    StrictAnchored, UnicodeAware,
};

/// A normalized record extracted from one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// `local@domain`, lowercased, `+tag` stripped
    pub key: String,
    /// Captured value; may be empty (dropped later, before persistence)
    pub value: String,
}

/// The ordered extraction cascade
pub struct Extractor {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Extractor {
    /// Build the cascade in its fixed priority order
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            matchers: vec![
                Box::new(StrictAnchored::new()?),
                Box::new(NumericAddress::new()?),
                Box::new(UnicodeAware::new()?),
                Box::new(MultiColon::new()?),
                Box::new(ColonSplit::new()?),
                Box::new(LooseSearch::new()?),
                Box::new(LoosePlaceholder::new()?),
            ],
        })
    }

    /// Extract a normalized `(key, value)` pair from a sanitized line.
    ///
    /// Returns `None` when no strategy matches.
    pub fn extract(&self, line: &str) -> Option<Extraction> {
        self.extract_traced(line).map(|(_, hit)| hit)
    }

    /// Like [`extract`](Self::extract) but also reports which strategy
    /// matched; used by the `test` diagnostic command.
    pub fn extract_traced(&self, line: &str) -> Option<(&'static str, Extraction)> {
        for matcher in &self.matchers {
            if let Some(raw) = matcher.attempt(line) {
                return Some((
                    matcher.name(),
                    Extraction {
                        key: normalize_key(&raw.local, &raw.domain),
                        value: raw.value,
                    },
                ));
            }
        }
        None
    }
}

/// Join and lowercase the address halves
fn normalize_key(local: &str, domain: &str) -> String {
    format!(
        "{}@{}",
        local.trim().to_lowercase(),
        domain.trim().to_lowercase()
    )
}

/// Prepare one raw input line for the cascade.
///
/// Truncates to `max_bytes` (silently lossy, documented behavior), strips
/// trailing CR/LF, and decodes permissively: invalid UTF-8 sequences are
/// dropped, never an error.
pub fn sanitize_line(raw: &[u8], max_bytes: usize) -> String {
    let mut bytes = &raw[..raw.len().min(max_bytes)];

    while let Some((&last, rest)) = bytes.split_last() {
        if last == b'\r' || last == b'\n' {
            bytes = rest;
        } else {
            break;
        }
    }

    decode_dropping_invalid(bytes)
}

/// UTF-8 decode that drops invalid byte sequences instead of replacing or
/// failing. Truncation can leave a partial multi-byte sequence at the end of
/// a line; it is dropped like any other invalid run.
fn decode_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());

    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(err) => {
                let good = err.valid_up_to();
                if let Ok(valid) = std::str::from_utf8(&bytes[..good]) {
                    out.push_str(valid);
                }
                let skip = err.error_len().unwrap_or(bytes.len() - good);
                bytes = &bytes[good + skip..];
            }
        }
    }

    out
}

/// Fixed sample lines for the `test` diagnostic command, one per strategy
/// plus rejection cases.
pub const SAMPLE_LINES: &[&str] = &[
    "alice+work@example.com: s3cr3t",
    "+447700900000@sms.example;OK",
    "jürgen@müller.de:wert",
    "carol@example.net::double",
    "hash123:bob@example.net:0123456789abcdef",
    "noise before dave@example.io:tail",
    "{newline}eve@example.gr:(short)",
    "not an email at all",
    "",
];
