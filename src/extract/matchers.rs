//! Extraction strategies
//!
//! Each matcher is one rule in the ordered cascade: a compiled pattern and
//! its post-processing, colocated and independently testable. The cascade
//! order lives in [`super::Extractor`]; matchers know nothing about each
//! other.
//!
//! The anchored strategies are precision-favoring, tuned to well-formed
//! feeds. The loose strategies search anywhere in the line and exist purely
//! as recall-favoring fallbacks for noisy feeds; they run last, after the
//! anchored strategies and the colon-split rule have all failed, so a fully
//! colon-structured line keeps its first field as the value instead of
//! having the loose search grab whatever follows the last colon.

use regex::Regex;

/// A successful match before normalization
#[derive(Debug)]
pub struct RawMatch {
    pub local: String,
    pub domain: String,
    pub value: String,
}

impl RawMatch {
    fn new(local: &str, domain: &str, value: &str) -> Self {
        Self {
            local: local.to_string(),
            domain: domain.to_string(),
            value: value.to_string(),
        }
    }
}

/// One rule in the ordered extraction cascade
pub trait Matcher {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Attempt to pull a (local, domain, value) triple out of a line
    fn attempt(&self, line: &str) -> Option<RawMatch>;
}

fn triple_from(caps: &regex::Captures<'_>) -> RawMatch {
    RawMatch::new(&caps[1], &caps[2], &caps[3])
}

// ==================== Anchored strategies ====================

/// Strategy 1: `local[+tag]@domain` then colon, semicolon or whitespace,
/// then a value from a restricted class (which may be empty).
///
/// ASCII word classes, matching the bulk of well-formed feed lines.
pub struct StrictAnchored {
    re: Regex,
}

impl StrictAnchored {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"(?i-u)^\s*([-.\w]+)(?:\+\w+)?@([-.\w]+)(?:[:;]\s*|\s+)([-.\w!]*)$")?,
        })
    }
}

impl Matcher for StrictAnchored {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        self.re.captures(line).map(|caps| triple_from(&caps))
    }
}

/// Strategy 2: all-digit local part, optionally prefixed with a literal or
/// percent-encoded `+` (phone-number-style addresses). The prefix is not
/// captured, so it never reaches the key.
pub struct NumericAddress {
    re: Regex,
}

impl NumericAddress {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"(?i-u)^\s*(?:\+|%2b)?(\d+)@([-.\w]+)(?:[:;]\s*|\s+)([-.\w!]*)$")?,
        })
    }
}

impl Matcher for NumericAddress {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        self.re.captures(line).map(|caps| triple_from(&caps))
    }
}

/// Strategy 3: same shape as strict but Unicode word classes, separator
/// restricted to exactly one colon.
pub struct UnicodeAware {
    re: Regex,
}

impl UnicodeAware {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"(?i)^\s*([-.\w]+)(?:\+\w+)?@([-.\w]+):([-.\w!]*)$")?,
        })
    }
}

impl Matcher for UnicodeAware {
    fn name(&self) -> &'static str {
        "unicode"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        self.re.captures(line).map(|caps| triple_from(&caps))
    }
}

/// Strategy 4: `local@domain` followed by two or more colons, then the value.
pub struct MultiColon {
    re: Regex,
}

impl MultiColon {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"(?i-u)^\s*([-.\w]+)(?:\+\w+)?@([-.\w]+)::+([-.\w!]*)$")?,
        })
    }
}

impl Matcher for MultiColon {
    fn name(&self) -> &'static str {
        "multicolon"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        self.re.captures(line).map(|caps| triple_from(&caps))
    }
}

// ==================== Loose strategies ====================

/// Strategy 5: unanchored search for the strategy-3 shape anywhere in the
/// line; local part and domain must start alphanumeric, value is non-empty.
pub struct LooseSearch {
    re: Regex,
}

impl LooseSearch {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(r"(?i-u)([0-9a-z][-.\w]*)(?:\+\w+)?@([0-9a-z][-.\w]*):([-.\w!]+)")?,
        })
    }
}

impl Matcher for LooseSearch {
    fn name(&self) -> &'static str {
        "loose"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        self.re.captures(line).map(|caps| triple_from(&caps))
    }
}

/// Strategy 6: remove a literal `{newline}` placeholder token first, then
/// search with an extended value character class (common punctuation added),
/// value length bounded to 1-12 characters.
pub struct LoosePlaceholder {
    strip: Regex,
    re: Regex,
}

impl LoosePlaceholder {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            strip: Regex::new(r"(?i)\{newline\}")?,
            re: Regex::new(
                r##"(?i-u)([0-9a-z][-.\w]*)(?:\+\w+)?@([0-9a-z][-.\w]*):([-.\w'!"#$%&()*+,/;<=>?@^`|~]{1,12})"##,
            )?,
        })
    }
}

impl Matcher for LoosePlaceholder {
    fn name(&self) -> &'static str {
        "loose-placeholder"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        let cleaned = self.strip.replace_all(line, "");
        self.re.captures(&cleaned).map(|caps| triple_from(&caps))
    }
}

// ==================== Colon-split fallback ====================

/// Strategy 7: split the whole line on colons. Succeeds only with exactly
/// two fields, or three where the third is precisely 16 hex characters (an
/// opaque token; its value is never verified against anything). The second
/// field must itself be a bare plain or numeric-prefixed address; key comes
/// from the second field, value from the first.
pub struct ColonSplit {
    email: Regex,
    numeric: Regex,
    hex: Regex,
}

impl ColonSplit {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(r"(?i-u)^([-.\w]+@[-.\w]+)$")?,
            numeric: Regex::new(r"(?i-u)^(?:\+|%2b)?(\d+@[-.\w]+)$")?,
            hex: Regex::new(r"(?i)^[0-9a-f]+$")?,
        })
    }

    fn field_shape_ok(&self, fields: &[&str]) -> bool {
        match fields.len() {
            2 => true,
            3 => fields[2].len() == 16 && self.hex.is_match(fields[2]),
            _ => false,
        }
    }
}

impl Matcher for ColonSplit {
    fn name(&self) -> &'static str {
        "colonsplit"
    }

    fn attempt(&self, line: &str) -> Option<RawMatch> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 2 {
            return None;
        }

        let addr = self
            .email
            .captures(fields[1])
            .or_else(|| self.numeric.captures(fields[1]))?;

        if !self.field_shape_ok(&fields) {
            return None;
        }

        // Both bare-address classes exclude '@' itself, so the capture holds
        // exactly one of them.
        let (local, domain) = addr[1].split_once('@')?;
        Some(RawMatch::new(local, domain, fields[0].trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_anchored_basic() {
        let m = StrictAnchored::new().unwrap();

        let hit = m.attempt("alice@example.com:secret").unwrap();
        assert_eq!(hit.local, "alice");
        assert_eq!(hit.domain, "example.com");
        assert_eq!(hit.value, "secret");

        // Semicolon and whitespace separators
        assert!(m.attempt("alice@example.com;secret").is_some());
        assert!(m.attempt("alice@example.com   secret").is_some());

        // Separator absorbs whitespace after the colon
        let hit = m.attempt("alice@example.com: secret").unwrap();
        assert_eq!(hit.value, "secret");

        // Plus-tag excluded from the local capture
        let hit = m.attempt("alice+work@example.com:secret").unwrap();
        assert_eq!(hit.local, "alice");
    }

    #[test]
    fn test_strict_allows_empty_value() {
        let m = StrictAnchored::new().unwrap();
        let hit = m.attempt("alice@example.com:").unwrap();
        assert_eq!(hit.value, "");
    }

    #[test]
    fn test_strict_rejects_noise() {
        let m = StrictAnchored::new().unwrap();
        assert!(m.attempt("not an email at all").is_none());
        assert!(m.attempt("prefix alice@example.com:secret").is_none());
        assert!(m.attempt("alice@example.com:has spaces").is_none());
    }

    #[test]
    fn test_numeric_address_prefixes() {
        let m = NumericAddress::new().unwrap();

        let hit = m.attempt("+447700900000@sms.example;OK").unwrap();
        assert_eq!(hit.local, "447700900000");
        assert_eq!(hit.value, "OK");

        // Percent-encoded prefix, case-insensitive
        assert!(m.attempt("%2b447700900000@sms.example:OK").is_some());
        assert!(m.attempt("%2B447700900000@sms.example:OK").is_some());

        // Non-digit local part never matches
        assert!(m.attempt("alice@example.com:OK").is_none());
    }

    #[test]
    fn test_unicode_aware_word_classes() {
        let m = UnicodeAware::new().unwrap();

        let hit = m.attempt("jürgen@müller.de:wert").unwrap();
        assert_eq!(hit.local, "jürgen");
        assert_eq!(hit.domain, "müller.de");

        // Separator must be exactly one colon
        assert!(m.attempt("jürgen@müller.de;wert").is_none());
    }

    #[test]
    fn test_multi_colon() {
        let m = MultiColon::new().unwrap();

        let hit = m.attempt("bob@example.net::twice").unwrap();
        assert_eq!(hit.value, "twice");

        assert!(m.attempt("bob@example.net:::thrice").is_some());
        assert!(m.attempt("bob@example.net:once").is_none());
    }

    #[test]
    fn test_loose_search_unanchored() {
        let m = LooseSearch::new().unwrap();

        let hit = m.attempt("noise before dave@example.io:tail").unwrap();
        assert_eq!(hit.local, "dave");
        assert_eq!(hit.domain, "example.io");
        assert_eq!(hit.value, "tail");

        // Local part must start alphanumeric; the search skips a leading dash
        let hit = m.attempt("-dash@example.io:tail").unwrap();
        assert_eq!(hit.local, "dash");
    }

    #[test]
    fn test_loose_placeholder_removal() {
        let m = LoosePlaceholder::new().unwrap();

        let hit = m.attempt("{NewLine}eve@example.gr:p$wd!").unwrap();
        assert_eq!(hit.local, "eve");
        assert_eq!(hit.value, "p$wd!");

        // Value bounded to 12 characters
        let hit = m.attempt("eve@example.gr:abcdefghijklmnop").unwrap();
        assert_eq!(hit.value.len(), 12);
    }

    #[test]
    fn test_loose_placeholder_extended_value_class() {
        let m = LoosePlaceholder::new().unwrap();

        // Punctuation the plain loose class rejects, including quote and hash
        let hit = m.attempt(r##"eve@example.gr:a"b#c&(d)"##).unwrap();
        assert_eq!(hit.value, r##"a"b#c&(d)"##);

        let hit = m.attempt("eve@example.gr:<=?|~>").unwrap();
        assert_eq!(hit.value, "<=?|~>");
    }

    #[test]
    fn test_colon_split_two_fields() {
        let m = ColonSplit::new().unwrap();

        let hit = m.attempt("hash123:bob@example.net").unwrap();
        assert_eq!(hit.local, "bob");
        assert_eq!(hit.domain, "example.net");
        assert_eq!(hit.value, "hash123");
    }

    #[test]
    fn test_colon_split_hex_third_field() {
        let m = ColonSplit::new().unwrap();

        // 16 hex chars: accepted as an opaque token
        assert!(m.attempt("hash123:bob@example.net:0123456789abcdef").is_some());
        assert!(m.attempt("hash123:bob@example.net:0123456789ABCDEF").is_some());

        // Wrong length or non-hex: rejected
        assert!(m.attempt("hash123:bob@example.net:0123456789abcde").is_none());
        assert!(m.attempt("hash123:bob@example.net:0123456789abcdeg").is_none());

        // Four fields never match
        assert!(m
            .attempt("hash123:bob@example.net:0123456789abcdef:extra")
            .is_none());
    }

    #[test]
    fn test_colon_split_numeric_second_field() {
        let m = ColonSplit::new().unwrap();

        let hit = m.attempt("token:+447700900000@sms.example").unwrap();
        assert_eq!(hit.local, "447700900000");
        assert_eq!(hit.domain, "sms.example");

        assert!(m.attempt("token:not-an-address").is_none());
    }

    #[test]
    fn test_colon_split_trims_value() {
        let m = ColonSplit::new().unwrap();
        let hit = m.attempt("  spaced token :bob@example.net").unwrap();
        assert_eq!(hit.value, "spaced token");
    }
}
