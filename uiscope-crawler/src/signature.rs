use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

fn attr_value_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s+\w+="[^"]*""#).unwrap())
}

fn whitespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Structural fingerprint of a page's markup.
///
/// Strips quoted attribute values and collapses whitespace before hashing, so
/// two pages with the same element structure but different attribute values
/// or formatting map to the same fingerprint. Total over any input; empty
/// markup hashes the empty normalized form.
pub fn dom_signature(markup: &str) -> String {
    let stripped = attr_value_pattern().replace_all(markup, "");
    let normalized = whitespace_pattern().replace_all(&stripped, " ");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
