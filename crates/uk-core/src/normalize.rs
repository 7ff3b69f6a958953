//! Identifier normalization
//!
//! Usernames, category names and tags are compared case-insensitively after
//! trimming. Everything that goes into a blocklist or gets looked up in one
//! passes through [`normalize`] first.

/// Trim and lowercase an identifier.
#[inline]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Collapse every whitespace run into a single space and trim.
///
/// Tag chips render their label across several text nodes, so the raw text
/// often carries newlines and indentation.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
