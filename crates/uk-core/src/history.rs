//! Search history clearing
//!
//! The site keeps recent searches in local storage under a single key. When
//! the user opts out, the entry is overwritten with an empty array.

/// Local storage key used by the site.
pub const SEARCH_HISTORY_KEY: &str = "search-history";

/// Value written in place of the history.
pub const EMPTY_HISTORY: &str = "[]";

/// Whether the stored history needs clearing.
pub fn should_clear(current: Option<&str>) -> bool {
    matches!(current, Some(value) if !value.is_empty() && value != EMPTY_HISTORY)
}
