//! Blocklist import/export
//!
//! The file format is a plain JSON array of strings, one file per list.
//! Import merges into the existing list as a normalized set union.

use serde_json::Value;

use crate::store::{dedup_normalized, BlocklistStore, KeyValueStore, StoreError};
use crate::types::ListKind;

/// Error type for rejected imports. The store is never modified when one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid JSON file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid format: expected a JSON array")]
    NotAnArray,
    #[error("Invalid format: entry {index} is not a string")]
    NonStringEntry { index: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entries before the import
    pub before: usize,
    /// Entries found in the file
    pub imported: usize,
    /// Entries after the merge
    pub after: usize,
}

impl ImportSummary {
    pub fn added(&self) -> usize {
        self.after - self.before
    }
}

/// Serialize a list for download.
pub fn export_list(list: &[String]) -> String {
    // Vec<String> cannot fail to serialize
    serde_json::to_string_pretty(list).unwrap_or_else(|_| "[]".to_string())
}

/// Validate an import file.
pub fn parse_import(text: &str) -> Result<Vec<String>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(s) => Ok(s),
            _ => Err(ImportError::NonStringEntry { index }),
        })
        .collect()
}

/// Normalized set union: existing entries keep their order, new ones are
/// appended in import order.
pub fn merge(existing: &[String], imported: &[String]) -> Vec<String> {
    dedup_normalized(existing.iter().chain(imported.iter()))
}

impl<S: KeyValueStore> BlocklistStore<S> {
    /// Export a list in the download format.
    pub fn export(&self, kind: ListKind) -> String {
        export_list(&self.get_list(kind))
    }

    /// Merge an import file into a list.
    pub fn import(&mut self, kind: ListKind, text: &str) -> Result<ImportSummary, ImportError> {
        let imported = parse_import(text)?;
        let existing = self.get_list(kind);
        let merged = merge(&existing, &imported);
        let summary = ImportSummary {
            before: existing.len(),
            imported: imported.len(),
            after: merged.len(),
        };
        self.set_list(kind, merged)?;
        log::debug!(
            "Imported {} entries into {} ({} -> {})",
            summary.imported,
            kind.storage_key(),
            summary.before,
            summary.after
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store_with(kind: ListKind, items: &[&str]) -> BlocklistStore<MemoryStore> {
        let mut store = BlocklistStore::new(MemoryStore::new());
        store.set_list(kind, items.iter().copied()).unwrap();
        store
    }

    #[test]
    fn test_import_union_normalizes() {
        let mut store = store_with(ListKind::Channels, &["b"]);
        let summary = store.import(ListKind::Channels, r#"["a","A","b"]"#).unwrap();
        assert_eq!(store.get_list(ListKind::Channels), vec!["b", "a"]);
        assert_eq!(summary, ImportSummary { before: 1, imported: 3, after: 2 });
        assert_eq!(summary.added(), 1);
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let source = store_with(ListKind::Tags, &["English", "Gambling", "IRL"]);
        let file = source.export(ListKind::Tags);

        let mut target = BlocklistStore::new(MemoryStore::new());
        target.import(ListKind::Tags, &file).unwrap();
        assert_eq!(target.get_list(ListKind::Tags), source.get_list(ListKind::Tags));
        assert_eq!(target.get_list(ListKind::Tags), vec!["english", "gambling", "irl"]);
    }

    #[test]
    fn test_export_format_is_pretty_array() {
        let store = store_with(ListKind::Channels, &["foo", "bar"]);
        assert_eq!(store.export(ListKind::Channels), "[\n  \"foo\",\n  \"bar\"\n]");
        let empty = BlocklistStore::new(MemoryStore::new());
        assert_eq!(empty.export(ListKind::Channels), "[]");
    }

    #[test]
    fn test_import_rejects_non_array() {
        let mut store = store_with(ListKind::Channels, &["keep"]);
        let err = store.import(ListKind::Channels, r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAnArray));
        assert_eq!(store.get_list(ListKind::Channels), vec!["keep"]);
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let mut store = store_with(ListKind::Channels, &["keep"]);
        let err = store.import(ListKind::Channels, "[\"a\",").unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
        assert_eq!(store.get_list(ListKind::Channels), vec!["keep"]);
    }

    #[test]
    fn test_import_rejects_non_string_entries() {
        let mut store = store_with(ListKind::Categories, &[]);
        let err = store.import(ListKind::Categories, r#"["ok", 5]"#).unwrap_err();
        assert!(matches!(err, ImportError::NonStringEntry { index: 1 }));
        assert!(store.get_list(ListKind::Categories).is_empty());
    }

    #[test]
    fn test_merge_drops_empty_entries() {
        let merged = merge(&["x".to_string()], &["  ".to_string(), "Y".to_string()]);
        assert_eq!(merged, vec!["x", "y"]);
    }
}
