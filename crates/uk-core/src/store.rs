//! Blocklist store
//!
//! Blocklists live in the extension's key-value storage area as JSON. The
//! store reads them fail-soft (a corrupt value is an empty list, never an
//! error) and always hands out normalized, deduplicated entries.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::normalize::normalize;
use crate::types::ListKind;

/// Error type for store writes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Storage backend rejected write to '{key}': {message}")]
    Backend { key: String, message: String },
}

// =============================================================================
// Key-Value Abstraction
// =============================================================================

/// A string-keyed store of JSON values.
///
/// This mirrors the shape of `storage.local`: values are native JSON
/// (booleans, numbers, strings, arrays).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
}

/// In-process store. Also serves as the content script's mirror of the
/// browser storage area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object (the result of `storage.local.get(null)`).
    /// Non-object values produce an empty store.
    pub fn from_object(object: Value) -> Self {
        let entries = match object {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self { entries }
    }

}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

// =============================================================================
// Blocklist Store
// =============================================================================

/// Ordered, normalized blocklists on top of a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct BlocklistStore<S> {
    backend: S,
}

impl<S: KeyValueStore> BlocklistStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Current entries of a list. Absent or corrupt data reads as empty.
    pub fn get_list(&self, kind: ListKind) -> Vec<String> {
        let key = kind.storage_key();
        let Some(value) = self.backend.get(key) else {
            return Vec::new();
        };
        match decode_list(&value) {
            Some(list) => dedup_normalized(list),
            None => {
                log::warn!("Ignoring corrupt blocklist '{}'", key);
                Vec::new()
            }
        }
    }

    /// Replace a list wholesale.
    pub fn set_list<I, T>(&mut self, kind: ListKind, list: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let list = dedup_normalized(list);
        let key = kind.storage_key();
        let encoded = encode_list(key, &list)?;
        self.backend.set(key, encoded)
    }

    /// Append an entry unless its normalized form is empty or already present.
    /// Returns whether the list changed.
    pub fn add(&mut self, kind: ListKind, value: &str) -> Result<bool, StoreError> {
        let entry = normalize(value);
        if entry.is_empty() {
            return Ok(false);
        }
        let mut list = self.get_list(kind);
        if list.contains(&entry) {
            return Ok(false);
        }
        list.push(entry);
        self.set_list(kind, list)?;
        Ok(true)
    }

    /// Remove an entry by normalized match. Returns whether the list changed.
    pub fn remove(&mut self, kind: ListKind, value: &str) -> Result<bool, StoreError> {
        let entry = normalize(value);
        let mut list = self.get_list(kind);
        let before = list.len();
        list.retain(|existing| *existing != entry);
        if list.len() == before {
            return Ok(false);
        }
        self.set_list(kind, list)?;
        Ok(true)
    }

    pub fn clear(&mut self, kind: ListKind) -> Result<(), StoreError> {
        self.set_list(kind, Vec::<String>::new())
    }

    pub fn contains(&self, kind: ListKind, value: &str) -> bool {
        let entry = normalize(value);
        self.get_list(kind).contains(&entry)
    }

    /// The persisted representation of a list, ready to hand to the real
    /// storage area.
    pub fn encoded(&self, kind: ListKind) -> Result<Value, StoreError> {
        encode_list(kind.storage_key(), &self.get_list(kind))
    }

    /// Read-only membership view of all lists.
    pub fn snapshot(&self) -> Blocklists {
        Blocklists {
            channels: self.get_list(ListKind::Channels).into_iter().collect(),
            categories: self.get_list(ListKind::Categories).into_iter().collect(),
            tags: self.get_list(ListKind::Tags).into_iter().collect(),
        }
    }
}

/// Lists are stored as a JSON string holding an array. A native array of
/// strings is accepted as well.
fn decode_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(text) if text.trim().is_empty() => Some(Vec::new()),
        Value::String(text) => serde_json::from_str::<Vec<String>>(text).ok(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect(),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn encode_list(key: &str, list: &[String]) -> Result<Value, StoreError> {
    serde_json::to_string(list)
        .map(Value::String)
        .map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })
}

/// Normalize, drop empties and duplicates, keep first-seen order.
pub(crate) fn dedup_normalized<I, T>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let entry = normalize(item.as_ref());
        if entry.is_empty() || !seen.insert(entry.clone()) {
            continue;
        }
        out.push(entry);
    }
    out
}

// =============================================================================
// Blocklists Snapshot
// =============================================================================

/// Membership sets for the three lists. This is what the DOM layer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklists {
    channels: HashSet<String>,
    categories: HashSet<String>,
    tags: HashSet<String>,
}

impl Blocklists {
    pub fn from_lists(channels: &[&str], categories: &[&str], tags: &[&str]) -> Self {
        Self {
            channels: dedup_normalized(channels).into_iter().collect(),
            categories: dedup_normalized(categories).into_iter().collect(),
            tags: dedup_normalized(tags).into_iter().collect(),
        }
    }

    fn set(&self, kind: ListKind) -> &HashSet<String> {
        match kind {
            ListKind::Channels => &self.channels,
            ListKind::Categories => &self.categories,
            ListKind::Tags => &self.tags,
        }
    }

    /// Normalizes `raw` and tests membership.
    pub fn is_blocked(&self, kind: ListKind, raw: &str) -> bool {
        let set = self.set(kind);
        !set.is_empty() && set.contains(&normalize(raw))
    }

    pub fn len(&self, kind: ListKind) -> usize {
        self.set(kind).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> BlocklistStore<MemoryStore> {
        BlocklistStore::new(MemoryStore::new())
    }

    #[test]
    fn test_missing_list_is_empty() {
        assert!(store().get_list(ListKind::Channels).is_empty());
    }

    #[test]
    fn test_corrupt_list_fails_soft() {
        let mut s = store();
        s.backend_mut().set("blockedChannels", json!("[not json")).unwrap();
        s.backend_mut().set("blockedCategories", json!(42)).unwrap();
        s.backend_mut().set("blockedTags", json!([1, 2])).unwrap();
        for kind in ListKind::ALL {
            assert!(s.get_list(kind).is_empty());
        }
    }

    #[test]
    fn test_reads_string_and_native_arrays() {
        let mut s = store();
        s.backend_mut().set("blockedChannels", json!("[\"Foo\", \" bar \"]")).unwrap();
        s.backend_mut().set("blockedTags", json!(["English", "english"])).unwrap();
        assert_eq!(s.get_list(ListKind::Channels), vec!["foo", "bar"]);
        assert_eq!(s.get_list(ListKind::Tags), vec!["english"]);
    }

    #[test]
    fn test_add_normalizes_and_is_idempotent() {
        let mut s = store();
        assert!(s.add(ListKind::Channels, "  FooBar ").unwrap());
        assert!(!s.add(ListKind::Channels, "foobar").unwrap());
        assert!(!s.add(ListKind::Channels, "FOOBAR").unwrap());
        assert!(!s.add(ListKind::Channels, "   ").unwrap());
        assert_eq!(s.get_list(ListKind::Channels), vec!["foobar"]);
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut s = store();
        for name in ["c", "a", "b"] {
            s.add(ListKind::Categories, name).unwrap();
        }
        assert_eq!(s.get_list(ListKind::Categories), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_by_normalized_match() {
        let mut s = store();
        s.set_list(ListKind::Tags, ["a", "b", "c"]).unwrap();
        assert!(s.remove(ListKind::Tags, " B ").unwrap());
        assert!(!s.remove(ListKind::Tags, "zzz").unwrap());
        assert_eq!(s.get_list(ListKind::Tags), vec!["a", "c"]);
    }

    #[test]
    fn test_set_list_dedups() {
        let mut s = store();
        s.set_list(ListKind::Channels, ["A", "a", "B", ""]).unwrap();
        assert_eq!(s.get_list(ListKind::Channels), vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let mut s = store();
        s.add(ListKind::Channels, "foo").unwrap();
        s.clear(ListKind::Channels).unwrap();
        assert!(s.get_list(ListKind::Channels).is_empty());
        assert_eq!(s.backend().get("blockedChannels"), Some(json!("[]")));
    }

    #[test]
    fn test_persisted_encoding_is_json_string() {
        let mut s = store();
        s.add(ListKind::Channels, "Foo").unwrap();
        assert_eq!(s.backend().get("blockedChannels"), Some(json!("[\"foo\"]")));
        assert_eq!(s.encoded(ListKind::Channels).unwrap(), json!("[\"foo\"]"));
    }

    #[test]
    fn test_snapshot_membership_is_case_insensitive() {
        let mut s = store();
        s.add(ListKind::Channels, "foo").unwrap();
        let lists = s.snapshot();
        assert!(lists.is_blocked(ListKind::Channels, "Foo"));
        assert!(lists.is_blocked(ListKind::Channels, " FOO "));
        assert!(!lists.is_blocked(ListKind::Categories, "foo"));
        assert_eq!(lists.len(ListKind::Channels), 1);
        assert!(s.contains(ListKind::Channels, "FoO"));
    }

    #[test]
    fn test_memory_store_from_object() {
        let mem = MemoryStore::from_object(json!({"enabled": false, "blockedTags": "[]"}));
        assert_eq!(mem.get("enabled"), Some(json!(false)));
        assert_eq!(mem.get("blockedTags"), Some(json!("[]")));
        assert_eq!(MemoryStore::from_object(json!([1])), MemoryStore::new());
    }
}
