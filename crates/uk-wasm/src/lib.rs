//! WebAssembly bindings for uKick
//!
//! The content script calls [`start_content`] once per page. The options and
//! popup pages use the list functions below; they read and write
//! `storage.local` directly, and the content script picks the change up via
//! `onChanged`.

mod audio;
mod page;
mod player;
mod runtime;
mod storage;

use js_sys::{Array, Object, Reflect};
use uk_core::{BlocklistStore, ListKind, MemoryStore};
use wasm_bindgen::prelude::*;

pub use page::{control_target, KickPage, CONTROL_CLASS, CONTROL_KIND_ATTR, CONTROL_VALUE_ATTR};
pub use player::KickPlayer;

#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

// =============================================================================
// Content Script
// =============================================================================

/// Start filtering the current page.
#[wasm_bindgen]
pub async fn start_content() -> Result<(), JsValue> {
    runtime::start().await
}

/// Stop filtering. Elements already hidden stay hidden.
#[wasm_bindgen]
pub fn stop_content() {
    runtime::stop();
}

// =============================================================================
// Options API
// =============================================================================

fn parse_kind(kind: &str) -> Result<ListKind, JsValue> {
    ListKind::from_key(kind).ok_or_else(|| JsValue::from_str(&format!("Unknown list: {}", kind)))
}

async fn load_store(kinds: &[ListKind]) -> Result<BlocklistStore<MemoryStore>, JsValue> {
    let keys: Vec<&str> = kinds.iter().map(|kind| kind.storage_key()).collect();
    let object = storage::load_keys(&keys).await?;
    Ok(BlocklistStore::new(MemoryStore::from_object(object)))
}

async fn persist(store: &BlocklistStore<MemoryStore>, kind: ListKind) -> Result<(), JsValue> {
    let value = store
        .encoded(kind)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    storage::save(kind.storage_key(), &value).await
}

/// Pretty-printed JSON array of one list, for download.
#[wasm_bindgen]
pub async fn export_list(kind: String) -> Result<String, JsValue> {
    let kind = parse_kind(&kind)?;
    let store = load_store(&[kind]).await?;
    Ok(store.export(kind))
}

#[wasm_bindgen]
pub fn export_file_name(kind: &str) -> Result<String, JsValue> {
    Ok(parse_kind(kind)?.export_file_name())
}

/// Merge an import file into a list. Rejects with a readable message when
/// the file is invalid; the stored list is untouched in that case.
#[wasm_bindgen]
pub async fn import_list(kind: String, text: String) -> Result<JsValue, JsValue> {
    let kind = parse_kind(&kind)?;
    let mut store = load_store(&[kind]).await?;
    let summary = store
        .import(kind, &text)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    persist(&store, kind).await?;

    let result = Object::new();
    let _ = Reflect::set(&result, &"before".into(), &JsValue::from(summary.before as u32));
    let _ = Reflect::set(&result, &"imported".into(), &JsValue::from(summary.imported as u32));
    let _ = Reflect::set(&result, &"after".into(), &JsValue::from(summary.after as u32));
    let _ = Reflect::set(&result, &"added".into(), &JsValue::from(summary.added() as u32));
    Ok(result.into())
}

/// Add one entry. Resolves to false if it was already present.
#[wasm_bindgen]
pub async fn add_entry(kind: String, value: String) -> Result<bool, JsValue> {
    let kind = parse_kind(&kind)?;
    let mut store = load_store(&[kind]).await?;
    let added = store
        .add(kind, &value)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    if added {
        persist(&store, kind).await?;
    }
    Ok(added)
}

/// Remove one entry. Resolves to false if it was not present.
#[wasm_bindgen]
pub async fn remove_entry(kind: String, value: String) -> Result<bool, JsValue> {
    let kind = parse_kind(&kind)?;
    let mut store = load_store(&[kind]).await?;
    let removed = store
        .remove(kind, &value)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    if removed {
        persist(&store, kind).await?;
    }
    Ok(removed)
}

#[wasm_bindgen]
pub async fn clear_list(kind: String) -> Result<(), JsValue> {
    let kind = parse_kind(&kind)?;
    let mut store = load_store(&[kind]).await?;
    store
        .clear(kind)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    persist(&store, kind).await
}

#[wasm_bindgen]
pub async fn list_entries(kind: String) -> Result<JsValue, JsValue> {
    let kind = parse_kind(&kind)?;
    let store = load_store(&[kind]).await?;
    let entries: Array = store
        .get_list(kind)
        .iter()
        .map(|entry| JsValue::from_str(entry))
        .collect();
    Ok(entries.into())
}

/// Entry counts keyed by storage key.
#[wasm_bindgen]
pub async fn blocklist_counts() -> Result<JsValue, JsValue> {
    let store = load_store(&ListKind::ALL).await?;
    let result = Object::new();
    for kind in ListKind::ALL {
        let count = store.get_list(kind).len() as u32;
        let _ = Reflect::set(&result, &kind.storage_key().into(), &JsValue::from(count));
    }
    Ok(result.into())
}
