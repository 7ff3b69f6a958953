//! Extension API bridge
//!
//! Firefox exposes the WebExtension API as `browser`, Chromium as `chrome`.
//! Both return promises from `storage.local` when no callback is passed, so
//! one code path serves both.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// The extension API namespace of the current browser.
pub fn extension_api() -> Result<JsValue, JsValue> {
    let global = js_sys::global();
    for name in ["browser", "chrome"] {
        let api = Reflect::get(&global, &JsValue::from_str(name))?;
        if api.is_object() {
            return Ok(api);
        }
    }
    Err(JsValue::from_str("Extension API is not available"))
}

fn lookup(root: &JsValue, path: &[&str]) -> Result<JsValue, JsValue> {
    let mut current = root.clone();
    for segment in path {
        current = Reflect::get(&current, &JsValue::from_str(segment))?;
        if !current.is_object() {
            return Err(JsValue::from_str(&format!("Missing extension API: {}", path.join("."))));
        }
    }
    Ok(current)
}

fn call(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let func: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    Reflect::apply(&func, target, args)
}

async fn call_async(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let promise: Promise = call(target, method, args)?.dyn_into()?;
    JsFuture::from(promise).await
}

fn local_area() -> Result<JsValue, JsValue> {
    lookup(&extension_api()?, &["storage", "local"])
}

// =============================================================================
// Value Conversion
// =============================================================================

/// JS value to JSON. `undefined` (and anything unserializable) is `None`.
pub fn to_json(value: &JsValue) -> Option<Value> {
    if value.is_undefined() {
        return None;
    }
    let text: String = js_sys::JSON::stringify(value).ok()?.into();
    serde_json::from_str(&text).ok()
}

pub fn from_json(value: &Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

// =============================================================================
// storage.local
// =============================================================================

/// Every stored key, as one JSON object.
pub async fn load_all() -> Result<Value, JsValue> {
    let result = call_async(&local_area()?, "get", &Array::of1(&JsValue::NULL)).await?;
    Ok(to_json(&result).unwrap_or(Value::Null))
}

/// The given keys, as one JSON object (absent keys are omitted).
pub async fn load_keys(keys: &[&str]) -> Result<Value, JsValue> {
    let list: Array = keys.iter().map(|key| JsValue::from_str(key)).collect();
    let result = call_async(&local_area()?, "get", &Array::of1(&list)).await?;
    Ok(to_json(&result).unwrap_or(Value::Null))
}

pub async fn save(key: &str, value: &Value) -> Result<(), JsValue> {
    let items = Object::new();
    Reflect::set(&items, &JsValue::from_str(key), &from_json(value)?)?;
    call_async(&local_area()?, "set", &Array::of1(&items)).await?;
    Ok(())
}

/// Register a `storage.onChanged` listener for the local area. The callback
/// receives each changed key with its new value (`None` when removed).
pub fn on_changed<F>(mut callback: F) -> Result<(), JsValue>
where
    F: FnMut(String, Option<Value>) + 'static,
{
    let event = lookup(&extension_api()?, &["storage", "onChanged"])?;
    let listener = Closure::wrap(Box::new(move |changes: JsValue, area: JsValue| {
        if area.as_string().as_deref() != Some("local") {
            return;
        }
        if !changes.is_object() {
            return;
        }
        let keys = Object::keys(changes.unchecked_ref::<Object>());
        for key in keys.iter().filter_map(|key| key.as_string()) {
            let new_value = Reflect::get(&changes, &JsValue::from_str(&key))
                .and_then(|change| Reflect::get(&change, &JsValue::from_str("newValue")))
                .ok()
                .and_then(|value| to_json(&value));
            callback(key, new_value);
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    call(&event, "addListener", &Array::of1(listener.as_ref()))?;
    listener.forget();
    Ok(())
}

/// Register a `runtime.onMessage` listener. Messages are delivered as JSON
/// and never answered.
pub fn on_message<F>(mut callback: F) -> Result<(), JsValue>
where
    F: FnMut(Value) + 'static,
{
    let event = lookup(&extension_api()?, &["runtime", "onMessage"])?;
    let listener = Closure::wrap(Box::new(move |message: JsValue| {
        if let Some(message) = to_json(&message) {
            callback(message);
        }
    }) as Box<dyn FnMut(JsValue)>);
    call(&event, "addListener", &Array::of1(listener.as_ref()))?;
    listener.forget();
    Ok(())
}
