//! Persisted preferences
//!
//! A flat record of toggles and scalars. Every key is stored natively
//! (boolean, number or string) under its own storage key and read
//! independently, so one bad value only resets that one preference.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::quality::parse_preferred;
use crate::store::KeyValueStore;
use crate::types::ScanTargets;

pub const DEFAULT_QUALITY: &str = "1080";
pub const DEFAULT_BOOST: f64 = 1.0;

/// Storage keys of individual preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    Enabled,
    AutoQuality,
    PreferredQuality,
    VolumeBoost,
    DisableChatBlocking,
    DisableBlockButtons,
    EnableDanmaku,
    DisableActiveUsers,
    DisableSearchHistory,
}

impl PrefKey {
    pub const ALL: [PrefKey; 9] = [
        PrefKey::Enabled,
        PrefKey::AutoQuality,
        PrefKey::PreferredQuality,
        PrefKey::VolumeBoost,
        PrefKey::DisableChatBlocking,
        PrefKey::DisableBlockButtons,
        PrefKey::EnableDanmaku,
        PrefKey::DisableActiveUsers,
        PrefKey::DisableSearchHistory,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::AutoQuality => "autoQuality",
            Self::PreferredQuality => "preferredQuality",
            Self::VolumeBoost => "volumeBoost",
            Self::DisableChatBlocking => "disableChatBlocking",
            Self::DisableBlockButtons => "disableBlockButtons",
            Self::EnableDanmaku => "enableDanmaku",
            Self::DisableActiveUsers => "disableActiveUsers",
            Self::DisableSearchHistory => "disableSearchHistory",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Preferences {
    /// Master switch for all page filtering
    pub enabled: bool,
    /// Force the player to `preferred_quality` on stream pages
    pub auto_quality: bool,
    /// Pixel height as a string, e.g. "1080"
    pub preferred_quality: String,
    /// Gain multiplier for the audio boost
    pub volume_boost: f64,
    pub disable_chat_blocking: bool,
    pub disable_block_buttons: bool,
    pub enable_danmaku: bool,
    pub disable_active_users: bool,
    pub disable_search_history: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_quality: false,
            preferred_quality: DEFAULT_QUALITY.to_string(),
            volume_boost: DEFAULT_BOOST,
            disable_chat_blocking: false,
            disable_block_buttons: false,
            enable_danmaku: false,
            disable_active_users: false,
            disable_search_history: false,
        }
    }
}

impl Preferences {
    /// Read every preference from the store, defaulting per key.
    pub fn load<S: KeyValueStore>(store: &S) -> Self {
        let mut prefs = Self::default();
        for key in PrefKey::ALL {
            prefs.apply(key, store.get(key.as_str()).as_ref());
        }
        prefs
    }

    /// Update one field from a stored value. `None` or a mistyped value
    /// restores the default.
    pub fn apply(&mut self, key: PrefKey, value: Option<&Value>) {
        let defaults = Self::default();
        let flag = |default: bool| value.and_then(Value::as_bool).unwrap_or(default);
        match key {
            PrefKey::Enabled => self.enabled = flag(defaults.enabled),
            PrefKey::AutoQuality => self.auto_quality = flag(defaults.auto_quality),
            PrefKey::PreferredQuality => {
                self.preferred_quality = value
                    .and_then(quality_string)
                    .unwrap_or(defaults.preferred_quality);
            }
            PrefKey::VolumeBoost => {
                self.volume_boost = value.map(parse_boost).unwrap_or(DEFAULT_BOOST);
            }
            PrefKey::DisableChatBlocking => {
                self.disable_chat_blocking = flag(defaults.disable_chat_blocking)
            }
            PrefKey::DisableBlockButtons => {
                self.disable_block_buttons = flag(defaults.disable_block_buttons)
            }
            PrefKey::EnableDanmaku => self.enable_danmaku = flag(defaults.enable_danmaku),
            PrefKey::DisableActiveUsers => {
                self.disable_active_users = flag(defaults.disable_active_users)
            }
            PrefKey::DisableSearchHistory => {
                self.disable_search_history = flag(defaults.disable_search_history)
            }
        }
    }

    /// Native storage value for one preference.
    pub fn value_of(&self, key: PrefKey) -> Value {
        match key {
            PrefKey::Enabled => Value::Bool(self.enabled),
            PrefKey::AutoQuality => Value::Bool(self.auto_quality),
            PrefKey::PreferredQuality => Value::String(self.preferred_quality.clone()),
            PrefKey::VolumeBoost => serde_json::Number::from_f64(self.volume_boost)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PrefKey::DisableChatBlocking => Value::Bool(self.disable_chat_blocking),
            PrefKey::DisableBlockButtons => Value::Bool(self.disable_block_buttons),
            PrefKey::EnableDanmaku => Value::Bool(self.enable_danmaku),
            PrefKey::DisableActiveUsers => Value::Bool(self.disable_active_users),
            PrefKey::DisableSearchHistory => Value::Bool(self.disable_search_history),
        }
    }

    /// Preferred tier as a pixel height.
    pub fn preferred_tier(&self) -> Option<u32> {
        parse_preferred(&self.preferred_quality)
    }

    /// Page contexts the filter pass should visit.
    pub fn scan_targets(&self) -> ScanTargets {
        let mut targets = ScanTargets::ALL;
        if self.disable_chat_blocking {
            targets.remove(ScanTargets::CHAT);
        }
        targets
    }

    /// Whether block buttons are attached to page elements.
    pub fn block_controls(&self) -> bool {
        !self.disable_block_buttons
    }
}

fn quality_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a stored boost. Numbers and numeric strings are accepted; anything
/// non-finite, negative or unparsable is 1.0.
pub fn parse_boost(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(gain) if gain.is_finite() && gain >= 0.0 => gain,
        _ => DEFAULT_BOOST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_defaults_on_empty_store() {
        let prefs = Preferences::load(&MemoryStore::new());
        assert_eq!(prefs, Preferences::default());
        assert!(prefs.enabled);
        assert_eq!(prefs.preferred_tier(), Some(1080));
    }

    #[test]
    fn test_load_native_values() {
        let store = MemoryStore::from_object(json!({
            "enabled": false,
            "autoQuality": true,
            "preferredQuality": "480",
            "volumeBoost": 2.5,
            "disableChatBlocking": true,
            "enableDanmaku": true,
        }));
        let prefs = Preferences::load(&store);
        assert!(!prefs.enabled);
        assert!(prefs.auto_quality);
        assert_eq!(prefs.preferred_quality, "480");
        assert_eq!(prefs.volume_boost, 2.5);
        assert!(prefs.disable_chat_blocking);
        assert!(prefs.enable_danmaku);
        assert!(!prefs.disable_block_buttons);
    }

    #[test]
    fn test_bad_value_resets_only_that_key() {
        let store = MemoryStore::from_object(json!({
            "enabled": "yes",
            "autoQuality": true,
            "volumeBoost": "loud",
        }));
        let prefs = Preferences::load(&store);
        assert!(prefs.enabled);
        assert!(prefs.auto_quality);
        assert_eq!(prefs.volume_boost, DEFAULT_BOOST);
    }

    #[test]
    fn test_numeric_quality_is_accepted() {
        let mut prefs = Preferences::default();
        prefs.apply(PrefKey::PreferredQuality, Some(&json!(720)));
        assert_eq!(prefs.preferred_quality, "720");
        prefs.apply(PrefKey::PreferredQuality, None);
        assert_eq!(prefs.preferred_quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_parse_boost() {
        assert_eq!(parse_boost(&json!(3)), 3.0);
        assert_eq!(parse_boost(&json!("1.5")), 1.5);
        assert_eq!(parse_boost(&json!(-2)), 1.0);
        assert_eq!(parse_boost(&json!(null)), 1.0);
        assert_eq!(parse_boost(&json!("NaN")), 1.0);
    }

    #[test]
    fn test_derived_filter_options() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.scan_targets(), ScanTargets::ALL);
        assert!(prefs.block_controls());

        prefs.disable_chat_blocking = true;
        prefs.disable_block_buttons = true;
        assert!(!prefs.scan_targets().contains(ScanTargets::CHAT));
        assert!(prefs.scan_targets().contains(ScanTargets::CARDS));
        assert!(!prefs.block_controls());
    }

    #[test]
    fn test_pref_key_round_trip() {
        for key in PrefKey::ALL {
            assert_eq!(PrefKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(PrefKey::from_key("blockedChannels"), None);
    }

    #[test]
    fn test_value_of_round_trips_through_apply() {
        let source = Preferences {
            enabled: false,
            volume_boost: 4.0,
            preferred_quality: "360".into(),
            ..Preferences::default()
        };
        let mut copy = Preferences::default();
        for key in PrefKey::ALL {
            copy.apply(key, Some(&source.value_of(key)));
        }
        assert_eq!(copy, source);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["preferredQuality"], "1080");
        assert_eq!(json["disableSearchHistory"], false);
    }
}
