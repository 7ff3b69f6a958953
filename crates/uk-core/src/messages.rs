//! Messages from the popup to the page
//!
//! Fire-and-forget: the page never replies.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "camelCase")]
#[ts(export)]
pub enum ContentMessage {
    /// Apply a quality now, reloading once if needed
    SetQuality {
        #[ts(type = "string | number")]
        quality: RequestedQuality,
    },
    /// Auto-quality settings changed; re-read them and re-apply
    UpdateQualitySettings,
}

impl ContentMessage {
    /// Parse a message object. Unknown actions yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

/// Quality sent by the popup. Older popups send a number, newer ones a
/// string; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestedQuality(String);

impl RequestedQuality {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestedQuality {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestedQuality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected quality string or number, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_set_quality() {
        let msg = ContentMessage::from_value(json!({"action": "setQuality", "quality": "720"}));
        assert_eq!(msg, Some(ContentMessage::SetQuality { quality: "720".into() }));

        let msg = ContentMessage::from_value(json!({"action": "setQuality", "quality": 480}));
        assert_eq!(msg, Some(ContentMessage::SetQuality { quality: "480".into() }));
    }

    #[test]
    fn test_parse_update_settings() {
        let msg = ContentMessage::from_value(json!({"action": "updateQualitySettings"}));
        assert_eq!(msg, Some(ContentMessage::UpdateQualitySettings));
    }

    #[test]
    fn test_unknown_messages_are_ignored() {
        assert_eq!(ContentMessage::from_value(json!({"action": "refresh"})), None);
        assert_eq!(ContentMessage::from_value(json!({"action": "setQuality"})), None);
        assert_eq!(ContentMessage::from_value(json!("setQuality")), None);
    }

    #[test]
    fn test_rejects_non_scalar_quality() {
        let msg = ContentMessage::from_value(json!({"action": "setQuality", "quality": [720]}));
        assert_eq!(msg, None);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(ContentMessage::UpdateQualitySettings).unwrap();
        assert_eq!(value, json!({"action": "updateQualitySettings"}));

        let value = serde_json::to_value(ContentMessage::SetQuality { quality: "720".into() }).unwrap();
        assert_eq!(value, json!({"action": "setQuality", "quality": "720"}));
    }
}
