//! WebSocket message envelope
//!
//! Every message delivered over a session transport uses this shape:
//! `{type, call_id, data, timestamp}`. The `data` payload is untyped at the
//! envelope level; handlers interpret it per message type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type (heartbeat, queue_update, call_update, pipeline_result, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Call this message belongs to. Empty for room broadcasts.
    #[serde(default)]
    pub call_id: String,
    /// Type-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Emission time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope with the current timestamp
    pub fn new(kind: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            call_id: call_id.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Heartbeat keepalive message
    pub fn heartbeat(call_id: impl Into<String>) -> Self {
        Self::new("heartbeat", call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_shape() {
        let env = Envelope::heartbeat("call-1");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["call_id"], "call-1");
        assert!(json.get("data").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn round_trips_payload() {
        let env = Envelope::new("call_update", "").with_data(serde_json::json!({"queue": "sales"}));
        let text = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind, "call_update");
        assert_eq!(back.data.unwrap()["queue"], "sales");
    }
}
