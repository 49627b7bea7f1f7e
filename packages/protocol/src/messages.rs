//! # Wire Messages
//!
//! Field names and `type` tags are part of the wire contract with the
//! bootstrap script and must not change.

use serde::{Deserialize, Serialize};

/// One independently editable unit of page content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    /// Stable identity, never changes after creation
    pub id: String,

    /// Semantic tag such as "hero" or "features"; opaque to sync
    pub kind: String,

    /// Surface-ready serialized content
    pub markup: String,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            markup: markup.into(),
        }
    }
}

/// Host → surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    Sync {
        blocks: Vec<Block>,
        #[serde(rename = "selectedId")]
        selected_id: Option<String>,
    },
}

/// Surface → host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceMessage {
    /// Full new inner markup of exactly one block
    Change { id: String, content: String },

    /// Click landed inside a block container
    Select { id: String },

    /// Bootstrap finished attaching listeners
    Ready,
}

impl HostMessage {
    pub fn sync(blocks: &[Block], selected_id: Option<&str>) -> Self {
        HostMessage::Sync {
            blocks: blocks.to_vec(),
            selected_id: selected_id.map(str::to_string),
        }
    }

    pub fn to_wire(&self) -> String {
        encode(self)
    }
}

impl SurfaceMessage {
    pub fn to_wire(&self) -> String {
        encode(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceMessage::Change { .. } => "CHANGE",
            SurfaceMessage::Select { .. } => "SELECT",
            SurfaceMessage::Ready => "READY",
        }
    }
}

fn encode<T: Serialize>(message: &T) -> String {
    // Plain structs of strings cannot fail to serialize
    serde_json::to_string(message).unwrap_or_default()
}

/// Decode an inbound surface message. Total: anything malformed is `None`.
pub fn decode_surface_message(raw: &str) -> Option<SurfaceMessage> {
    match serde_json::from_str::<SurfaceMessage>(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(error = %e, raw_len = raw.len(), "Dropping malformed surface message");
            None
        }
    }
}

/// Decode an inbound host message. Total: anything malformed is `None`.
pub fn decode_host_message(raw: &str) -> Option<HostMessage> {
    match serde_json::from_str::<HostMessage>(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(error = %e, raw_len = raw.len(), "Dropping malformed host message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_wire_format() {
        let msg = HostMessage::sync(&[Block::new("hero-1", "hero", "<h1>Hi</h1>")], Some("hero-1"));
        let value: serde_json::Value = serde_json::from_str(&msg.to_wire()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "SYNC",
                "blocks": [{"id": "hero-1", "kind": "hero", "markup": "<h1>Hi</h1>"}],
                "selectedId": "hero-1",
            })
        );
    }

    #[test]
    fn test_sync_without_selection_serializes_null() {
        let msg = HostMessage::sync(&[], None);
        let value: serde_json::Value = serde_json::from_str(&msg.to_wire()).unwrap();
        assert_eq!(value["selectedId"], serde_json::Value::Null);
    }

    #[test]
    fn test_surface_wire_format() {
        let change = SurfaceMessage::Change {
            id: "hero-1".to_string(),
            content: "<h1>New</h1>".to_string(),
        };
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&change.to_wire()).unwrap(),
            json!({"type": "CHANGE", "id": "hero-1", "content": "<h1>New</h1>"})
        );
        assert_eq!(SurfaceMessage::Ready.to_wire(), r#"{"type":"READY"}"#);
    }

    #[test]
    fn test_decode_valid_messages() {
        assert_eq!(
            decode_surface_message(r#"{"type":"SELECT","id":"b2"}"#),
            Some(SurfaceMessage::Select { id: "b2".to_string() })
        );
        assert_eq!(
            decode_surface_message(r#"{"type":"READY","extra":1}"#),
            Some(SurfaceMessage::Ready)
        );
    }

    #[test]
    fn test_decode_is_total() {
        for raw in [
            "not json",
            "",
            "null",
            "[]",
            r#"{"id":"x"}"#,
            r#"{"type":"NOPE"}"#,
            r#"{"type":"CHANGE"}"#,
            r#"{"type":"CHANGE","id":"x"}"#,
            r#"{"type":"SELECT","id":5}"#,
            r#"{"type":"SYNC","blocks":[],"selectedId":null}"#,
        ] {
            assert_eq!(decode_surface_message(raw), None, "input: {}", raw);
        }

        assert_eq!(decode_host_message(r#"{"type":"READY"}"#), None);
        assert_eq!(decode_host_message(r#"{"type":"SYNC"}"#), None);
    }

    #[test]
    fn test_decode_sync_with_missing_selection() {
        // Absent and null selection are the same thing on the wire
        let msg = decode_host_message(r#"{"type":"SYNC","blocks":[]}"#);
        assert_eq!(
            msg,
            Some(HostMessage::Sync {
                blocks: vec![],
                selected_id: None
            })
        );
    }
}
