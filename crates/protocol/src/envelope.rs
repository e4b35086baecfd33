use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for every text message published to the broker.
///
/// Created at publish time, serialized exactly once; the id has no further
/// identity after serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMessage {
    pub id: Uuid,
    /// Logical destination tag the message was published under.
    pub server_tag: String,
    pub content: String,
}

impl EnrichedMessage {
    /// Wraps `content` for the given destination tag with a fresh id.
    pub fn new(server_tag: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            server_tag: server_tag.into(),
            content: content.into(),
        }
    }

    /// Serializes the envelope into its wire payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_fresh_ids() {
        let a = EnrichedMessage::new("server1", "hello");
        let b = EnrichedMessage::new("server1", "hello");
        assert_ne!(a.id, b.id);
        assert_eq!(a.server_tag, "server1");
        assert_eq!(a.content, "hello");
    }

    #[test]
    fn json_roundtrip() {
        let msg = EnrichedMessage::new("server2", r#"{"k":"v"}"#);
        let bytes = msg.to_bytes().unwrap();
        let parsed: EnrichedMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let msg = EnrichedMessage::new("server3", "x");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("serverTag").is_some());
        assert!(json.get("id").is_some());
        assert!(json.get("content").is_some());
    }
}
