//! The `Activity` envelope and the conversation identity it carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single message-like object flowing between user and bot.
///
/// The engine only ever inspects `type`, `conversation.id`, and `from.id`.
/// Everything else is opaque and passed through unchanged, so callers can
/// carry arbitrary bot-schema extensions without this crate knowing about
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Activity(pub serde_json::Value);

impl Activity {
    /// Build an activity from any JSON-serializable value.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The activity's `type` field, if present and a string.
    #[must_use]
    pub fn activity_type(&self) -> Option<&str> {
        self.0.get("type").and_then(serde_json::Value::as_str)
    }

    /// The `conversation.id` field, if present and a string.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.0
            .get("conversation")
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_str)
    }

    /// The `from.id` field, if present and a string.
    #[must_use]
    pub fn from_id(&self) -> Option<&str> {
        self.0
            .get("from")
            .and_then(|f| f.get("id"))
            .and_then(serde_json::Value::as_str)
    }

    /// Borrow the underlying JSON value.
    #[must_use]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume the activity, returning the underlying JSON value.
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Activity {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A non-empty conversation identifier.
///
/// Once adopted by a [`ProtocolEngine`](crate::engine::ProtocolEngine), it is
/// never overwritten for the life of that engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Wrap a non-empty string as a conversation id.
    ///
    /// Returns `None` if `id` is empty — an empty conversation id is never
    /// valid on the wire.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_is_read_from_json() {
        let a = Activity::new(serde_json::json!({"type": "message"}));
        assert_eq!(a.activity_type(), Some("message"));
    }

    #[test]
    fn conversation_id_is_nested_field() {
        let a = Activity::new(serde_json::json!({"conversation": {"id": "c-1"}}));
        assert_eq!(a.conversation_id(), Some("c-1"));
    }

    #[test]
    fn missing_fields_return_none() {
        let a = Activity::new(serde_json::json!({}));
        assert_eq!(a.activity_type(), None);
        assert_eq!(a.conversation_id(), None);
        assert_eq!(a.from_id(), None);
    }

    #[test]
    fn empty_conversation_id_is_rejected() {
        assert!(ConversationId::new("").is_none());
    }

    #[test]
    fn non_empty_conversation_id_round_trips() {
        let id = ConversationId::new("c-00001").unwrap();
        assert_eq!(id.as_str(), "c-00001");
        assert_eq!(id.to_string(), "c-00001");
    }
}
