//! Event types for the message bus.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Message received from a chat surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Surface name (e.g. "cli", "gateway").
    pub channel: String,
    /// Sender identifier within the surface.
    pub sender_id: String,
    /// Chat/conversation identifier.
    pub chat_id: String,
    /// Message text content.
    pub content: String,
    /// Origin tag: "user" for root messages, "seq-step-N" for planner steps,
    /// "reminder" for timer-driven delivery. Telemetry records it verbatim.
    #[serde(default = "default_source")]
    pub source: String,
    /// When the message was received.
    #[serde(default = "now")]
    pub timestamp: DateTime<Local>,
}

fn now() -> DateTime<Local> {
    Local::now()
}

fn default_source() -> String {
    "user".to_string()
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            source: default_source(),
            timestamp: Local::now(),
        }
    }

    /// Derive a step message re-entering the pipeline from a plan.
    pub fn step(&self, index: usize, text: impl Into<String>) -> Self {
        let mut msg = self.clone();
        msg.content = text.into();
        msg.source = format!("seq-step-{index}");
        msg.timestamp = Local::now();
        msg
    }
}

/// Message to send back to a chat surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_defaults() {
        let msg = InboundMessage::new("cli", "user1", "chat42", "hello");
        assert_eq!(msg.source, "user");
        assert_eq!(msg.chat_id, "chat42");
    }

    #[test]
    fn test_step_derivation() {
        let root = InboundMessage::new("cli", "user1", "chat1", "first a then b");
        let step = root.step(2, "b");
        assert_eq!(step.source, "seq-step-2");
        assert_eq!(step.content, "b");
        assert_eq!(step.chat_id, root.chat_id);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let msg = InboundMessage::new("gateway", "u1", "c1", "test");
        let json = serde_json::to_string(&msg).unwrap();
        let back: InboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "test");
        assert_eq!(back.source, "user");
    }
}
