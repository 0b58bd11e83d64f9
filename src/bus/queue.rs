//! Async message queues decoupling chat surfaces from the pipeline.
//!
//! Surfaces push onto the inbound queue; the pipeline worker drains it one
//! message at a time and pushes replies onto the outbound queue. Both sides
//! use `tokio::sync::mpsc::unbounded_channel`; the bus clones cheaply because
//! all internal state is behind `Arc`.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::bus::events::{InboundMessage, OutboundMessage};

#[derive(Clone)]
pub struct MessageBus {
    inbound_tx: UnboundedSender<InboundMessage>,
    inbound_rx: Arc<Mutex<UnboundedReceiver<InboundMessage>>>,
    outbound_tx: UnboundedSender<OutboundMessage>,
    outbound_rx: Arc<Mutex<UnboundedReceiver<OutboundMessage>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
        }
    }

    pub fn publish_inbound(&self, msg: InboundMessage) {
        let _ = self.inbound_tx.send(msg);
    }

    /// Next inbound message; `None` once all senders are dropped.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    pub fn publish_outbound(&self, msg: OutboundMessage) {
        let _ = self.outbound_tx.send(msg);
    }

    /// Next outbound message; `None` once all senders are dropped.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inbound_publish_consume() {
        let bus = MessageBus::new();
        bus.publish_inbound(InboundMessage::new("cli", "user1", "chat1", "hello"));

        let received = bus.consume_inbound().await.unwrap();
        assert_eq!(received.channel, "cli");
        assert_eq!(received.content, "hello");
    }

    #[tokio::test]
    async fn test_outbound_publish_consume() {
        let bus = MessageBus::new();
        bus.publish_outbound(OutboundMessage::new("cli", "chat1", "reply"));

        let received = bus.consume_outbound().await.unwrap();
        assert_eq!(received.content, "reply");
    }

    #[tokio::test]
    async fn test_ordering_preserved() {
        let bus = MessageBus::new();
        for i in 0..5 {
            bus.publish_inbound(InboundMessage::new("cli", "u", "c", format!("m{i}")));
        }
        for i in 0..5 {
            let msg = bus.consume_inbound().await.unwrap();
            assert_eq!(msg.content, format!("m{i}"));
        }
    }
}
