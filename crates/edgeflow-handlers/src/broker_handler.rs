//! Handler publishing directly to a [`Broker`] topic.

use std::sync::Arc;

use async_trait::async_trait;
use edgeflow_core::Broker;
use edgeflow_proto::Frame;

use crate::handler::OutputHandler;

/// Publishes to `topic` on every send, re-applying the configured capacity so late changes to
/// an edge's QoS stay in effect.
///
/// Multiple outgoing edges from the same source node that target the same broker topic are
/// expected to share a single [`BrokerHandler`] instance (`_apply_wiring` collapses them), so the
/// capacity here is the edge's own, not a per-handler-instance count.
pub struct BrokerHandler {
    broker: Arc<dyn Broker>,
    topic: String,
    capacity: usize,
}

impl BrokerHandler {
    /// Build a handler publishing to `topic` at the given queue `capacity`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, topic: impl Into<String>, capacity: usize) -> Self {
        Self { broker, topic: topic.into(), capacity }
    }
}

#[async_trait]
impl OutputHandler for BrokerHandler {
    async fn send(&self, frame: &Frame) {
        self.broker.push(&self.topic, frame.to_bytes()).await;
        self.broker.trim(&self.topic, self.capacity).await;
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use edgeflow_core::InMemoryBroker;
    use edgeflow_proto::MetaMap;

    use super::*;

    #[tokio::test]
    async fn send_publishes_and_trims() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        let handler = BrokerHandler::new(broker.clone(), "cam", 1);

        for id in 0..5u32 {
            let frame = Frame::new(id, 0.0, MetaMap::new(), b"x".to_vec());
            handler.send(&frame).await;
        }

        assert_eq!(broker.queue_size("cam").await, 1);
        let popped = broker.pop("cam", Duration::from_millis(10)).await.unwrap();
        assert_eq!(Frame::decode(&popped).unwrap().frame_id, 4);
    }
}
