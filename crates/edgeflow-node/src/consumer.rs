//! Consumer lifecycle: pops frames from a single input topic, runs user logic, and forwards the
//! result.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use edgeflow_core::Broker;
use edgeflow_handlers::OutputHandler;
use edgeflow_proto::{Frame, MetaMap, Qos};

use crate::{
    errorframe::{ErrorKind, render_error_frame},
    state::NodeState,
};

const POP_TIMEOUT: Duration = Duration::from_secs(1);

/// User-overridable consumer logic.
pub trait ConsumerNode: Send {
    /// Called once before the first `process()`.
    fn setup(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Transform an input payload into an output payload (optionally with fresh metadata), or
    /// `Ok(None)` to drop the frame silently. `Err` is logged and the iteration is skipped —
    /// unlike the producer, a consumer does not emit an error frame per failed cycle, since a
    /// skipped detection is a normal outcome, not a stream-ending failure.
    fn process(&mut self, payload: &Bytes) -> Result<Option<(Vec<u8>, MetaMap)>, String>;

    /// Called once after the loop ends.
    fn teardown(&mut self) {}
}

/// Drives a [`ConsumerNode`]: pops from its input topic (using the QoS-appropriate pop method),
/// decodes, runs user logic, and re-wraps the result preserving `frame_id`/`timestamp` before
/// dispatching to output handlers.
pub struct ConsumerDriver<N: ConsumerNode> {
    name: String,
    node: N,
    broker: Arc<dyn Broker>,
    input_topic: String,
    input_qos: Qos,
    handlers: Vec<Arc<dyn OutputHandler>>,
    state: NodeState,
}

impl<N: ConsumerNode> ConsumerDriver<N> {
    /// Build a driver popping from `input_topic` at `input_qos`, dispatching results to
    /// `handlers`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        node: N,
        broker: Arc<dyn Broker>,
        input_topic: impl Into<String>,
        input_qos: Qos,
        handlers: Vec<Arc<dyn OutputHandler>>,
    ) -> Self {
        Self {
            name: name.into(),
            node,
            broker,
            input_topic: input_topic.into(),
            input_qos,
            handlers,
            state: NodeState::Healthy,
        }
    }

    /// Run forever, popping one frame per iteration. Intended to be spawned as its own task and
    /// aborted by the supervisor on shutdown — a consumer's input topic has no natural end, so
    /// there is no `teardown()` call here; the supervisor owns process-level cleanup.
    pub async fn run(mut self) {
        if let Err(message) = self.node.setup() {
            tracing::error!(node = %self.name, %message, "consumer setup failed");
            self.state = NodeState::SetupFailed(message);
        }

        loop {
            let popped = match self.input_qos {
                Qos::Realtime => self.broker.pop_latest(&self.input_topic, POP_TIMEOUT).await,
                Qos::Durable => self.broker.pop(&self.input_topic, POP_TIMEOUT).await,
            };
            let Some(raw) = popped else { continue };

            let Ok(frame) = Frame::decode(&raw) else {
                tracing::warn!(node = %self.name, "consumer dropped undecodable frame");
                continue;
            };

            if let NodeState::SetupFailed(message) = self.state.clone() {
                let error_frame = render_error_frame(ErrorKind::SetupError, &message, frame.timestamp);
                self.dispatch(frame.frame_id, frame.timestamp, MetaMap::new(), error_frame).await;
                continue;
            }

            match self.node.process(&frame.payload) {
                Ok(Some((payload, meta))) => {
                    self.dispatch(frame.frame_id, frame.timestamp, meta, payload.into()).await;
                }
                Ok(None) => {}
                Err(message) => {
                    tracing::warn!(node = %self.name, %message, "consumer cycle failed, skipping frame");
                }
            }
        }
    }

    async fn dispatch(&self, frame_id: u32, timestamp: f64, meta: MetaMap, payload: Bytes) {
        let frame = Frame::new(frame_id, timestamp, meta, payload);
        for handler in &self.handlers {
            handler.send(&frame).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use edgeflow_core::InMemoryBroker;
    use edgeflow_handlers::BrokerHandler;

    use super::*;

    struct Doubler;

    impl ConsumerNode for Doubler {
        fn process(&mut self, payload: &Bytes) -> Result<Option<(Vec<u8>, MetaMap)>, String> {
            let doubled: Vec<u8> = payload.iter().map(|b| b.wrapping_mul(2)).collect();
            Ok(Some((doubled, MetaMap::new())))
        }
    }

    #[tokio::test]
    async fn forwards_transformed_payload_preserving_frame_id() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        broker.trim("cam", 10).await;
        let input = Frame::new(5, 1.0, MetaMap::new(), vec![21]);
        broker.push("cam", input.to_bytes()).await;

        let out_handler: Arc<dyn OutputHandler> = Arc::new(BrokerHandler::new(broker.clone(), "yolo", 10));
        let driver =
            ConsumerDriver::new("yolo", Doubler, broker.clone(), "cam", Qos::Durable, vec![out_handler]);

        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        handle.abort();

        let popped = broker.pop("yolo", StdDuration::from_millis(10)).await.expect("should forward");
        let frame = Frame::decode(&popped).unwrap();
        assert_eq!(frame.frame_id, 5);
        assert_eq!(frame.payload.as_ref(), &[42]);
    }
}
