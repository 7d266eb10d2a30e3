//! Producer lifecycle: paces a user's `produce()` at a fixed FPS and dispatches frames.

use std::{sync::Arc, time::Duration};

use edgeflow_core::Environment;
use edgeflow_handlers::OutputHandler;
use edgeflow_proto::{Frame, MetaMap};

use crate::{
    errorframe::{ErrorKind, render_error_frame},
    state::NodeState,
};

/// User-overridable producer logic. The framework owns pacing, frame wrapping, and error
/// recovery; this trait is the "Arduino-style `loop()`" the original draws from.
pub trait ProducerNode: Send {
    /// Called once before the first `produce()`. A `Err` permanently swaps the driver into a
    /// setup-error loop (`SPEC_FULL.md` §4.4) rather than aborting the process.
    fn setup(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Produce the next payload, or `Ok(None)` to end the stream gracefully. `Err` is treated as
    /// a single failed cycle: a runtime-error frame is emitted and the driver continues.
    fn produce(&mut self) -> Result<Option<Vec<u8>>, String>;

    /// Called once after the loop ends, on any exit path.
    fn teardown(&mut self) {}
}

/// Drives a [`ProducerNode`] at a fixed frame rate, wrapping its output into [`Frame`]s with an
/// incrementing id and dispatching each to every wired output handler.
pub struct ProducerDriver<N: ProducerNode, E: Environment> {
    name: String,
    node: N,
    fps: f64,
    handlers: Vec<Arc<dyn OutputHandler>>,
    env: E,
    state: NodeState,
    frame_id: u32,
}

impl<N: ProducerNode, E: Environment> ProducerDriver<N, E> {
    /// Build a driver for `node`, pacing at `fps` and dispatching to `handlers`.
    #[must_use]
    pub fn new(name: impl Into<String>, node: N, fps: f64, handlers: Vec<Arc<dyn OutputHandler>>, env: E) -> Self {
        Self {
            name: name.into(),
            node,
            fps,
            handlers,
            env,
            state: NodeState::Healthy,
            frame_id: 0,
        }
    }

    /// Run until `produce()` returns `Ok(None)`. Never returns `Err` — setup and runtime
    /// failures degrade the node to a visible error stream instead of propagating.
    pub async fn run(mut self) {
        if let Err(message) = self.node.setup() {
            tracing::error!(node = %self.name, %message, "producer setup failed");
            self.state = NodeState::SetupFailed(message);
        }

        loop {
            let cycle_start = self.env.now();

            match self.state.clone() {
                NodeState::Healthy => match self.node.produce() {
                    Ok(Some(payload)) => self.dispatch(payload.into()).await,
                    Ok(None) => break,
                    Err(message) => {
                        tracing::warn!(node = %self.name, %message, "producer cycle failed");
                        let frame = render_error_frame(ErrorKind::RuntimeError, &message, self.env.wall_clock_secs_f64());
                        self.dispatch(frame).await;
                        self.env.sleep(Duration::from_secs(1)).await;
                    }
                },
                NodeState::SetupFailed(message) => {
                    let frame = render_error_frame(ErrorKind::SetupError, &message, self.env.wall_clock_secs_f64());
                    self.dispatch(frame).await;
                }
            }

            let period = Duration::from_secs_f64(1.0 / self.fps.max(f64::MIN_POSITIVE));
            let elapsed = self.env.now() - cycle_start;
            if elapsed < period {
                self.env.sleep(period - elapsed).await;
            }
        }

        self.node.teardown();
    }

    async fn dispatch(&mut self, payload: bytes::Bytes) {
        let frame = Frame::new(self.frame_id, self.env.wall_clock_secs_f64(), MetaMap::new(), payload);
        self.frame_id = self.frame_id.wrapping_add(1);
        for handler in &self.handlers {
            handler.send(&frame).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use edgeflow_core::{Broker, InMemoryBroker};
    use edgeflow_handlers::BrokerHandler;

    use super::*;

    struct CountingProducer {
        remaining: u32,
        setup_called: bool,
    }

    impl ProducerNode for CountingProducer {
        fn setup(&mut self) -> Result<(), String> {
            self.setup_called = true;
            Ok(())
        }

        fn produce(&mut self) -> Result<Option<Vec<u8>>, String> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(vec![self.remaining as u8]))
        }
    }

    struct FailingSetupProducer;

    impl ProducerNode for FailingSetupProducer {
        fn setup(&mut self) -> Result<(), String> {
            Err("camera not found".to_string())
        }

        fn produce(&mut self) -> Result<Option<Vec<u8>>, String> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn produces_configured_number_of_frames() {
        let broker: std::sync::Arc<dyn Broker> = std::sync::Arc::new(InMemoryBroker::new());
        let handler: std::sync::Arc<dyn OutputHandler> =
            std::sync::Arc::new(BrokerHandler::new(broker.clone(), "cam", 100));
        let driver = ProducerDriver::new(
            "cam",
            CountingProducer { remaining: 3, setup_called: false },
            1000.0,
            vec![handler],
            edgeflow_core::SystemEnv::new(),
        );
        driver.run().await;

        assert_eq!(broker.queue_size("cam").await, 3);
    }

    #[tokio::test]
    async fn setup_failure_emits_error_frames_instead_of_crashing() {
        let broker: std::sync::Arc<dyn Broker> = std::sync::Arc::new(InMemoryBroker::new());
        let handler: std::sync::Arc<dyn OutputHandler> =
            std::sync::Arc::new(BrokerHandler::new(broker.clone(), "cam", 1));

        let driver = ProducerDriver::new(
            "cam",
            FailingSetupProducer,
            200.0,
            vec![handler],
            edgeflow_core::SystemEnv::new(),
        );

        let handle = tokio::spawn(driver.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();

        assert!(broker.queue_size("cam").await > 0, "setup-failed node should still emit frames");
    }
}
