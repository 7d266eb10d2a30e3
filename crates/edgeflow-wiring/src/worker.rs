//! Worker-process entry point (`SPEC_FULL.md` §4.5).
//!
//! A re-exec'd worker calls [`run_worker`] with its own `NODE_NAME`. If the registry has no
//! factory for that name, or the factory panics while constructing the node, this substitutes
//! the **framework-error node**: a producer-shaped stand-in emitting a `LOAD FAIL` frame on every
//! wired output edge, so a downstream gateway always sees something rather than silently
//! starving.

use std::{sync::Arc, time::Duration};

use edgeflow_core::{Broker, BrokerConfig, InMemoryBroker};
use edgeflow_node::{
    WiringConfig, apply_wiring,
    errorframe::{ErrorKind, render_error_frame},
};
use edgeflow_proto::{Frame, MetaMap};
use serde::Deserialize;

use crate::registry;

const LOAD_FAILURE_PERIOD: Duration = Duration::from_secs(1);

/// Run the node named by `NODE_NAME` to completion (producers/the framework-error node end on
/// their own terms; consumers and the gateway run until the process is terminated).
pub async fn run_worker(node_name: &str) {
    let Some(factory) = registry::factory_for(node_name) else {
        tracing::error!(node = node_name, "no node factory registered for this name");
        return run_framework_error_node(node_name).await;
    };

    match std::panic::catch_unwind(factory) {
        Ok(run) => run.await,
        Err(_) => {
            tracing::error!(node = node_name, "node factory panicked while constructing the node");
            run_framework_error_node(node_name).await;
        }
    }
}

/// Just enough of `NODE_CONFIG` to wire output edges: the sources/targets every node config
/// shares, plus the broker a real node would have reconnected to.
#[derive(Debug, Deserialize, Default)]
struct MinimalNodeConfig {
    #[serde(flatten)]
    wiring: WiringConfig,
    #[serde(default)]
    broker: Option<BrokerConfig>,
}

async fn run_framework_error_node(node_name: &str) {
    let config: MinimalNodeConfig =
        std::env::var("NODE_CONFIG").ok().and_then(|raw| serde_json::from_str(&raw).ok()).unwrap_or_default();

    let broker: Arc<dyn Broker> =
        config.broker.map_or_else(|| Arc::new(InMemoryBroker::new()) as Arc<dyn Broker>, |cfg| cfg.connect());
    let (handlers, _sources) = apply_wiring(node_name, &config.wiring, &broker);

    let message = format!("node {node_name} failed to load");
    tracing::error!(node = node_name, "substituting framework-error node");

    loop {
        let now = wall_clock_secs_f64();
        let payload = render_error_frame(ErrorKind::LoadFailure, &message, now);
        let frame = Frame::new(0, now, MetaMap::new(), payload);
        for handler in &handlers {
            handler.send(&frame).await;
        }
        tokio::time::sleep(LOAD_FAILURE_PERIOD).await;
    }
}

fn wall_clock_secs_f64() -> f64 {
    #[allow(clippy::disallowed_methods)]
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{kind::NodeKind, registry};

    fn noop() -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn panics() -> BoxFuture<'static, ()> {
        panic!("camera init failed")
    }

    #[tokio::test]
    async fn runs_the_registered_factory() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();
        registry::intern("worker-ok", NodeKind::Producer, noop, serde_json::Value::Null);

        run_worker("worker-ok").await;
    }

    #[tokio::test]
    async fn missing_node_falls_back_without_hanging_forever() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();

        let handle = tokio::spawn(run_worker("does-not-exist"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "framework-error node loops forever until terminated");
        handle.abort();
    }

    #[test]
    fn panicking_factory_is_caught() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();
        registry::intern("panics", NodeKind::Producer, panics, serde_json::Value::Null);

        let factory = registry::factory_for("panics").unwrap();
        assert!(std::panic::catch_unwind(factory).is_err());
    }
}
