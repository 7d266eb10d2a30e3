//! Worked pipeline: `camera` (producer) feeds `detector` (consumer) over the broker, `detector`
//! feeds `gateway` over TCP. One binary plays both the orchestrator and every worker role,
//! exactly as `edgeflow-wiring` expects (`SPEC_FULL.md` §4.5, §4.6).
//!
//! Orchestrator mode (`NODE_NAME` unset): builds the [`edgeflow_wiring::System`], wires the
//! edges, and calls [`edgeflow_wiring::run`], which re-execs this very binary once per node with
//! `NODE_NAME` set.
//!
//! Worker mode (`NODE_NAME` set): delegates straight to [`edgeflow_wiring::run_worker`].

mod camera;
mod detector;

use std::sync::Arc;

use camera::CameraNode;
use detector::DetectorNode;
use edgeflow_core::{Broker, BrokerConfig, SystemEnv};
use edgeflow_gateway::GatewayConfig;
use edgeflow_node::{ConsumerDriver, ProducerDriver, WiringConfig, apply_wiring};
use edgeflow_proto::Qos;
use edgeflow_wiring::{NodeKind, System, link, run, run_worker};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Wiring plus the one node-specific parameter the camera reads from `NODE_CONFIG`.
#[derive(Debug, Deserialize)]
struct CameraConfig {
    #[serde(flatten)]
    wiring: WiringConfig,
    broker: Option<BrokerConfig>,
    #[serde(default = "default_fps")]
    fps: f64,
}

fn default_fps() -> f64 {
    15.0
}

/// Wiring only — the detector has no node-specific parameters of its own.
#[derive(Debug, Deserialize, Default)]
struct DetectorConfig {
    #[serde(flatten)]
    wiring: WiringConfig,
    broker: Option<BrokerConfig>,
}

fn node_config_env() -> String {
    std::env::var("NODE_CONFIG").unwrap_or_default()
}

fn resolve_broker(config: Option<BrokerConfig>) -> Arc<dyn Broker> {
    config.unwrap_or(BrokerConfig::InMemory).connect()
}

fn camera_factory() -> BoxFuture<'static, ()> {
    Box::pin(async {
        let config: CameraConfig =
            serde_json::from_str(&node_config_env()).unwrap_or_else(|_| CameraConfig {
                wiring: WiringConfig::default(),
                broker: None,
                fps: default_fps(),
            });
        let broker = resolve_broker(config.broker);
        let (handlers, _sources) = apply_wiring("camera", &config.wiring, &broker);

        ProducerDriver::new("camera", CameraNode::new(), config.fps, handlers, SystemEnv::new()).run().await;
    })
}

fn detector_factory() -> BoxFuture<'static, ()> {
    Box::pin(async {
        let config: DetectorConfig = serde_json::from_str(&node_config_env()).unwrap_or_default();
        let broker = resolve_broker(config.broker);
        let (handlers, sources) = apply_wiring("detector", &config.wiring, &broker);
        let input = sources.first().cloned().unwrap_or(edgeflow_core::SourceSpec {
            name: "camera".to_string(),
            qos: Qos::Realtime,
        });

        ConsumerDriver::new("detector", DetectorNode, broker, input.name, input.qos, handlers).run().await;
    })
}

fn gateway_factory() -> BoxFuture<'static, ()> {
    Box::pin(async {
        if let Err(error) = edgeflow_gateway::serve(GatewayConfig::from_env()).await {
            tracing::error!(%error, "gateway exited with an error");
        }
    })
}

fn build_system() -> System {
    let broker: Arc<dyn Broker> = Arc::new(edgeflow_core::InMemoryBroker::new());
    let mut system = System::new(broker);

    let camera = system.node("camera", NodeKind::Producer, camera_factory, serde_json::json!({ "fps": 15.0 }));
    let detector = system.node("detector", NodeKind::Consumer, detector_factory, serde_json::Value::Null);
    let gateway = system.node("gateway", NodeKind::Gateway, gateway_factory, serde_json::Value::Null);

    link(&camera).to(&detector, None, Qos::Realtime).to(&gateway, None, Qos::Realtime);

    system
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    // Every invocation — orchestrator or re-exec'd worker — registers the same nodes first, so
    // the process-wide registry a worker consults is always populated identically.
    let system = build_system();

    if let Ok(node_name) = std::env::var("NODE_NAME") {
        run_worker(&node_name).await;
        return Ok(());
    }

    run(&[system]).await?;
    Ok(())
}
