//! Node config loading (`NODE_CONFIG` env var) and wiring application.

use std::sync::Arc;

use edgeflow_core::{Broker, Protocol, SourceSpec, TargetSpec};
use edgeflow_handlers::{BrokerHandler, OutputHandler, TcpHandler};
use serde::Deserialize;

use crate::error::Result;

/// The wiring half of a node's injected configuration: which topics it reads, and where its
/// output goes. Node-specific fields (`fps`, user parameters, ...) live in the caller's own
/// config type and are parsed from the same JSON blob independently — unknown fields here are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WiringConfig {
    /// Input edges, in the order they should be polled if a consumer round-robins sources.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Output edges.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

impl WiringConfig {
    /// Parse the wiring portion of a `NODE_CONFIG` JSON blob, defaulting to no edges when the
    /// variable is unset (a node run standalone, e.g. under a harness test).
    pub fn from_env() -> Result<Self> {
        match std::env::var("NODE_CONFIG") {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(_) => Ok(Self::default()),
        }
    }
}

fn gateway_host() -> String {
    std::env::var("GATEWAY_HOST").unwrap_or_else(|_| "localhost".to_string())
}

fn gateway_tcp_port() -> u16 {
    std::env::var("GATEWAY_TCP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080)
}

/// Build one [`OutputHandler`] per target edge, and collect the input topics (with QoS) for
/// source edges. Multiple broker-protocol targets collapse onto a single handler, since they
/// all publish to this node's own name as topic (`SPEC_FULL.md` §4.4).
#[must_use]
pub fn apply_wiring(
    own_name: &str,
    config: &WiringConfig,
    broker: &Arc<dyn Broker>,
) -> (Vec<Arc<dyn OutputHandler>>, Vec<SourceSpec>) {
    let mut handlers: Vec<Arc<dyn OutputHandler>> = Vec::new();
    let mut broker_handler_built = false;

    for target in &config.targets {
        match target.protocol {
            Protocol::Tcp => {
                let source_id = target.channel.clone().unwrap_or_else(|| own_name.to_string());
                handlers.push(Arc::new(TcpHandler::new(gateway_host(), gateway_tcp_port(), source_id)));
                tracing::info!(node = own_name, target = %target.name, "wired TCP edge");
            }
            Protocol::Broker => {
                if broker_handler_built {
                    continue;
                }
                let capacity = if target.qos == edgeflow_proto::Qos::Realtime {
                    1
                } else {
                    target.queue_size.unwrap_or_else(|| target.qos.default_capacity())
                };
                handlers.push(Arc::new(BrokerHandler::new(broker.clone(), own_name, capacity)));
                broker_handler_built = true;
                tracing::info!(node = own_name, qos = ?target.qos, capacity, "wired broker edge");
            }
        }
    }

    (handlers, config.sources.clone())
}

#[cfg(test)]
mod tests {
    use edgeflow_core::InMemoryBroker;
    use edgeflow_proto::Qos;

    use super::*;

    #[test]
    fn broker_targets_collapse_to_one_handler() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        let config = WiringConfig {
            sources: vec![],
            targets: vec![
                TargetSpec {
                    name: "a".into(),
                    protocol: Protocol::Broker,
                    channel: None,
                    qos: Qos::Realtime,
                    queue_size: None,
                },
                TargetSpec {
                    name: "b".into(),
                    protocol: Protocol::Broker,
                    channel: None,
                    qos: Qos::Durable,
                    queue_size: None,
                },
            ],
        };

        let (handlers, _) = apply_wiring("cam", &config, &broker);
        assert_eq!(handlers.len(), 1);
    }

    #[test]
    fn tcp_and_broker_targets_each_get_a_handler() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        let config = WiringConfig {
            sources: vec![],
            targets: vec![
                TargetSpec {
                    name: "gateway".into(),
                    protocol: Protocol::Tcp,
                    channel: Some("cam-1".into()),
                    qos: Qos::Realtime,
                    queue_size: None,
                },
                TargetSpec {
                    name: "yolo".into(),
                    protocol: Protocol::Broker,
                    channel: None,
                    qos: Qos::Realtime,
                    queue_size: None,
                },
            ],
        };

        let (handlers, _) = apply_wiring("cam", &config, &broker);
        assert_eq!(handlers.len(), 2);
    }
}
