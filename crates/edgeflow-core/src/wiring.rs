//! Edge descriptors shared between a node's own wiring application (`edgeflow-node`) and the
//! system-level wiring builder (`edgeflow-wiring`) that produces them.

use edgeflow_proto::Qos;
use serde::{Deserialize, Serialize};

/// Delivery protocol for an outbound edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Publish to a broker topic named after the source node.
    Broker,
    /// Stream directly to a gateway's TCP ingress port.
    Tcp,
}

/// One inbound edge: a topic this node reads from, and the QoS that determines whether it pops
/// the oldest queued frame or the latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Topic name (conventionally the upstream node's name).
    pub name: String,
    /// Pop strategy: REALTIME uses `pop_latest`, DURABLE uses `pop`.
    #[serde(default = "default_qos")]
    pub qos: Qos,
}

/// One outbound edge: where this node's output goes and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Downstream node name, used for logging and, for broker edges, ignored in favor of the
    /// source node's own name as the topic.
    pub name: String,
    /// Delivery protocol.
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    /// TCP-only: overrides the source id tag written into `meta["topic"]`. Defaults to this
    /// node's own name when omitted.
    #[serde(default)]
    pub channel: Option<String>,
    /// QoS of the edge; determines broker topic capacity (REALTIME collapses to 1).
    #[serde(default = "default_qos")]
    pub qos: Qos,
    /// Explicit DURABLE queue capacity override (default 100).
    #[serde(default)]
    pub queue_size: Option<usize>,
}

fn default_qos() -> Qos {
    Qos::Realtime
}

fn default_protocol() -> Protocol {
    Protocol::Broker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_spec_defaults_to_broker_realtime() {
        let json = r#"{"name": "yolo"}"#;
        let spec: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.protocol, Protocol::Broker);
        assert_eq!(spec.qos, Qos::Realtime);
        assert_eq!(spec.queue_size, None);
    }

    #[test]
    fn tcp_target_parses_channel() {
        let json = r#"{"name": "gateway", "protocol": "tcp", "channel": "cam-1"}"#;
        let spec: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.protocol, Protocol::Tcp);
        assert_eq!(spec.channel.as_deref(), Some("cam-1"));
    }
}
