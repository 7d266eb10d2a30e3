//! `link(source).to(target, ...)` edge building (`SPEC_FULL.md` §4.6).

use edgeflow_core::{Protocol, SourceSpec, TargetSpec};
use edgeflow_proto::Qos;

use crate::{handle::NodeHandle, kind::NodeKind, registry};

/// Anchors a chain of outbound edges at the node most recently linked. `link(a).to(b).to(c)`
/// wires `a -> b -> c`, each `.to()` call returning a new `Linker` anchored at its target so the
/// chain can continue.
pub struct Linker {
    current: NodeHandle,
}

/// Start a wiring chain at `source`.
#[must_use]
pub fn link(source: &NodeHandle) -> Linker {
    Linker { current: source.clone() }
}

impl Linker {
    /// Wire the current node's output to `target`. Protocol is `tcp` when `target` is a gateway
    /// or an explicit `channel` is given, else `broker`. Returns a `Linker` anchored at `target`
    /// so the call can be chained.
    #[must_use]
    pub fn to(self, target: &NodeHandle, channel: Option<&str>, qos: Qos) -> Linker {
        let target_is_gateway = registry::kind_of(target.name()) == Some(NodeKind::Gateway);
        let protocol = if channel.is_some() || target_is_gateway { Protocol::Tcp } else { Protocol::Broker };

        registry::add_target(
            self.current.name(),
            TargetSpec { name: target.name().to_string(), protocol, channel: channel.map(String::from), qos, queue_size: None },
        );
        registry::add_source(target.name(), SourceSpec { name: self.current.name().to_string(), qos });

        tracing::info!(
            source = self.current.name(),
            target = target.name(),
            protocol = ?protocol,
            qos = ?qos,
            "wired edge"
        );

        Linker { current: target.clone() }
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::system::System;

    fn noop() -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    #[test]
    fn chained_link_wires_each_hop() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();
        let mut system = System::new(std::sync::Arc::new(edgeflow_core::InMemoryBroker::new()));
        let cam = system.node("cam", NodeKind::Producer, noop, serde_json::Value::Null);
        let yolo = system.node("yolo", NodeKind::Consumer, noop, serde_json::Value::Null);
        let gateway = system.node("gateway", NodeKind::Gateway, noop, serde_json::Value::Null);

        link(&cam).to(&yolo, None, Qos::Realtime).to(&gateway, None, Qos::Realtime);

        let cam_spec = registry::spec_for("cam").unwrap();
        assert_eq!(cam_spec.targets[0].protocol, Protocol::Broker);

        let yolo_spec = registry::spec_for("yolo").unwrap();
        assert_eq!(yolo_spec.sources[0].name, "cam");
        assert_eq!(yolo_spec.targets[0].protocol, Protocol::Tcp, "gateway target auto-selects tcp");
    }

    #[test]
    fn explicit_channel_forces_tcp_even_to_a_non_gateway() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();
        let mut system = System::new(std::sync::Arc::new(edgeflow_core::InMemoryBroker::new()));
        let cam = system.node("cam2", NodeKind::Producer, noop, serde_json::Value::Null);
        let logger = system.node("logger2", NodeKind::Consumer, noop, serde_json::Value::Null);

        link(&cam).to(&logger, Some("cam2-feed"), Qos::Durable);

        let spec = registry::spec_for("cam2").unwrap();
        assert_eq!(spec.targets[0].protocol, Protocol::Tcp);
        assert_eq!(spec.targets[0].channel.as_deref(), Some("cam2-feed"));
    }
}
