//! `System`: a named bag of node registrations sharing one broker (`SPEC_FULL.md` §4.6).

use std::sync::Arc;

use edgeflow_core::Broker;
use serde_json::Value;

use crate::{handle::NodeHandle, kind::NodeKind, registry, registry::NodeFactory};

/// A set of nodes that share one broker. Multiple `System`s may reference the same node name;
/// the registry interns it once, so edges wired from any `System` accumulate onto the same spec.
pub struct System {
    broker: Arc<dyn Broker>,
    node_names: Vec<String>,
}

impl System {
    /// Start a system backed by `broker`. `run()` resets whichever `System`'s broker is passed
    /// first among several, on the assumption that systems `run()` together share one broker
    /// (`SPEC_FULL.md` §4.6's "a System is a named bag of NodeSpecs plus a broker").
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker, node_names: Vec::new() }
    }

    /// Intern a node under `name` with `kind` and `factory`, recording it as a member of this
    /// system. `extra` carries type-specific parameters (e.g. `{"fps": 30}`) merged into the
    /// worker's `NODE_CONFIG` alongside its wiring.
    pub fn node(&mut self, name: &str, kind: NodeKind, factory: NodeFactory, extra: Value) -> NodeHandle {
        registry::intern(name, kind, factory, extra);
        self.node_names.push(name.to_string());
        NodeHandle(name.to_string())
    }

    pub(crate) fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    pub(crate) fn node_names(&self) -> &[String] {
        &self.node_names
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;

    fn noop() -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    #[test]
    fn node_interns_and_tracks_membership() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();

        let mut system = System::new(Arc::new(edgeflow_core::InMemoryBroker::new()));
        let handle = system.node("cam3", NodeKind::Producer, noop, Value::Null);

        assert_eq!(handle.name(), "cam3");
        assert_eq!(system.node_names(), &["cam3".to_string()]);
    }

    #[test]
    fn two_systems_sharing_a_node_name_both_see_it() {
        let _guard = registry::TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        registry::clear_for_tests();

        let broker: Arc<dyn Broker> = Arc::new(edgeflow_core::InMemoryBroker::new());
        let mut first = System::new(broker.clone());
        let mut second = System::new(broker);

        first.node("shared", NodeKind::Consumer, noop, Value::Null);
        second.node("shared", NodeKind::Consumer, noop, Value::Null);

        assert_eq!(registry::kind_of("shared"), Some(NodeKind::Consumer));
    }
}
