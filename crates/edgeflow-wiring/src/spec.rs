//! `NodeSpec`: the accumulated description of one node's edges and type-specific parameters.

use edgeflow_core::{BrokerConfig, SourceSpec, TargetSpec};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::kind::NodeKind;

/// Everything needed to launch one node worker: its kind, accumulated inbound/outbound edges,
/// replica count, and whatever type-specific parameters (`fps`, detector weights path, ...) its
/// own config type expects to find alongside the wiring fields.
///
/// Interned once per name in the process-wide registry (`SPEC_FULL.md` §4.6) — cloning a
/// `NodeSpec` out of the registry is cheap and yields a snapshot, not a live handle; edges are
/// added back into the registry through [`crate::linker::Linker`], not by mutating a clone.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) sources: Vec<SourceSpec>,
    pub(crate) targets: Vec<TargetSpec>,
    pub(crate) replicas: usize,
    pub(crate) extra: Value,
}

impl NodeSpec {
    pub(crate) fn new(name: &str, kind: NodeKind, mut extra: Value) -> Self {
        if !extra.is_object() {
            extra = Value::Object(Map::new());
        }
        let replicas = extra
            .as_object()
            .and_then(|object| object.get("replicas"))
            .and_then(Value::as_u64)
            .map_or(1, |n| n.max(1) as usize);

        Self { name: name.to_string(), kind, sources: Vec::new(), targets: Vec::new(), replicas, extra }
    }

    /// Node name, used as its topic name for broker-protocol output edges and as the default
    /// TCP `meta["topic"]` tag.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kind, fixed at registration.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Number of replica workers the supervisor should launch for this spec.
    #[must_use]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Serialize this spec's wiring and type-specific parameters into the `NODE_CONFIG` JSON
    /// blob a freshly spawned worker parses on startup, embedding `broker` so the worker
    /// reconnects to the same broker the orchestrator just reset (`SPEC_FULL.md` §4.6, §4.8).
    pub(crate) fn to_node_config(&self, broker: &BrokerConfig) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            extra: &'a Value,
            sources: &'a [SourceSpec],
            targets: &'a [TargetSpec],
            broker: &'a BrokerConfig,
        }

        serde_json::to_string(&Wire { extra: &self.extra, sources: &self.sources, targets: &self.targets, broker })
    }
}
