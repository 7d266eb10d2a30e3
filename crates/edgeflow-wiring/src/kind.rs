//! What a registered node factory produces.

/// The shape of a node's run loop, fixed at its `System::node` registration call site.
///
/// The original source discovers this by inspecting the node's module for `producer`/`consumer`/
/// `gateway` decorators at import time; a statically compiled target has no import step to
/// inspect, so the registration call site names it explicitly instead (`SPEC_FULL.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Drives a `ProducerNode` via `edgeflow_node::ProducerDriver`.
    Producer,
    /// Drives a `ConsumerNode` via `edgeflow_node::ConsumerDriver`.
    Consumer,
    /// Runs `edgeflow_gateway::serve` directly — a gateway has no user `loop()` to wrap.
    Gateway,
}
