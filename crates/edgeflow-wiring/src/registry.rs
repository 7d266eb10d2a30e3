//! Process-wide node registry (`SPEC_FULL.md` §9's "process-wide spec registry").
//!
//! A single shared table, indexed by node name, backs two things at once: interning `NodeSpec`s
//! so the same name referenced across multiple [`crate::System`]s accumulates one shared set of
//! edges, and (in a re-exec'd worker process) looking up the zero-argument [`NodeFactory`] that
//! actually runs the node. Both roles share one table because both the orchestrator invocation
//! and the re-exec'd worker invocation are the same binary running the same top-of-`main`
//! registration calls — there is no separate "worker-side" registry to keep in sync.

use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock},
};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{kind::NodeKind, spec::NodeSpec};

/// A zero-argument constructor for a node's entire run loop. Each node package exposes exactly
/// one factory symbol instead of being discovered by dynamically importing a module path
/// (`SPEC_FULL.md` §4.5, §9's module-discovery note).
pub type NodeFactory = fn() -> BoxFuture<'static, ()>;

struct Entry {
    kind: NodeKind,
    factory: NodeFactory,
    spec: NodeSpec,
}

static REGISTRY: OnceLock<Mutex<HashMap<String, Entry>>> = OnceLock::new();

fn table() -> &'static Mutex<HashMap<String, Entry>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock(table: &'static Mutex<HashMap<String, Entry>>) -> std::sync::MutexGuard<'static, HashMap<String, Entry>> {
    table.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Intern a spec under `name`. A second registration of the same `name` (from a different
/// `System`) returns the existing spec untouched — kind/factory/extra are fixed by whichever
/// call registered the name first.
pub(crate) fn intern(name: &str, kind: NodeKind, factory: NodeFactory, extra: Value) -> NodeSpec {
    let mut guard = lock(table());
    guard.entry(name.to_string()).or_insert_with(|| Entry { kind, factory, spec: NodeSpec::new(name, kind, extra) }).spec.clone()
}

pub(crate) fn add_target(name: &str, target: edgeflow_core::TargetSpec) {
    let mut guard = lock(table());
    if let Some(entry) = guard.get_mut(name) {
        entry.spec.targets.push(target);
    }
}

pub(crate) fn add_source(name: &str, source: edgeflow_core::SourceSpec) {
    let mut guard = lock(table());
    if let Some(entry) = guard.get_mut(name) {
        entry.spec.sources.push(source);
    }
}

/// Kind of a registered node, used by [`crate::linker::Linker`] to auto-select `tcp` protocol
/// for gateway targets.
pub(crate) fn kind_of(name: &str) -> Option<NodeKind> {
    lock(table()).get(name).map(|entry| entry.kind)
}

/// Snapshot of a registered spec, used by [`crate::run::run`] to serialize `NODE_CONFIG`.
pub(crate) fn spec_for(name: &str) -> Option<NodeSpec> {
    lock(table()).get(name).map(|entry| entry.spec.clone())
}

/// The factory for `name`, consulted by a re-exec'd worker process (`SPEC_FULL.md` §4.5).
pub(crate) fn factory_for(name: &str) -> Option<NodeFactory> {
    lock(table()).get(name).map(|entry| entry.factory)
}

#[cfg(test)]
pub(crate) fn clear_for_tests() {
    lock(table()).clear();
}

/// The registry is a process-wide global; every test module that touches it (directly or via
/// `System`/`Linker`) locks this first so parallel test threads don't race each other's
/// `clear_for_tests()`.
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_factory() -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    #[test]
    fn interning_the_same_name_twice_keeps_the_first_kind() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_for_tests();
        intern("cam", NodeKind::Producer, noop_factory, Value::Null);
        intern("cam", NodeKind::Consumer, noop_factory, Value::Null);
        assert_eq!(kind_of("cam"), Some(NodeKind::Producer));
    }

    #[test]
    fn add_target_and_source_accumulate_on_the_interned_spec() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_for_tests();
        intern("cam", NodeKind::Producer, noop_factory, Value::Null);
        add_target(
            "cam",
            edgeflow_core::TargetSpec {
                name: "yolo".into(),
                protocol: edgeflow_core::Protocol::Broker,
                channel: None,
                qos: edgeflow_proto::Qos::Realtime,
                queue_size: None,
            },
        );
        let spec = spec_for("cam").expect("interned above");
        assert_eq!(spec.targets.len(), 1);
    }

    #[test]
    fn unknown_name_has_no_factory() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        clear_for_tests();
        assert!(factory_for("does-not-exist").is_none());
    }
}
