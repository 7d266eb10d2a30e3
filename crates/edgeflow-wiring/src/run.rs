//! `run(system...)`: the orchestrator-side entry point (`SPEC_FULL.md` §4.6).

use std::collections::HashSet;

use edgeflow_supervisor::Supervisor;

use crate::{error::WiringError, registry, system::System};

/// Union the node specs across `systems`, reset the (first system's) broker once, and hand each
/// spec to its own [`Supervisor`] — one OS worker per spec, replicated `spec.replicas()` times.
/// Blocks until every supervisor returns (normally only on a termination signal).
///
/// # Errors
/// Returns [`WiringError::UnknownNode`] if a system named a node that was never interned (should
/// not happen via the public API, since `System::node` always interns before returning a
/// handle), [`WiringError::ConfigSerialize`] if a spec's `NODE_CONFIG` blob fails to serialize,
/// or [`WiringError::Supervisor`]/[`WiringError::SupervisorJoin`] if a supervisor itself fails to
/// start or panics.
pub async fn run(systems: &[System]) -> crate::error::Result<()> {
    let Some(first) = systems.first() else { return Ok(()) };
    let broker = first.broker().clone();

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for system in systems {
        for name in system.node_names() {
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
    }

    broker.reset().await;
    let broker_config = broker.to_config();

    let mut handles = Vec::new();
    for name in &names {
        let spec = registry::spec_for(name).ok_or_else(|| WiringError::UnknownNode(name.clone()))?;
        let node_config = spec
            .to_node_config(&broker_config)
            .map_err(|source| WiringError::ConfigSerialize { node: name.clone(), source })?;

        for replica in 0..spec.replicas() {
            let worker_name = if spec.replicas() > 1 { format!("{name}-{replica}") } else { name.clone() };
            tracing::info!(node = %worker_name, kind = ?spec.kind(), "starting supervisor");
            let supervisor = Supervisor::new(worker_name.clone(), node_config.clone());
            handles.push((worker_name, tokio::spawn(supervisor.run())));
        }
    }

    for (node, handle) in handles {
        handle
            .await
            .map_err(|source| WiringError::SupervisorJoin { node: node.clone(), source })?
            .map_err(|source| WiringError::Supervisor { node, source })?;
    }

    Ok(())
}
