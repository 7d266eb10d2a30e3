//! Serializable broker configuration (`to_config`/`from_config`, `SPEC_FULL.md` §4.2).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Broker, InMemoryBroker, dual_plane::DualPlaneBroker};
use crate::{env::Environment, system_env::SystemEnv};

/// Serializable description of a broker, carried inside a worker's `NODE_CONFIG` blob so a
/// freshly spawned process re-establishes the same broker rather than inventing a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrokerConfig {
    /// In-process broker with no external dependency, used by tests and single-binary demos.
    InMemory,
    /// Redis-backed dual-plane broker (`SPEC_FULL.md` §4.2).
    DualPlane {
        /// Control-plane Redis host.
        ctrl_host: String,
        /// Control-plane Redis port.
        ctrl_port: u16,
        /// Data-plane Redis host.
        data_host: String,
        /// Data-plane Redis port.
        data_port: u16,
    },
}

impl BrokerConfig {
    /// Read the control/data-plane endpoints from the environment variables in `SPEC_FULL.md`
    /// §6, falling back to the documented Kubernetes service-name defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::DualPlane {
            ctrl_host: env_or("REDIS_HOST", "edgeflow-redis-service"),
            ctrl_port: env_or("REDIS_PORT", "6379").parse().unwrap_or(6379),
            data_host: env_or("DATA_REDIS_HOST", "edgeflow-redis-data-service"),
            data_port: env_or("DATA_REDIS_PORT", "6380").parse().unwrap_or(6380),
        }
    }

    /// Reconstruct a broker from this configuration, using [`SystemEnv`] for production timing.
    #[must_use]
    pub fn connect(&self) -> Arc<dyn Broker> {
        self.connect_with_env(SystemEnv::new())
    }

    /// Reconstruct a broker from this configuration, with an injectable [`Environment`] for
    /// deterministic tests.
    #[must_use]
    pub fn connect_with_env<E: Environment>(&self, env: E) -> Arc<dyn Broker> {
        match self {
            Self::InMemory => Arc::new(InMemoryBroker::new()),
            Self::DualPlane { ctrl_host, ctrl_port, data_host, data_port } => Arc::new(
                DualPlaneBroker::new(ctrl_host.clone(), *ctrl_port, data_host.clone(), *data_port, env),
            ),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let config = BrokerConfig::DualPlane {
            ctrl_host: "redis-ctrl".into(),
            ctrl_port: 6379,
            data_host: "redis-data".into(),
            data_port: 6380,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: BrokerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn in_memory_connects() {
        let config = BrokerConfig::InMemory;
        let _broker = config.connect();
    }
}
