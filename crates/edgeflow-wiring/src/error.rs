//! Error types for system construction and the `run()` entry point.

use thiserror::Error;

/// Errors raised while assembling or running a wired system of nodes.
#[derive(Error, Debug)]
pub enum WiringError {
    /// `link()`/`.to()` or `run()` referenced a node name no `System::node` call interned.
    #[error("no node registered under name {0:?}")]
    UnknownNode(String),

    /// A spec's accumulated wiring/config could not be serialized into a `NODE_CONFIG` blob.
    #[error("failed to serialize NODE_CONFIG for node {node}: {source}")]
    ConfigSerialize {
        /// Node the config was being built for.
        node: String,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A spawned supervisor could not be joined (its task panicked).
    #[error("supervisor for node {node} panicked: {source}")]
    SupervisorJoin {
        /// Node whose supervisor task panicked.
        node: String,
        /// The join error.
        #[source]
        source: tokio::task::JoinError,
    },

    /// A supervisor reported a setup failure (signal handler installation, re-exec resolution).
    #[error("supervisor for node {node} failed: {source}")]
    Supervisor {
        /// Node whose supervisor failed.
        node: String,
        /// Underlying supervisor error.
        #[source]
        source: edgeflow_supervisor::SupervisorError,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WiringError>;
