//! Error types for node construction and config loading.

use thiserror::Error;

/// Errors raised while constructing a node driver from its injected configuration.
#[derive(Error, Debug)]
pub enum NodeError {
    /// `NODE_CONFIG` was present but failed to parse as JSON.
    #[error("failed to parse NODE_CONFIG: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// An edge named a protocol this build does not implement.
    #[error("unsupported edge protocol: {0}")]
    UnsupportedProtocol(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, NodeError>;
