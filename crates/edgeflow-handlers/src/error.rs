//! Error types for output handler construction.

use thiserror::Error;

/// Errors raised while building a handler from a `NodeSpec` edge.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// An edge named a protocol that no handler implements.
    #[error("unknown handler protocol: {0}")]
    UnknownProtocol(String),

    /// A TCP edge omitted a required field (`host`, `port`, or `source_id`).
    #[error("TCP handler edge missing field: {0}")]
    MissingField(&'static str),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, HandlerError>;
