//! Error types for the broker layer.

use thiserror::Error;

/// Errors surfaced by a [`crate::broker::Broker`] implementation.
///
/// Per `SPEC_FULL.md` §7, none of these are meant to propagate out to a node's `loop()` body —
/// the broker recovers locally (reconnect with backoff, drop the offending frame) and these
/// variants exist for logging and for the handful of call sites (mainly tests) that want to
/// observe *why* an operation produced `None`.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The underlying transport (e.g. Redis) could not be reached after retrying.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// A payload referenced by the control plane was missing from the data plane (TTL expiry or
    /// eviction race).
    #[error("payload missing for topic {topic:?} id {id}")]
    PayloadMissing {
        /// Topic the payload was expected under.
        topic: String,
        /// Frame id the payload was expected under.
        id: u32,
    },

    /// A frame could not be decoded well enough to extract its id.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] edgeflow_proto::ProtocolError),

    /// Configuration round-trip (`to_config`/`from_config`) failed.
    #[error("broker config error: {0}")]
    Config(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, BrokerError>;
