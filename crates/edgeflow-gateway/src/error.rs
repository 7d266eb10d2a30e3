//! Error types for the gateway ingress server.

use thiserror::Error;

/// Errors raised while binding or running the gateway ingress server.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The TCP ingress or HTTP listener could not be bound.
    #[error("failed to bind {what} on {addr}: {source}")]
    Bind {
        /// Which listener failed (`"tcp ingress"` or `"http"`).
        what: &'static str,
        /// Address that was attempted.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server exited with an I/O error.
    #[error("http server error: {0}")]
    Http(#[source] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, GatewayError>;
