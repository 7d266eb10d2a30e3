//! Error types for child-process supervision.

use thiserror::Error;

/// Errors raised while spawning or signaling a supervised node worker.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The current executable path could not be resolved (needed to re-exec a node worker).
    #[error("could not resolve current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    /// Spawning the child process failed.
    #[error("failed to spawn node worker {node}: {source}")]
    Spawn {
        /// Node name the worker was being spawned for.
        node: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Installing a Unix signal handler failed.
    #[error("failed to install {signal} handler: {source}")]
    SignalHandler {
        /// Name of the signal (`"reload"` or `"terminate"`).
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SupervisorError>;
