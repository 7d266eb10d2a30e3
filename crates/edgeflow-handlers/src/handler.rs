//! The [`OutputHandler`] trait every outbound edge materializes behind.

use async_trait::async_trait;
use edgeflow_proto::Frame;

/// One outbound edge of a node: encode and deliver a [`Frame`] somewhere.
///
/// Implementations never propagate I/O failure to the caller — a send that cannot complete is
/// logged and dropped, matching the broker's "no exception escapes to the node loop" contract.
#[async_trait]
pub trait OutputHandler: Send + Sync {
    /// Deliver `frame` to this handler's destination. Never blocks longer than the handler's own
    /// internal queuing allows, and never returns an error.
    async fn send(&self, frame: &Frame);

    /// Release any background resources (connections, tasks). Called once at node teardown.
    async fn close(&self);
}
