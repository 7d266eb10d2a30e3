//! Per-worker supervisor (`SPEC_FULL.md` §4.5).
//!
//! One [`Supervisor`] watches over one node worker: it re-execs the current binary with
//! `NODE_NAME`/`NODE_CONFIG` set in the child's environment, respawns it 3s after an unexpected
//! exit, and reacts to `SIGHUP` (reload: terminate and respawn) and `SIGTERM` (terminate and
//! exit). The child consults the process-wide node registry in `edgeflow-wiring` to decide what
//! to run — this crate has no notion of node types, only of spawning and restarting a process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;

use std::time::Duration;

use tokio::{
    process::{Child, Command},
    signal::unix::{SignalKind, signal},
    time::sleep,
};

pub use error::{Result, SupervisorError};

const RESPAWN_DELAY: Duration = Duration::from_secs(3);
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(2);

/// Watches one node worker for its entire supervised lifetime.
pub struct Supervisor {
    node_name: String,
    node_config: String,
}

impl Supervisor {
    /// Build a supervisor for a worker that will be re-execed with `NODE_NAME = node_name` and
    /// `NODE_CONFIG = node_config` (the JSON blob the wiring `run()` serialized for this spec).
    #[must_use]
    pub fn new(node_name: impl Into<String>, node_config: impl Into<String>) -> Self {
        Self { node_name: node_name.into(), node_config: node_config.into() }
    }

    /// Run until a terminate signal is received. Never returns `Err` for a crashed child — a
    /// worker exit is the expected case this supervisor exists to handle; it only returns `Err`
    /// if the supervision machinery itself (signal handlers, re-exec path resolution) cannot be
    /// set up.
    pub async fn run(self) -> Result<()> {
        let mut reload = signal(SignalKind::hangup())
            .map_err(|source| SupervisorError::SignalHandler { signal: "reload", source })?;
        let mut terminate = signal(SignalKind::terminate())
            .map_err(|source| SupervisorError::SignalHandler { signal: "terminate", source })?;

        let mut running = true;
        while running {
            let mut child = match self.spawn_child() {
                Ok(child) => child,
                Err(err) => {
                    tracing::error!(node = %self.node_name, error = %err, "failed to spawn node worker, retrying");
                    sleep(RESPAWN_DELAY).await;
                    continue;
                }
            };
            tracing::info!(node = %self.node_name, pid = ?child.id(), "node worker spawned");

            tokio::select! {
                status = child.wait() => {
                    tracing::warn!(node = %self.node_name, ?status, "node worker exited, respawning");
                    sleep(RESPAWN_DELAY).await;
                }
                _ = reload.recv() => {
                    tracing::info!(node = %self.node_name, "reload signal received, restarting worker");
                    terminate_child(&mut child, &self.node_name).await;
                }
                _ = terminate.recv() => {
                    tracing::info!(node = %self.node_name, "terminate signal received, stopping worker");
                    terminate_child(&mut child, &self.node_name).await;
                    running = false;
                }
            }
        }

        Ok(())
    }

    fn spawn_child(&self) -> Result<Child> {
        let exe = std::env::current_exe().map_err(SupervisorError::CurrentExe)?;
        Command::new(exe)
            .env("NODE_NAME", &self.node_name)
            .env("NODE_CONFIG", &self.node_config)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn { node: self.node_name.clone(), source })
    }
}

/// Send `SIGTERM`, wait up to [`GRACEFUL_TIMEOUT`] for the child to exit on its own, then
/// `SIGKILL` if it is still alive.
async fn terminate_child(child: &mut Child, node_name: &str) {
    let Some(pid) = child.id() else { return };
    let pid = nix::unistd::Pid::from_raw(pid.cast_signed());

    if let Err(err) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM) {
        tracing::warn!(node = node_name, error = %err, "failed to send SIGTERM, falling back to hard kill");
        let _ = child.start_kill();
        let _ = child.wait().await;
        return;
    }

    if tokio::time::timeout(GRACEFUL_TIMEOUT, child.wait()).await.is_err() {
        tracing::warn!(node = node_name, "node worker did not exit gracefully, sending SIGKILL");
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stores_node_name_and_config() {
        let supervisor = Supervisor::new("cam", r#"{"sources":[]}"#);
        assert_eq!(supervisor.node_name, "cam");
        assert_eq!(supervisor.node_config, r#"{"sources":[]}"#);
    }
}
