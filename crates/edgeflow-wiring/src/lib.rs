//! System/Linker wiring model (`SPEC_FULL.md` §4.6): declares nodes and their edges, then hands
//! the resulting specs to the supervisor.
//!
//! A binary built against this crate plays two roles depending on its own invocation:
//! - **Orchestrator** (no `NODE_NAME` in the environment): build one or more [`System`]s,
//!   register nodes with [`System::node`], wire edges with [`link`], then call [`run`].
//! - **Worker** (re-exec'd by a [`edgeflow_supervisor::Supervisor`] with `NODE_NAME`/`NODE_CONFIG`
//!   set): call [`run_worker`] with `NODE_NAME`, which looks the node up in the same process-wide
//!   registry the orchestrator populated and runs it (or the framework-error node if the lookup
//!   or construction fails).
//!
//! Both roles run the exact same top-of-`main` registration calls — the registry is populated
//! identically either way, so there is nothing to keep in sync between them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handle;
mod kind;
mod linker;
mod registry;
mod run;
mod spec;
mod system;
mod worker;

pub use edgeflow_core::Protocol;
pub use edgeflow_proto::Qos;
pub use error::{Result, WiringError};
pub use handle::NodeHandle;
pub use kind::NodeKind;
pub use linker::{Linker, link};
pub use registry::NodeFactory;
pub use run::run;
pub use spec::NodeSpec;
pub use system::System;
pub use worker::run_worker;
