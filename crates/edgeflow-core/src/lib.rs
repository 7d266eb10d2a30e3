//! Environment abstraction, dual-plane broker, and edge-wiring descriptors shared by every
//! edgeflow process.
//!
//! This crate has no notion of node lifecycles or the gateway's HTTP surface — it is the layer
//! those crates build on: a topic-addressed [`Broker`], an [`Environment`] seam for swapping
//! real time/randomness out for deterministic fakes in tests, and the [`SourceSpec`]/
//! [`TargetSpec`] edge descriptors a node applies to itself and a system-level wiring builder
//! produces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broker;
mod env;
mod error;
mod system_env;
mod wiring;

pub use broker::{Broker, BrokerConfig, DualPlaneBroker, InMemoryBroker, QueueStat};
pub use env::Environment;
pub use error::{BrokerError, Result};
pub use system_env::SystemEnv;
pub use wiring::{Protocol, SourceSpec, TargetSpec};
