//! Cross-component integration scenarios for edgeflow.
//!
//! Unit tests inside `edgeflow-core`/`edgeflow-node`/`edgeflow-gateway` exercise each crate in
//! isolation. The scenarios here wire real instances of several crates together the way a
//! deployed pipeline would — a node driver behind a real `TcpHandler`, talking to a real
//! `edgeflow-gateway` instance over a real socket — the way a single-crate test cannot.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;

pub use cluster::GatewayUnderTest;
