//! Frame wire format and QoS types shared by every edgeflow crate.
//!
//! This crate is pure data: no I/O, no async runtime. See [`Frame`] for the wire format and
//! [`Qos`] for the delivery-preference enum consumed by the wiring and broker layers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod meta;
mod qos;

pub use error::{ProtocolError, Result};
pub use frame::Frame;
pub use meta::{MetaMap, MetaValue, decode_meta, encode_meta};
pub use qos::Qos;
