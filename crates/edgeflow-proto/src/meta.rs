//! Frame metadata: a small string-keyed map of loosely-typed values.
//!
//! The wire format is a compact tagged-entry scheme, not a general serialization format —
//! metadata on the source side is a Python dict holding only strings, numbers, booleans, and
//! byte strings, so that is exactly what round-trips here. Insertion order is not significant
//! (§3), so entries are kept in a `BTreeMap` for deterministic iteration rather than a
//! `HashMap`, which makes encoding output (and therefore test fixtures) reproducible.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, Result};

/// A metadata value: string, byte string, signed integer, float, or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// UTF-8 text, e.g. `topic`, `worker_id`.
    Str(String),
    /// Opaque byte string.
    Bytes(Vec<u8>),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
}

impl MetaValue {
    const TAG_STR: u8 = 0;
    const TAG_BYTES: u8 = 1;
    const TAG_INT: u8 = 2;
    const TAG_FLOAT: u8 = 3;
    const TAG_BOOL: u8 = 4;

    fn encode(&self, dst: &mut impl BufMut) {
        match self {
            Self::Str(s) => {
                dst.put_u8(Self::TAG_STR);
                put_len_prefixed(dst, s.as_bytes());
            },
            Self::Bytes(b) => {
                dst.put_u8(Self::TAG_BYTES);
                put_len_prefixed(dst, b);
            },
            Self::Int(i) => {
                dst.put_u8(Self::TAG_INT);
                dst.put_i64(*i);
            },
            Self::Float(f) => {
                dst.put_u8(Self::TAG_FLOAT);
                dst.put_f64(*f);
            },
            Self::Bool(b) => {
                dst.put_u8(Self::TAG_BOOL);
                dst.put_u8(u8::from(*b));
            },
        }
    }

    fn decode(buf: &mut impl Buf) -> Result<Self> {
        if !buf.has_remaining() {
            return Err(ProtocolError::MetaTruncated { what: "value tag" });
        }
        let tag = buf.get_u8();
        match tag {
            Self::TAG_STR => Ok(Self::Str(get_len_prefixed_string(buf)?)),
            Self::TAG_BYTES => Ok(Self::Bytes(get_len_prefixed_bytes(buf)?)),
            Self::TAG_INT => {
                if buf.remaining() < 8 {
                    return Err(ProtocolError::MetaTruncated { what: "int value" });
                }
                Ok(Self::Int(buf.get_i64()))
            },
            Self::TAG_FLOAT => {
                if buf.remaining() < 8 {
                    return Err(ProtocolError::MetaTruncated { what: "float value" });
                }
                Ok(Self::Float(buf.get_f64()))
            },
            Self::TAG_BOOL => {
                if !buf.has_remaining() {
                    return Err(ProtocolError::MetaTruncated { what: "bool value" });
                }
                Ok(Self::Bool(buf.get_u8() != 0))
            },
            other => Err(ProtocolError::UnknownMetaTag { tag: other }),
        }
    }

    /// Borrow as a string, if this value holds one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Ordered metadata map attached to every [`crate::Frame`].
pub type MetaMap = BTreeMap<String, MetaValue>;

fn put_len_prefixed(dst: &mut impl BufMut, bytes: &[u8]) {
    #[allow(clippy::cast_possible_truncation)]
    dst.put_u32(bytes.len() as u32);
    dst.put_slice(bytes);
}

fn get_len_prefixed_bytes(buf: &mut impl Buf) -> Result<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::MetaTruncated { what: "length prefix" });
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::MetaTruncated { what: "length-prefixed bytes" });
    }
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

fn get_len_prefixed_string(buf: &mut impl Buf) -> Result<String> {
    let bytes = get_len_prefixed_bytes(buf)?;
    Ok(std::str::from_utf8(&bytes)?.to_string())
}

/// Encode a metadata map using the tagged-entry scheme: `[count:u32 BE]` then, per entry,
/// `[key_len:u32 BE][key bytes][value]`.
pub fn encode_meta(meta: &MetaMap, dst: &mut impl BufMut) {
    #[allow(clippy::cast_possible_truncation)]
    dst.put_u32(meta.len() as u32);
    for (key, value) in meta {
        put_len_prefixed(dst, key.as_bytes());
        value.encode(dst);
    }
}

/// Decode a metadata map previously produced by [`encode_meta`].
///
/// # Errors
/// Returns [`ProtocolError`] if the buffer is truncated mid-entry, a string is not valid
/// UTF-8, or a value tag is unrecognized.
pub fn decode_meta(buf: &mut impl Buf) -> Result<MetaMap> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::MetaTruncated { what: "entry count" });
    }
    let count = buf.get_u32();
    let mut meta = MetaMap::new();
    for _ in 0..count {
        let key = get_len_prefixed_string(buf)?;
        let value = MetaValue::decode(buf)?;
        meta.insert(key, value);
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_meta_value() -> impl Strategy<Value = MetaValue> {
        prop_oneof![
            "[a-zA-Z0-9 _/.-]{0,32}".prop_map(MetaValue::Str),
            proptest::collection::vec(any::<u8>(), 0..32).prop_map(MetaValue::Bytes),
            any::<i64>().prop_map(MetaValue::Int),
            any::<f64>().prop_map(MetaValue::Float),
            any::<bool>().prop_map(MetaValue::Bool),
        ]
    }

    fn arb_meta_map() -> impl Strategy<Value = MetaMap> {
        proptest::collection::btree_map("[a-zA-Z0-9_]{1,16}", arb_meta_value(), 0..8)
    }

    proptest! {
        #[test]
        fn meta_round_trip(meta in arb_meta_map()) {
            let mut wire = Vec::new();
            encode_meta(&meta, &mut wire);

            let mut cursor = &wire[..];
            let decoded = decode_meta(&mut cursor).expect("should decode");
            prop_assert_eq!(meta, decoded);
            prop_assert!(cursor.is_empty());
        }
    }

    #[test]
    fn empty_map_round_trips() {
        let meta = MetaMap::new();
        let mut wire = Vec::new();
        encode_meta(&meta, &mut wire);
        let mut cursor = &wire[..];
        assert_eq!(decode_meta(&mut cursor).unwrap(), meta);
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut wire = Vec::new();
        wire.put_u32(1);
        put_len_prefixed(&mut wire, b"topic");
        wire.put_u8(200); // invalid tag
        let mut cursor = &wire[..];
        assert!(matches!(decode_meta(&mut cursor), Err(ProtocolError::UnknownMetaTag { tag: 200 })));
    }

    #[test]
    fn rejects_truncated_entry() {
        let mut wire = Vec::new();
        wire.put_u32(1);
        put_len_prefixed(&mut wire, b"topic");
        // no value tag at all
        let mut cursor = &wire[..];
        assert!(decode_meta(&mut cursor).is_err());
    }
}
