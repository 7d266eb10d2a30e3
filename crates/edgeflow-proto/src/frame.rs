//! Frame: the unit of data flowing through a pipeline.
//!
//! Wire form (all integers Big Endian): `[frame_id:u32][timestamp:f64][meta_len:u32][meta
//! bytes][payload bytes]`. The first four bytes are always extractable without touching
//! metadata — [`peek_id`] depends on this to index payloads by id cheaply, mirroring how the
//! broker's control plane only ever needs the id.

use bytes::{Buf, BufMut, Bytes};

use crate::{
    error::{ProtocolError, Result},
    meta::{MetaMap, decode_meta, encode_meta},
};

/// Fixed prefix length before the metadata block: 4 bytes frame_id + 8 bytes timestamp + 4
/// bytes meta_len.
const FIXED_PREFIX_LEN: usize = 4 + 8 + 4;

/// A single unit of data flowing through the pipeline.
///
/// # Invariants
///
/// - `frame_id` is a bare wrapping counter; wraparound at `u32::MAX` is not tracked with an
///   epoch (`SPEC_FULL.md` §9).
/// - `payload` is opaque; the codec never inspects its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonically increasing (per producer) frame counter, wraps at `u32::MAX`.
    pub frame_id: u32,
    /// Seconds since the Unix epoch, as a float to preserve sub-second precision.
    pub timestamp: f64,
    /// Loosely-typed key/value metadata, always carrying `topic` once routed through TCP.
    pub meta: MetaMap,
    /// Opaque payload bytes, typically a JPEG.
    pub payload: Bytes,
}

impl Frame {
    /// Construct a new frame.
    #[must_use]
    pub fn new(frame_id: u32, timestamp: f64, meta: MetaMap, payload: impl Into<Bytes>) -> Self {
        Self { frame_id, timestamp, meta, payload: payload.into() }
    }

    /// Encode this frame to the wire form described in `SPEC_FULL.md` §6.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32(self.frame_id);
        dst.put_f64(self.timestamp);

        let mut meta_bytes = Vec::new();
        encode_meta(&self.meta, &mut meta_bytes);

        #[allow(clippy::cast_possible_truncation)]
        dst.put_u32(meta_bytes.len() as u32);
        dst.put_slice(&meta_bytes);
        dst.put_slice(&self.payload);
    }

    /// Encode this frame to a freshly allocated buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        Bytes::from(buf)
    }

    /// Decode a frame from its wire form.
    ///
    /// # Errors
    /// Returns [`ProtocolError::FrameTooShort`] if `bytes` is shorter than the fixed prefix, or
    /// [`ProtocolError::MetaLenOverflow`] if the claimed metadata length exceeds what remains.
    /// Metadata decode errors (bad UTF-8, unknown tag, truncation) propagate as-is.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_PREFIX_LEN {
            return Err(ProtocolError::FrameTooShort { len: bytes.len() });
        }

        let mut cursor = bytes;
        let frame_id = cursor.get_u32();
        let timestamp = cursor.get_f64();
        let meta_len = cursor.get_u32() as usize;

        if cursor.remaining() < meta_len {
            return Err(ProtocolError::MetaLenOverflow { claimed: meta_len, remaining: cursor.remaining() });
        }

        let (meta_bytes, payload_bytes) = cursor.split_at(meta_len);
        let mut meta_cursor = meta_bytes;
        let meta = decode_meta(&mut meta_cursor)?;

        Ok(Self { frame_id, timestamp, meta, payload: Bytes::copy_from_slice(payload_bytes) })
    }

    /// Read just the `frame_id` from a wire-form buffer without decoding metadata or payload.
    ///
    /// Used by the broker's control plane to index payloads by id without paying for a full
    /// decode on the hot publish path.
    ///
    /// # Errors
    /// Returns [`ProtocolError::FrameTooShort`] if `bytes` has fewer than 4 bytes.
    pub fn peek_id(bytes: &[u8]) -> Result<u32> {
        if bytes.len() < 4 {
            return Err(ProtocolError::FrameTooShort { len: bytes.len() });
        }
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::meta::MetaValue;

    impl Arbitrary for Frame {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<u32>(), any::<f64>(), proptest::collection::vec(any::<u8>(), 0..256))
                .prop_map(|(frame_id, timestamp, payload)| {
                    let mut meta = MetaMap::new();
                    meta.insert("topic".to_string(), MetaValue::Str("cam".to_string()));
                    Self::new(frame_id, timestamp, meta, payload)
                })
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn frame_round_trip(frame in any::<Frame>()) {
            let wire = frame.to_bytes();
            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn peek_id_matches_decoded_id() {
        let mut meta = MetaMap::new();
        meta.insert("topic".into(), MetaValue::Str("cam".into()));
        let frame = Frame::new(7, 1.5, meta, Bytes::from_static(b"\xde\xad\xbe\xef"));

        let wire = frame.to_bytes();
        assert_eq!(Frame::peek_id(&wire).unwrap(), 7);

        let decoded = Frame::decode(&wire).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn reject_short_buffer() {
        let result = Frame::decode(&[0u8; 8]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { len: 8 })));
    }

    #[test]
    fn reject_meta_len_overflow() {
        let mut wire = Vec::new();
        wire.put_u32(1);
        wire.put_f64(0.0);
        wire.put_u32(1000); // claims far more metadata than is present
        let result = Frame::decode(&wire);
        assert!(matches!(result, Err(ProtocolError::MetaLenOverflow { .. })));
    }

    #[test]
    fn peek_id_rejects_too_short() {
        assert!(matches!(Frame::peek_id(&[0, 1]), Err(ProtocolError::FrameTooShort { len: 2 })));
    }
}
