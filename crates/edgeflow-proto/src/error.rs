//! Wire-format error type.

/// Errors produced while encoding or decoding a [`crate::Frame`] or its metadata map.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the fixed 16-byte frame_id/timestamp/meta_len prefix.
    #[error("frame shorter than the fixed header ({len} bytes, need at least 16)")]
    FrameTooShort {
        /// Actual buffer length.
        len: usize,
    },

    /// `meta_len` claims more bytes than remain in the buffer.
    #[error("metadata length {claimed} exceeds remaining buffer ({remaining} bytes)")]
    MetaLenOverflow {
        /// Length claimed by the `meta_len` field.
        claimed: usize,
        /// Bytes actually remaining after the fixed header.
        remaining: usize,
    },

    /// A metadata entry used an unknown type tag.
    #[error("unknown metadata value tag {tag}")]
    UnknownMetaTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// A metadata key or string value was not valid UTF-8.
    #[error("metadata string was not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Metadata bytes were truncated mid-entry.
    #[error("metadata truncated while reading a {what} field")]
    MetaTruncated {
        /// What was being read when the buffer ran out.
        what: &'static str,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
