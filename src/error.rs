//! # Error Types
//!
//! All fallible operations in this crate return [`Result`] with a single
//! [`Error`] enum. Every error surfaces to the caller: there are no retries,
//! no fallbacks, and no logging. An error leaves the encoder or decoder that
//! produced it in a usable state; scratch buffers are reset at the start of
//! every call and partial output is discarded.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Dynamic encode input was not a registered row type.
    #[error("expected a row value")]
    NotStruct,

    /// Dynamic decode destination was not a mutable registered row type.
    #[error("expected a mutable reference to a row value")]
    NotStructPointer,

    /// Field kind, width class, or shape outside the supported set.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// compFlags carry a compression ID outside the enumerated set.
    #[error("unknown compression id {0}")]
    UnknownCompression(u16),

    /// A varint ran past the end of the buffer without a terminator byte.
    #[error("truncated varint")]
    TruncatedVarint,

    /// A slice would extend beyond the buffer.
    #[error("short buffer: need {needed} bytes, have {available}")]
    ShortBuffer { needed: usize, available: usize },

    /// Record header magic mismatch.
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),

    /// Buffer shorter than the minimum header, or a malformed header field.
    #[error("bad header: {0}")]
    BadHeader(&'static str),

    /// Field tag zero is reserved.
    #[error("invalid field tag 0")]
    InvalidTag,

    /// Hot tag outside 1..=8.
    #[error("invalid hot field tag {0}")]
    InvalidHotTag(u16),

    /// Hot read requested for a tag whose hot bitmap bit is clear.
    #[error("tag {0} is not a hot field")]
    NotHotField(u16),

    /// Inspector lookup found no element with the requested tag.
    #[error("no field with tag {0}")]
    NotFound(u16),

    /// Tag-walk cursor is at the end of the buffer.
    #[error("buffer empty")]
    BufferEmpty,

    /// Frame CRC check failed.
    #[error("crc mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    /// A decoded string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// An external compression service failed.
    #[error("compression service error: {0}")]
    Compression(&'static str),
}
