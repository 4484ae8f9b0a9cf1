//! # dbflat - Compact Self-Describing Binary Records
//!
//! dbflat is a binary serialization engine built around one philosophy:
//! produce compact, self-describing, partially-decodable records with
//! minimal allocation, and let decoders alias payload bytes directly out
//! of the input buffer whenever that is sound.
//!
//! Two codec families share one core (header, slot format, varint,
//! compression framing):
//!
//! - **Row codec** ([`rows`]): serializes a structural record (ordered
//!   typed fields, some fixed-width, some variable-length) into a
//!   length-prefixed body with a per-record variable-offset table.
//! - **Record codec** ([`records`]): serializes `(tag, compFlags,
//!   payload)` triples into a framed record with a header, virtual-offset
//!   table, and payload region, under one of three storage strategies.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------+
//! |  Row codec (RowShape / RowEncoder / RowDecoder)  |
//! |  Record codec (encoders, decoders, Inspector)    |
//! +------------------------+-------------------------+
//! |     Layout planner     |   Plan cache (rows)     |
//! +------------------------+-------------------------+
//! |  Header & slot codec   |  Compression adapter    |
//! +------------------------+-------------------------+
//! |  Shared primitives: varint, fixed-width LE, CRC  |
//! +--------------------------------------------------+
//! ```
//!
//! The [`frame`] module wraps encoded bytes in CRC-protected frames for
//! transport.
//!
//! ## Decoding Modes
//!
//! The same record bytes support three access patterns:
//!
//! | Mode | Entry point | Cost |
//! |------|-------------|------|
//! | Full materialization | [`records::decode_record`] | O(fields) |
//! | Hot-field random access | [`records::read_hot`] | O(1) |
//! | Sequential tag-walk | [`records::Inspector`] | O(1) per step |
//!
//! ## Zero-Copy Contracts
//!
//! Encoders own their output buffers: an encode call returns a slice that
//! stays valid until the next call on the same encoder. Decoders return
//! `Cow` values borrowing the input buffer wherever no transformation was
//! needed; the borrow checker ties decoded values to the buffer's
//! lifetime, and [`rows::Aliased`] spells the contract out in signatures.
//!
//! ## Concurrency
//!
//! Encoding and decoding are synchronous, CPU-only functions over
//! in-memory buffers. One encoder or decoder instance serves one caller at
//! a time (`&mut self`); distinct instances are independent. The row plan
//! cache is the only shared state inside an instance and supports
//! concurrent readers with double-checked writes.
//!
//! ## Byte Order
//!
//! The wire format is little-endian throughout, including the header
//! version field. Cross-endian interoperability is out of scope.

pub mod compress;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod records;
pub mod rows;

pub use error::{Error, Result};
pub use records::{
    decode_record, read_hot, FieldValue, Inspector, RecordBuilder, RecordEncoder, RecordHeader,
};
pub use rows::{RowDecoder, RowEncoder, RowOptions, RowShape};
