//! # Record Codec
//!
//! Serializes a caller-supplied list of `(tag, compFlags, payload)` triples
//! into a framed record with one of three storage strategies, all agreeing
//! bit-exactly on the shared primitives (header, slot format, varint,
//! compression framing).
//!
//! ## Strategies
//!
//! ```text
//! FullVTable   +--------+--------------------+---------------------+
//!              | Header | Slot x N (8B each) | Data region         |
//!              +--------+--------------------+---------------------+
//!
//! HotVTable    +--------+-------------------+-----------+----------+
//!              | Header | Slot x hot fields | Hot data  | Cold     |
//!              |        | (tags 1..=8 only) | (padded)  | tag-walk |
//!              +--------+-------------------+-----------+----------+
//!
//! TagWalk      +-------------------------------------------+
//!              | tag | compFlags | [len] | payload | ...    |
//!              +-------------------------------------------+
//! ```
//!
//! | Strategy | Random access | Overhead | Use when |
//! |----------|---------------|----------|----------|
//! | FullVTable | O(log N), O(1) for dense tags | 8B/field + header | most fields are read |
//! | HotVTable | O(1) for hot tags | 8B/hot field + header | few fields dominate reads |
//! | TagWalk | O(N) scan | 4B/field | records are consumed whole |
//!
//! ## Payload Framing
//!
//! Within any data region, each payload is framed by its compFlags:
//!
//! - compressed (`compFlags & 0x000F != 0`): `varUint compressedSize |
//!   compressedBytes`
//! - array (`compFlags & 0x8000`, uncompressed): `varUint payloadSize |
//!   payloadBytes`
//! - fixed: payload bytes verbatim; the width comes from the compFlags
//!   width class, a caller width, or the next slot boundary
//!
//! ## Determinism
//!
//! Encoding a given `(schemaID, hotTags, fields)` triple always produces
//! the same bytes: field order is canonicalized by a stable tag sort, and
//! shuffling the input produces identical output.
//!
//! ## Module Structure
//!
//! - [`types`]: the field triple, compFlags layout, width hints
//! - [`header`]: 40/32-byte header codec
//! - [`layout`]: the planner every encoder drives
//! - [`encoder`]: buffer-reusing strategy encoders
//! - [`decoder`]: full materialization, hot reads, tag-walk stepping
//! - [`builder`]: append-style construction
//! - [`inspector`]: stateful zero-copy iteration

pub mod builder;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod inspector;
pub mod layout;
pub mod types;
pub mod value;


pub use builder::RecordBuilder;
pub use decoder::{
    decode_record, decode_record_into, decode_tag_walk, read_hot, read_hot_fields, walk_element,
    DecodedRecord, TagWidths, WalkedField,
};
pub use encoder::RecordEncoder;
pub use header::RecordHeader;
pub use inspector::Inspector;
pub use layout::{
    execute_plan, gen_payloads, gen_tag_walk, gen_vtable, partition_hot, LayoutPlan, SlotEntry,
    Strategy,
};
pub use types::{
    fixed_width, hot_bitmap, with_width_hint, FieldValue, ARRAY_MASK, COMPRESSION_MASK,
    HEADER_SIZE, MAGIC, SLOT_SIZE, VERSION, WIDTH_MASK,
};
