//! # Record Field Model
//!
//! The `(tag, compFlags, payload)` triple every record strategy encodes,
//! plus the compFlags bit layout shared by all of them.
//!
//! ## compFlags Layout
//!
//! | Bits  | Mask     | Meaning |
//! |-------|----------|---------|
//! | 0-3   | `0x000F` | compression ID (Raw=0, RLE=1, Huffman=2, LZ4=3, Zstd=4) |
//! | 4-10  | `0x07F0` | fixed-width class hint (0 = none, 1-11 = scalar kind) |
//! | 11-14 |          | reserved, must be zero |
//! | 15    | `0x8000` | ArrayMask: payload is variable-length, framed with an inline varint length |
//!
//! The width class lets decoders delimit fixed-width payloads without any
//! out-of-band schema: class `k` (1-11) maps to `ScalarKind` discriminant
//! `k - 1` and its width from the scalar width table. Class 0 means the
//! encoder embedded no hint and the caller (or the surrounding layout) must
//! supply the width. Classes 12-127 are invalid and decode as unsupported
//! rather than silently truncating.

use crate::encoding::fixed::ScalarKind;
use crate::error::{Error, Result};

/// Record magic, `"DBF3"` read as a little-endian u32.
pub const MAGIC: u32 = 0x4442_4633;

/// Current record format version.
pub const VERSION: u16 = 1;

/// compFlags bits 0-3: compression codec ID.
pub const COMPRESSION_MASK: u16 = 0x000F;

/// compFlags bits 4-10: fixed-width class hint.
pub const WIDTH_MASK: u16 = 0x07F0;
const WIDTH_SHIFT: u16 = 4;

/// compFlags bit 15: payload is variable-length.
pub const ARRAY_MASK: u16 = 0x8000;

/// Header size with a schema ID; 8 less when `FLAG_NO_SCHEMA_ID` is set.
pub const HEADER_SIZE: usize = 40;

/// Size of one vtable slot: `tag:u16 | compFlags:u16 | offset:u32`.
pub const SLOT_SIZE: usize = 8;

/// Header flag bits.
pub mod flags {
    /// 8-byte align each payload in the data region.
    pub const PADDING: u16 = 0x0001;
    /// Omit the 8-byte schema ID from the header.
    pub const NO_SCHEMA_ID: u16 = 0x0002;
    /// Hot-vtable layout: vtable covers hot fields, cold fields tag-walk.
    pub const MODE_HOT_VTABLE: u16 = 0x0004;
    /// Reserved layout mode.
    pub const MODE_NO_VTABLE: u16 = 0x0008;
    /// Tag-walk layout marker.
    pub const MODE_TAG_WALK: u16 = 0x0010;

    /// All layout-mode bits; zero means the full-vtable layout.
    pub const MODE_BITS: u16 = MODE_HOT_VTABLE | MODE_NO_VTABLE | MODE_TAG_WALK;
}

/// One field of a record: a caller-declared tag, its compFlags word, and a
/// borrowed payload. Tags are 1-based; tag 0 is reserved. Hot fields
/// additionally require `1 <= tag <= 8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValue<'a> {
    pub tag: u16,
    pub comp_flags: u16,
    pub payload: &'a [u8],
}

impl<'a> FieldValue<'a> {
    pub fn new(tag: u16, comp_flags: u16, payload: &'a [u8]) -> Self {
        Self {
            tag,
            comp_flags,
            payload,
        }
    }
}

/// Embeds the width class of `kind` into a compFlags word.
pub const fn with_width_hint(comp_flags: u16, kind: ScalarKind) -> u16 {
    (comp_flags & !WIDTH_MASK) | ((kind as u16 + 1) << WIDTH_SHIFT)
}

/// Extracts the fixed-width hint from a compFlags word.
///
/// Returns `Ok(Some(width))` for an embedded class, `Ok(None)` when the
/// encoder embedded no hint, and `Unsupported` for an invalid class.
pub fn fixed_width(comp_flags: u16) -> Result<Option<usize>> {
    let class = (comp_flags & WIDTH_MASK) >> WIDTH_SHIFT;
    match class {
        0 => Ok(None),
        1..=11 => {
            let kind = match class - 1 {
                0 => ScalarKind::Bool,
                1 => ScalarKind::I8,
                2 => ScalarKind::U8,
                3 => ScalarKind::I16,
                4 => ScalarKind::U16,
                5 => ScalarKind::I32,
                6 => ScalarKind::U32,
                7 => ScalarKind::I64,
                8 => ScalarKind::U64,
                9 => ScalarKind::F32,
                _ => ScalarKind::F64,
            };
            Ok(Some(kind.width()))
        }
        _ => Err(Error::Unsupported("invalid fixed-width class in compFlags")),
    }
}

/// Builds the hot bitmap for tags 1-8: bit `i` set iff tag `i + 1` is hot.
/// Tags outside 1..=8 are ignored; callers that require strictness validate
/// with [`check_hot_tags`] first.
pub fn hot_bitmap(tags: &[u16]) -> u8 {
    let mut bm = 0u8;
    for &t in tags {
        if (1..=8).contains(&t) {
            bm |= 1 << (t - 1);
        }
    }
    bm
}

/// Rejects hot tags outside 1..=8.
pub fn check_hot_tags(tags: &[u16]) -> Result<()> {
    for &t in tags {
        if !(1..=8).contains(&t) {
            return Err(Error::InvalidHotTag(t));
        }
    }
    Ok(())
}

/// Reports whether `fields` is already in ascending tag order.
pub fn is_sorted_by_tag(fields: &[FieldValue<'_>]) -> bool {
    fields.windows(2).all(|w| w[0].tag <= w[1].tag)
}
