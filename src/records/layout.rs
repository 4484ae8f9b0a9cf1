//! # Layout Planner
//!
//! The single switchboard behind every record encoder. A [`LayoutPlan`]
//! names the inputs (fields, schema ID, hot tags), the storage strategy,
//! and the header flags; [`execute_plan`] pre-sorts the fields, partitions
//! hot from cold where the strategy calls for it, generates the payload
//! region and its offsets, the vtable bytes, and the header, then
//! concatenates the segments.
//!
//! The strategy-specific entry points on `RecordEncoder` are conveniences
//! over this module and produce byte-identical output, which the tests pin
//! down segment by segment via the standalone generators
//! ([`gen_payloads`], [`gen_vtable`], [`gen_tag_walk`]).
//!
//! ## Determinism
//!
//! Output bytes depend only on `(schema_id, hot_tags, fields, flags)`.
//! Sorting is stable (ties keep input order), partitioning preserves the
//! sorted order, and nothing on the encode path iterates a hash map.

use smallvec::SmallVec;

use crate::compress::{compress, Compression};
use crate::encoding::fixed::align8;
use crate::encoding::varint::write_varuint;
use crate::error::{Error, Result};
use crate::records::header::{make_header, RecordHeader};
use crate::records::types::{
    check_hot_tags, flags, hot_bitmap, is_sorted_by_tag, FieldValue, ARRAY_MASK, COMPRESSION_MASK,
    SLOT_SIZE,
};

/// Record storage strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Header + one vtable slot per field + data region.
    FullVTable,
    /// Header + vtable over hot fields only; cold fields tag-walk behind.
    HotVTable,
    /// Headerless self-delimiting element stream.
    TagWalk,
}

/// Inputs to one planned encode.
#[derive(Debug, Clone, Copy)]
pub struct LayoutPlan<'a> {
    pub fields: &'a [FieldValue<'a>],
    pub schema_id: u64,
    pub hot_tags: &'a [u16],
    pub strategy: Strategy,
    /// Header flag bits; layout-mode bits are overridden by `strategy`.
    pub flags: u16,
}

/// One generated vtable entry, prior to byte serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    pub tag: u16,
    pub comp_flags: u16,
    /// Payload position relative to the start of the data region.
    pub offset: u32,
}

/// Validates tags and, for vtable strategies, the slot-count limit.
pub(crate) fn check_fields(fields: &[FieldValue<'_>], vtable: bool) -> Result<()> {
    for f in fields {
        if f.tag == 0 {
            return Err(Error::InvalidTag);
        }
    }
    if vtable && fields.len() > u8::MAX as usize {
        return Err(Error::Unsupported("more than 255 vtable slots"));
    }
    Ok(())
}

/// Appends one payload with its framing: compressed payloads get a varint
/// size prefix, arrays a varint length prefix, fixed payloads go verbatim.
fn emit_payload(field: &FieldValue<'_>, data: &mut Vec<u8>) -> Result<()> {
    if field.comp_flags & COMPRESSION_MASK != Compression::Raw as u16 {
        let packed = compress(field.comp_flags, field.payload)?;
        write_varuint(data, packed.len() as u64);
        data.extend_from_slice(&packed);
    } else if field.comp_flags & ARRAY_MASK != 0 {
        write_varuint(data, field.payload.len() as u64);
        data.extend_from_slice(field.payload);
    } else {
        data.extend_from_slice(field.payload);
    }
    Ok(())
}

/// Generates the data region for `fields` (already in tag order), recording
/// one [`SlotEntry`] per field. When `padding` is set each payload is
/// 8-byte aligned first and the recorded offset is the post-padding
/// position.
pub(crate) fn gen_payloads_iter<'a>(
    fields: impl Iterator<Item = FieldValue<'a>>,
    padding: bool,
    data: &mut Vec<u8>,
    slots: &mut Vec<SlotEntry>,
) -> Result<()> {
    const ZEROS: [u8; 8] = [0u8; 8];
    for field in fields {
        if padding {
            let pad = align8(data.len()) - data.len();
            data.extend_from_slice(&ZEROS[..pad]);
        }
        slots.push(SlotEntry {
            tag: field.tag,
            comp_flags: field.comp_flags,
            offset: data.len() as u32,
        });
        emit_payload(&field, data)?;
    }
    Ok(())
}

/// Allocating form of [`gen_payloads_iter`]. `fields` must be sorted.
pub fn gen_payloads(
    fields: &[FieldValue<'_>],
    padding: bool,
) -> Result<(Vec<u8>, Vec<SlotEntry>)> {
    let mut data = Vec::new();
    let mut slots = Vec::with_capacity(fields.len());
    gen_payloads_iter(fields.iter().copied(), padding, &mut data, &mut slots)?;
    Ok((data, slots))
}

/// Serializes vtable slots: `tag:u16 | compFlags:u16 | offset:u32`, LE.
pub(crate) fn gen_vtable_into(slots: &[SlotEntry], out: &mut Vec<u8>) {
    out.reserve(slots.len() * SLOT_SIZE);
    for slot in slots {
        out.extend_from_slice(&slot.tag.to_le_bytes());
        out.extend_from_slice(&slot.comp_flags.to_le_bytes());
        out.extend_from_slice(&slot.offset.to_le_bytes());
    }
}

/// Allocating form of [`gen_vtable_into`].
pub fn gen_vtable(slots: &[SlotEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    gen_vtable_into(slots, &mut out);
    out
}

/// Generates a tag-walk element stream for `fields` (already in tag order):
/// `tag:u16 | compFlags:u16 | [varint length] | payload` per element.
///
/// Tag-walk streams are never padded: a headerless stream has no flag
/// channel to tell a reader about alignment, so padding would make the
/// stream unwalkable.
pub(crate) fn gen_tag_walk_iter<'a>(
    fields: impl Iterator<Item = FieldValue<'a>>,
    out: &mut Vec<u8>,
) -> Result<()> {
    for field in fields {
        out.extend_from_slice(&field.tag.to_le_bytes());
        out.extend_from_slice(&field.comp_flags.to_le_bytes());
        emit_payload(&field, out)?;
    }
    Ok(())
}

/// Allocating form of [`gen_tag_walk_iter`]. `fields` must be sorted.
pub fn gen_tag_walk(fields: &[FieldValue<'_>]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    gen_tag_walk_iter(fields.iter().copied(), &mut out)?;
    Ok(out)
}

/// Splits sorted fields into hot (tag in `hot_tags`) and cold, preserving
/// the sorted order of both halves.
pub fn partition_hot<'a>(
    sorted: impl Iterator<Item = FieldValue<'a>>,
    hot_tags: &[u16],
) -> (SmallVec<[FieldValue<'a>; 8]>, Vec<FieldValue<'a>>) {
    let mut hot = SmallVec::new();
    let mut cold = Vec::new();
    for field in sorted {
        if hot_tags.contains(&field.tag) {
            hot.push(field);
        } else {
            cold.push(field);
        }
    }
    (hot, cold)
}

/// Builds the record header for a vtable layout.
pub fn build_header(header_flags: u16, schema_id: u64, hot_tags: &[u16], slots: usize) -> RecordHeader {
    make_header(header_flags, schema_id, hot_bitmap(hot_tags), slots as u8)
}

/// Runs a [`LayoutPlan`] to completion, returning the record bytes.
pub fn execute_plan(plan: &LayoutPlan<'_>) -> Result<Vec<u8>> {
    let mut sorted: Vec<FieldValue<'_>>;
    let fields: &[FieldValue<'_>] = if is_sorted_by_tag(plan.fields) {
        plan.fields
    } else {
        sorted = plan.fields.to_vec();
        sorted.sort_by_key(|f| f.tag);
        &sorted
    };

    match plan.strategy {
        Strategy::FullVTable => {
            check_fields(fields, true)?;
            check_hot_tags(plan.hot_tags)?;
            let header_flags = plan.flags & !flags::MODE_BITS;
            let padding = header_flags & flags::PADDING != 0;
            let (data, slots) = gen_payloads(fields, padding)?;
            let vtable = gen_vtable(&slots);
            let header = build_header(header_flags, plan.schema_id, plan.hot_tags, slots.len());
            let mut out = Vec::with_capacity(
                RecordHeader::encoded_len(header_flags) + vtable.len() + data.len(),
            );
            header.emit_into(&mut out);
            out.extend_from_slice(&vtable);
            out.extend_from_slice(&data);
            Ok(out)
        }
        Strategy::HotVTable => {
            check_fields(fields, true)?;
            check_hot_tags(plan.hot_tags)?;
            let header_flags =
                (plan.flags & !flags::MODE_BITS) | flags::MODE_HOT_VTABLE | flags::PADDING;
            let (hot, cold) = partition_hot(fields.iter().copied(), plan.hot_tags);
            let (mut data, slots) = gen_payloads(&hot, true)?;
            gen_tag_walk_iter(cold.iter().copied(), &mut data)?;
            let vtable = gen_vtable(&slots);
            let header = build_header(header_flags, plan.schema_id, plan.hot_tags, slots.len());
            let mut out = Vec::with_capacity(
                RecordHeader::encoded_len(header_flags) + vtable.len() + data.len(),
            );
            header.emit_into(&mut out);
            out.extend_from_slice(&vtable);
            out.extend_from_slice(&data);
            Ok(out)
        }
        Strategy::TagWalk => {
            check_fields(fields, false)?;
            gen_tag_walk(fields)
        }
    }
}
