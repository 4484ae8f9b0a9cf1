//! # Record Decoders
//!
//! Three entry points over the same record bytes:
//!
//! - [`decode_record`] / [`decode_record_into`]: full materialization into a
//!   tag -> payload map, decompressing as needed. Hot-vtable records have
//!   both their vtable region and the trailing cold tag-walk region
//!   materialized.
//! - [`read_hot`]: O(1) random access to a hot field (tags 1-8).
//! - [`walk_element`]: one step of the self-delimiting tag-walk stream.
//!
//! ## Zero-Copy
//!
//! Decoded payloads are `Cow` slices of the input buffer: borrowed whenever
//! the bytes can be aliased directly, owned only when a compression service
//! had to expand them. The caller owns the input buffer and must keep it
//! alive for as long as the borrowed payloads are in use; the borrow
//! checker enforces this.
//!
//! ## Fixed-Width Delimitation
//!
//! A fixed (non-array, uncompressed) payload carries no inline length. Its
//! width comes from, in order: an explicit caller width, the width class
//! embedded in compFlags, or - inside a vtable data region - the start of
//! the next slot's payload (or the end of the buffer). A fixed tag-walk
//! element with no hint and no caller width cannot be delimited and is
//! reported as unsupported.

use std::borrow::Cow;

use hashbrown::HashMap;

use crate::compress::decompress;
use crate::encoding::fixed::{align8, check_slice, read_u16, read_u32};
use crate::encoding::varint::read_varuint;
use crate::error::{Error, Result};
use crate::records::header::RecordHeader;
use crate::records::types::{fixed_width, flags, ARRAY_MASK, COMPRESSION_MASK, SLOT_SIZE};

/// Fully decoded record: tag -> payload, decompressed as needed.
pub type DecodedRecord<'a> = HashMap<u16, Cow<'a, [u8]>>;

/// Caller-supplied widths for fixed tag-walk elements with no embedded hint.
pub type TagWidths = HashMap<u16, usize>;

/// One parsed tag-walk element. `payload` is the raw on-wire bytes
/// (still compressed when the element's codec is not Raw).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedField<'a> {
    pub tag: u16,
    pub comp_flags: u16,
    pub payload: &'a [u8],
    pub next_offset: usize,
}

/// One parsed vtable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotRef {
    pub tag: u16,
    pub comp_flags: u16,
    pub offset: u32,
}

pub(crate) fn read_slot(buf: &[u8], vtable_off: usize, index: usize) -> Result<SlotRef> {
    let base = vtable_off + index * SLOT_SIZE;
    Ok(SlotRef {
        tag: read_u16(buf, base)?,
        comp_flags: read_u16(buf, base + 2)?,
        offset: read_u32(buf, base + 4)?,
    })
}

/// Expands `raw` if its compFlags name a codec, otherwise borrows it.
pub(crate) fn finish_payload<'a>(comp_flags: u16, raw: &'a [u8]) -> Result<Cow<'a, [u8]>> {
    if comp_flags & COMPRESSION_MASK != 0 {
        decompress(comp_flags, raw, raw.len())
    } else {
        Ok(Cow::Borrowed(raw))
    }
}

/// Locates the raw payload of `slot` inside the data region, returning the
/// slice and its absolute end offset. `end_hint` is the absolute start of
/// the next payload (used to delimit unhinted fixed fields); `width` is an
/// explicit caller width that overrides everything else.
pub(crate) fn slot_payload_raw<'a>(
    buf: &'a [u8],
    header: &RecordHeader,
    slot: SlotRef,
    end_hint: Option<usize>,
    width: Option<usize>,
) -> Result<(&'a [u8], usize)> {
    let mut ptr = header.data_offset as usize + slot.offset as usize;
    if header.flags & flags::PADDING != 0 {
        ptr = align8(ptr);
    }
    if ptr > buf.len() {
        return Err(Error::ShortBuffer {
            needed: ptr,
            available: buf.len(),
        });
    }

    if slot.comp_flags & ARRAY_MASK != 0 || slot.comp_flags & COMPRESSION_MASK != 0 {
        let (size, n) = read_varuint(&buf[ptr..])?;
        let start = ptr + n;
        let raw = check_slice(buf, start, size as usize)?;
        Ok((raw, start + size as usize))
    } else {
        let resolved = match width {
            Some(w) => Some(w),
            None => fixed_width(slot.comp_flags)?,
        };
        match resolved {
            Some(w) => {
                let raw = check_slice(buf, ptr, w)?;
                Ok((raw, ptr + w))
            }
            None => {
                let end = end_hint
                    .ok_or(Error::Unsupported("fixed field needs a width hint"))?;
                if end < ptr || end > buf.len() {
                    return Err(Error::BadHeader("slot offsets out of order"));
                }
                Ok((&buf[ptr..end], end))
            }
        }
    }
}

/// Absolute start of slot `index + 1`'s payload, if any; `None` for the
/// last slot of a hot record, whose boundary is the cold region.
fn next_payload_start(
    buf: &[u8],
    header: &RecordHeader,
    index: usize,
    slot_count: usize,
) -> Result<Option<usize>> {
    if index + 1 < slot_count {
        let next = read_slot(buf, header.vtable_off as usize, index + 1)?;
        let mut start = header.data_offset as usize + next.offset as usize;
        if header.flags & flags::PADDING != 0 {
            start = align8(start);
        }
        Ok(Some(start))
    } else if header.flags & flags::MODE_HOT_VTABLE != 0 {
        Ok(None)
    } else {
        Ok(Some(buf.len()))
    }
}

/// Parses one tag-walk element at `offset`.
///
/// Returns `BufferEmpty` when the cursor is at or past the end of the
/// buffer; truncated elements fail with `ShortBuffer`.
pub fn walk_element<'a>(
    buf: &'a [u8],
    offset: usize,
    widths: Option<&TagWidths>,
) -> Result<WalkedField<'a>> {
    if offset >= buf.len() {
        return Err(Error::BufferEmpty);
    }
    let tag = read_u16(buf, offset)?;
    let comp_flags = read_u16(buf, offset + 2)?;
    if tag == 0 {
        return Err(Error::InvalidTag);
    }
    let mut pos = offset + 4;

    if comp_flags & ARRAY_MASK != 0 || comp_flags & COMPRESSION_MASK != 0 {
        let (size, n) = read_varuint(&buf[pos..])?;
        pos += n;
        let payload = check_slice(buf, pos, size as usize)?;
        Ok(WalkedField {
            tag,
            comp_flags,
            payload,
            next_offset: pos + size as usize,
        })
    } else {
        let width = match widths.and_then(|m| m.get(&tag).copied()) {
            Some(w) => w,
            None => fixed_width(comp_flags)?
                .ok_or(Error::Unsupported("fixed tag-walk element needs a width"))?,
        };
        let payload = check_slice(buf, pos, width)?;
        Ok(WalkedField {
            tag,
            comp_flags,
            payload,
            next_offset: pos + width,
        })
    }
}

/// Fully materializes a record into `out` (cleared first). Returns borrowed
/// slices of `buf` wherever possible.
pub fn decode_record_into<'a>(buf: &'a [u8], out: &mut DecodedRecord<'a>) -> Result<()> {
    out.clear();
    let header = RecordHeader::parse(buf)?;
    let slot_count = header.vtable_slots as usize;

    // End of the furthest vtable payload; in hot mode the cold region
    // starts here.
    let mut region_end = header.data_offset as usize;
    for i in 0..slot_count {
        let slot = read_slot(buf, header.vtable_off as usize, i)?;
        let end_hint = next_payload_start(buf, &header, i, slot_count)?;
        let (raw, end) = slot_payload_raw(buf, &header, slot, end_hint, None)?;
        region_end = region_end.max(end);
        out.insert(slot.tag, finish_payload(slot.comp_flags, raw)?);
    }

    if header.flags & flags::MODE_HOT_VTABLE != 0 {
        let mut pos = region_end;
        while pos < buf.len() {
            let walked = walk_element(buf, pos, None)?;
            out.insert(walked.tag, finish_payload(walked.comp_flags, walked.payload)?);
            pos = walked.next_offset;
        }
    }
    Ok(())
}

/// Allocating form of [`decode_record_into`].
pub fn decode_record(buf: &[u8]) -> Result<DecodedRecord<'_>> {
    let mut out = DecodedRecord::new();
    decode_record_into(buf, &mut out)?;
    Ok(out)
}

/// Materializes a headerless tag-walk stream into a map, decompressing as
/// needed. `widths` supplies widths for fixed elements with no embedded
/// hint.
pub fn decode_tag_walk<'a>(
    buf: &'a [u8],
    widths: Option<&TagWidths>,
) -> Result<DecodedRecord<'a>> {
    let mut out = DecodedRecord::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        let walked = walk_element(buf, pos, widths)?;
        out.insert(walked.tag, finish_payload(walked.comp_flags, walked.payload)?);
        pos = walked.next_offset;
    }
    Ok(out)
}

/// Materializes every hot field of a record, keyed by tag. Hot membership
/// comes from the header's hot bitmap; tags whose bits are clear are not
/// touched.
pub fn read_hot_fields(buf: &[u8]) -> Result<DecodedRecord<'_>> {
    let header = RecordHeader::parse(buf)?;
    let mut out = DecodedRecord::new();
    for tag in 1..=8u16 {
        if header.hot_bitmap >> (tag - 1) & 1 != 0 {
            out.insert(tag, read_hot(buf, tag, None)?);
        }
    }
    Ok(out)
}

/// Finds the vtable slot for `tag` by direct probe, falling back to binary
/// search over the tag-sorted slots.
pub(crate) fn find_slot(
    buf: &[u8],
    header: &RecordHeader,
    tag: u16,
) -> Result<Option<(usize, SlotRef)>> {
    let slot_count = header.vtable_slots as usize;
    let vt = header.vtable_off as usize;
    if tag == 0 {
        return Ok(None);
    }

    // Records laid out from tag 1 with no gaps put tag t in slot t-1.
    let probe = tag as usize - 1;
    if probe < slot_count {
        let slot = read_slot(buf, vt, probe)?;
        if slot.tag == tag {
            return Ok(Some((probe, slot)));
        }
    }

    let mut lo = 0usize;
    let mut hi = slot_count;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let slot = read_slot(buf, vt, mid)?;
        match slot.tag.cmp(&tag) {
            std::cmp::Ordering::Equal => return Ok(Some((mid, slot))),
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }
    Ok(None)
}

/// O(1) hot-field read over a full- or hot-vtable record.
///
/// `width` is the fixed width for non-array, uncompressed fields whose
/// compFlags embed no width class; variable payloads read their inline
/// varint length instead. Compressed payloads come back decompressed.
pub fn read_hot<'a>(buf: &'a [u8], tag: u16, width: Option<usize>) -> Result<Cow<'a, [u8]>> {
    let header = RecordHeader::parse(buf)?;
    if !(1..=8).contains(&tag) {
        return Err(Error::InvalidHotTag(tag));
    }
    if header.hot_bitmap >> (tag - 1) & 1 == 0 {
        return Err(Error::NotHotField(tag));
    }
    let slot_count = header.vtable_slots as usize;

    let (index, slot) = if header.flags & flags::MODE_HOT_VTABLE != 0 {
        // Hot mode: the vtable holds hot fields only, in tag order, so the
        // slot index is the number of hot bits below this tag.
        let below = header.hot_bitmap & ((1u8 << (tag - 1)) - 1);
        let index = below.count_ones() as usize;
        if index >= slot_count {
            return Err(Error::BadHeader("hot bitmap names a missing slot"));
        }
        let slot = read_slot(buf, header.vtable_off as usize, index)?;
        if slot.tag != tag {
            return Err(Error::BadHeader("hot bitmap and vtable disagree"));
        }
        (index, slot)
    } else {
        find_slot(buf, &header, tag)?.ok_or(Error::NotFound(tag))?
    };

    let end_hint = next_payload_start(buf, &header, index, slot_count)?;
    let (raw, _) = slot_payload_raw(buf, &header, slot, end_hint, width)?;
    finish_payload(slot.comp_flags, raw)
}
