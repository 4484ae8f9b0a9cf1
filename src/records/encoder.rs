//! # Record Encoder
//!
//! [`RecordEncoder`] drives the layout planner through reusable scratch
//! buffers, one strategy entry point each:
//!
//! - [`encode_full`](RecordEncoder::encode_full): header + full vtable + data
//! - [`encode_hot`](RecordEncoder::encode_hot): header + hot vtable + padded
//!   hot payloads + cold tag-walk region
//! - [`encode_tag_walk`](RecordEncoder::encode_tag_walk): headerless stream
//!
//! Each call returns a slice into the encoder's output buffer; it stays
//! valid until the next encode call on the same encoder. Buffers are reset
//! at the start of every call, so an error never leaves stale bytes behind.
//!
//! ## Allocation Behavior
//!
//! All scratch (sort workspace, slot list, segment buffers) is reused
//! across calls. A pre-sorted field list skips the sort workspace entirely,
//! so steady-state encoding of sorted input performs no allocation once the
//! buffers have grown to the working-set size.
//!
//! ## Thread Safety
//!
//! An encoder owns its scratch and is single-caller by construction
//! (`&mut self`); distinct encoders are fully independent.

use crate::error::Result;
use crate::records::header::RecordHeader;
use crate::records::layout::{
    build_header, check_fields, gen_payloads_iter, gen_tag_walk_iter, gen_vtable_into, SlotEntry,
};
use crate::records::types::{check_hot_tags, flags, is_sorted_by_tag, FieldValue};

#[derive(Debug, Default)]
pub struct RecordEncoder {
    /// Persistent header flags (`PADDING`, `NO_SCHEMA_ID`); layout-mode
    /// bits are set per call by the strategy.
    header_flags: u16,
    sort_idx: Vec<u32>,
    hot_idx: Vec<u32>,
    cold_idx: Vec<u32>,
    slots: Vec<SlotEntry>,
    vtable: Vec<u8>,
    data: Vec<u8>,
    out: Vec<u8>,
}

/// Iterates fields either directly (pre-sorted input) or through an index
/// workspace, without copying the field list.
enum FieldOrder<'s, 'a> {
    Direct(std::slice::Iter<'s, FieldValue<'a>>),
    Indexed {
        fields: &'s [FieldValue<'a>],
        idx: std::slice::Iter<'s, u32>,
    },
}

impl<'s, 'a> Iterator for FieldOrder<'s, 'a> {
    type Item = FieldValue<'a>;

    fn next(&mut self) -> Option<FieldValue<'a>> {
        match self {
            FieldOrder::Direct(it) => it.next().copied(),
            FieldOrder::Indexed { fields, idx } => idx.next().map(|&i| fields[i as usize]),
        }
    }
}

/// Yields `fields` in ascending tag order. Pre-sorted input is served
/// directly and touches no workspace; otherwise `sort_idx` is filled and
/// sorted by `(tag, input position)`, equivalent to a stable sort.
fn sorted_order<'s, 'a>(
    sort_idx: &'s mut Vec<u32>,
    fields: &'s [FieldValue<'a>],
) -> FieldOrder<'s, 'a> {
    if is_sorted_by_tag(fields) {
        FieldOrder::Direct(fields.iter())
    } else {
        sort_idx.clear();
        sort_idx.extend(0..fields.len() as u32);
        sort_idx.sort_unstable_by_key(|&i| (fields[i as usize].tag, i));
        FieldOrder::Indexed {
            fields,
            idx: sort_idx.iter(),
        }
    }
}

impl RecordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with persistent header flags, e.g.
    /// `flags::PADDING` or `flags::NO_SCHEMA_ID`.
    pub fn with_flags(header_flags: u16) -> Self {
        Self {
            header_flags: header_flags & !flags::MODE_BITS,
            ..Self::default()
        }
    }

    pub fn header_flags(&self) -> u16 {
        self.header_flags
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.vtable.clear();
        self.data.clear();
        self.out.clear();
    }

    fn assemble(&mut self, header: RecordHeader) -> &[u8] {
        self.out.reserve(
            RecordHeader::encoded_len(header.flags) + self.vtable.len() + self.data.len(),
        );
        header.emit_into(&mut self.out);
        self.out.extend_from_slice(&self.vtable);
        self.out.extend_from_slice(&self.data);
        &self.out
    }

    /// Encodes a full-vtable record: every field gets a vtable slot.
    pub fn encode_full(
        &mut self,
        schema_id: u64,
        hot_tags: &[u16],
        fields: &[FieldValue<'_>],
    ) -> Result<&[u8]> {
        self.reset();
        check_fields(fields, true)?;
        check_hot_tags(hot_tags)?;

        let padding = self.header_flags & flags::PADDING != 0;
        let order = sorted_order(&mut self.sort_idx, fields);
        gen_payloads_iter(order, padding, &mut self.data, &mut self.slots)?;
        gen_vtable_into(&self.slots, &mut self.vtable);

        let header = build_header(self.header_flags, schema_id, hot_tags, self.slots.len());
        Ok(self.assemble(header))
    }

    /// Encodes a hot-vtable record: hot fields (tag in `hot_tags`) get the
    /// vtable + padded data region, cold fields follow as a tag-walk
    /// stream.
    pub fn encode_hot(
        &mut self,
        schema_id: u64,
        hot_tags: &[u16],
        fields: &[FieldValue<'_>],
    ) -> Result<&[u8]> {
        self.reset();
        check_fields(fields, true)?;
        check_hot_tags(hot_tags)?;

        // Partition into index lists, preserving ascending tag order in
        // both halves.
        self.hot_idx.clear();
        self.cold_idx.clear();
        if is_sorted_by_tag(fields) {
            for (i, field) in fields.iter().enumerate() {
                if hot_tags.contains(&field.tag) {
                    self.hot_idx.push(i as u32);
                } else {
                    self.cold_idx.push(i as u32);
                }
            }
        } else {
            self.sort_idx.clear();
            self.sort_idx.extend(0..fields.len() as u32);
            self.sort_idx
                .sort_unstable_by_key(|&i| (fields[i as usize].tag, i));
            for i in 0..self.sort_idx.len() {
                let idx = self.sort_idx[i];
                if hot_tags.contains(&fields[idx as usize].tag) {
                    self.hot_idx.push(idx);
                } else {
                    self.cold_idx.push(idx);
                }
            }
        }

        let header_flags = self.header_flags | flags::MODE_HOT_VTABLE | flags::PADDING;
        let hot = FieldOrder::Indexed {
            fields,
            idx: self.hot_idx.iter(),
        };
        gen_payloads_iter(hot, true, &mut self.data, &mut self.slots)?;
        let cold = FieldOrder::Indexed {
            fields,
            idx: self.cold_idx.iter(),
        };
        gen_tag_walk_iter(cold, &mut self.data)?;
        gen_vtable_into(&self.slots, &mut self.vtable);

        let header = build_header(header_flags, schema_id, hot_tags, self.slots.len());
        Ok(self.assemble(header))
    }

    /// Encodes a headerless tag-walk stream.
    pub fn encode_tag_walk(&mut self, fields: &[FieldValue<'_>]) -> Result<&[u8]> {
        self.reset();
        check_fields(fields, false)?;
        let order = sorted_order(&mut self.sort_idx, fields);
        gen_tag_walk_iter(order, &mut self.out)?;
        Ok(&self.out)
    }
}
