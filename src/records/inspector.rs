//! # Inspector
//!
//! A stateful zero-copy reader over one record buffer. Three states:
//!
//! ```text
//! Idle --next()--> At(tag, pos) --next()--> ... --next()--> End
//! ```
//!
//! - [`next`](Inspector::next) advances past the current payload; returns
//!   `false` at the end, and stays there (further calls are no-ops).
//! - [`peek`](Inspector::peek) returns the current tag without consuming
//!   the payload; only available in the `At` state.
//! - [`field`](Inspector::field) returns the current element's bytes,
//!   decompressed if its compFlags name a codec.
//! - [`get_field`](Inspector::get_field) looks a tag up directly: vtable
//!   layouts search the slot table (probe, then binary search), tag-walk
//!   streams scan forward from the current cursor.
//!
//! One inspector walks one buffer; iteration order is ascending tag order
//! because that is the order every encoder writes. No concurrent iteration
//! on a single inspector (`&mut self` on every mutating operation).
//!
//! [`Inspector::new`] sniffs the buffer: a leading record magic selects the
//! vtable layout (full or hot, including the hot record's trailing cold
//! region), anything else is treated as a raw tag-walk stream. Use
//! [`Inspector::tag_walk`] when the stream shape is known, e.g. for streams
//! that could begin with bytes that collide with the magic.

use std::borrow::Cow;

use crate::encoding::fixed::read_u32;
use crate::error::{Error, Result};
use crate::records::decoder::{
    find_slot, finish_payload, read_slot, slot_payload_raw, walk_element, TagWidths,
};
use crate::records::header::RecordHeader;
use crate::records::types::{flags, MAGIC};

#[derive(Debug, Clone, Copy)]
enum Layout {
    VTable(RecordHeader),
    Stream,
}

/// Where the cursor continues after the current element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pos {
    /// Next vtable slot to visit.
    Slot(usize),
    /// Absolute offset inside a tag-walk region (cold region or stream).
    Walk(usize),
    End,
}

#[derive(Debug, Clone, Copy)]
struct Element<'a> {
    tag: u16,
    comp_flags: u16,
    payload: &'a [u8],
    /// Absolute offset of this element (tag-walk regions only; slots use 0).
    offset: usize,
}

#[derive(Debug)]
pub struct Inspector<'a> {
    buf: &'a [u8],
    layout: Layout,
    widths: Option<&'a TagWidths>,
    pos: Pos,
    current: Option<Element<'a>>,
    /// Furthest payload end seen while visiting slots; the cold region of a
    /// hot record starts at the maximum over all slots.
    region_end: usize,
}

impl<'a> Inspector<'a> {
    /// Opens `buf`, sniffing the layout from the leading magic.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() >= 4 && read_u32(buf, 0)? == MAGIC {
            let header = RecordHeader::parse(buf)?;
            Ok(Self {
                buf,
                layout: Layout::VTable(header),
                widths: None,
                pos: Pos::Slot(0),
                current: None,
                region_end: header.data_offset as usize,
            })
        } else {
            Ok(Self::tag_walk(buf))
        }
    }

    /// Opens `buf` as a raw tag-walk stream.
    pub fn tag_walk(buf: &'a [u8]) -> Self {
        Self {
            buf,
            layout: Layout::Stream,
            widths: None,
            pos: Pos::Walk(0),
            current: None,
            region_end: 0,
        }
    }

    /// Like [`Inspector::tag_walk`], with caller-supplied widths for fixed
    /// elements that embed no width class.
    pub fn tag_walk_with_widths(buf: &'a [u8], widths: &'a TagWidths) -> Self {
        Self {
            widths: Some(widths),
            ..Self::tag_walk(buf)
        }
    }

    /// Advances to the next element. Returns `false` at the end of the
    /// record; the inspector then stays at the end.
    pub fn next(&mut self) -> Result<bool> {
        match self.pos {
            Pos::End => {
                self.current = None;
                Ok(false)
            }
            Pos::Slot(i) => self.enter_slot(i),
            Pos::Walk(off) => self.enter_walk(off),
        }
    }

    fn enter_slot(&mut self, index: usize) -> Result<bool> {
        let Layout::VTable(header) = self.layout else {
            return Err(Error::BadHeader("slot cursor without a vtable"));
        };
        let slot_count = header.vtable_slots as usize;
        if index >= slot_count {
            return self.finish_slots(&header);
        }
        let slot = read_slot(self.buf, header.vtable_off as usize, index)?;
        let end_hint = self.next_start(&header, index, slot_count)?;
        let (raw, end) = slot_payload_raw(self.buf, &header, slot, end_hint, None)?;
        self.region_end = self.region_end.max(end);
        self.current = Some(Element {
            tag: slot.tag,
            comp_flags: slot.comp_flags,
            payload: raw,
            offset: 0,
        });
        self.pos = if index + 1 < slot_count {
            Pos::Slot(index + 1)
        } else {
            self.after_slots(&header)
        };
        Ok(true)
    }

    fn finish_slots(&mut self, header: &RecordHeader) -> Result<bool> {
        self.pos = self.after_slots(header);
        match self.pos {
            Pos::Walk(off) => self.enter_walk(off),
            _ => {
                self.current = None;
                self.pos = Pos::End;
                Ok(false)
            }
        }
    }

    fn after_slots(&self, header: &RecordHeader) -> Pos {
        if header.flags & flags::MODE_HOT_VTABLE != 0 && self.region_end < self.buf.len() {
            Pos::Walk(self.region_end)
        } else {
            Pos::End
        }
    }

    fn enter_walk(&mut self, offset: usize) -> Result<bool> {
        if offset >= self.buf.len() {
            self.current = None;
            self.pos = Pos::End;
            return Ok(false);
        }
        let walked = walk_element(self.buf, offset, self.widths)?;
        self.current = Some(Element {
            tag: walked.tag,
            comp_flags: walked.comp_flags,
            payload: walked.payload,
            offset,
        });
        self.pos = Pos::Walk(walked.next_offset);
        Ok(true)
    }

    fn next_start(
        &self,
        header: &RecordHeader,
        index: usize,
        slot_count: usize,
    ) -> Result<Option<usize>> {
        if index + 1 < slot_count {
            let next = read_slot(self.buf, header.vtable_off as usize, index + 1)?;
            Ok(Some(header.data_offset as usize + next.offset as usize))
        } else if header.flags & flags::MODE_HOT_VTABLE != 0 {
            Ok(None)
        } else {
            Ok(Some(self.buf.len()))
        }
    }

    /// Current tag, or `None` before the first `next` and after the end.
    pub fn peek(&self) -> Option<u16> {
        self.current.map(|e| e.tag)
    }

    /// Raw bytes of the current element, decompressed if needed. Only
    /// available between a successful `next` and the end of the record.
    pub fn field(&self) -> Result<Cow<'a, [u8]>> {
        let element = self.current.ok_or(Error::BufferEmpty)?;
        finish_payload(element.comp_flags, element.payload)
    }

    /// Looks up a tag directly. Vtable layouts search the slot table (and
    /// the cold region of hot records); tag-walk streams scan forward from
    /// the current cursor.
    pub fn get_field(&self, tag: u16) -> Result<Cow<'a, [u8]>> {
        match self.layout {
            Layout::VTable(header) => {
                if let Some((index, slot)) = find_slot(self.buf, &header, tag)? {
                    let end_hint =
                        self.next_start(&header, index, header.vtable_slots as usize)?;
                    let (raw, _) = slot_payload_raw(self.buf, &header, slot, end_hint, None)?;
                    return finish_payload(slot.comp_flags, raw);
                }
                if header.flags & flags::MODE_HOT_VTABLE != 0 {
                    let mut pos = self.cold_start(&header)?;
                    while pos < self.buf.len() {
                        let walked = walk_element(self.buf, pos, self.widths)?;
                        if walked.tag == tag {
                            return finish_payload(walked.comp_flags, walked.payload);
                        }
                        pos = walked.next_offset;
                    }
                }
                Err(Error::NotFound(tag))
            }
            Layout::Stream => {
                let mut pos = match (self.current, self.pos) {
                    (Some(element), _) => element.offset,
                    (None, Pos::Walk(off)) => off,
                    (None, _) => return Err(Error::NotFound(tag)),
                };
                while pos < self.buf.len() {
                    let walked = walk_element(self.buf, pos, self.widths)?;
                    if walked.tag == tag {
                        return finish_payload(walked.comp_flags, walked.payload);
                    }
                    pos = walked.next_offset;
                }
                Err(Error::NotFound(tag))
            }
        }
    }

    /// Absolute start of the cold region of a hot record, computed by
    /// walking every slot payload once.
    fn cold_start(&self, header: &RecordHeader) -> Result<usize> {
        let slot_count = header.vtable_slots as usize;
        let mut end = header.data_offset as usize;
        for i in 0..slot_count {
            let slot = read_slot(self.buf, header.vtable_off as usize, i)?;
            let end_hint = self.next_start(header, i, slot_count)?;
            let (_, payload_end) = slot_payload_raw(self.buf, header, slot, end_hint, None)?;
            end = end.max(payload_end);
        }
        Ok(end)
    }
}
