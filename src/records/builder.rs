//! # Record Builder
//!
//! An append-style facade over the layout planner. Fields accumulate via
//! [`add_field`](RecordBuilder::add_field); [`commit`](RecordBuilder::commit)
//! picks the strategy from the flag word's layout-mode bits and runs the
//! planner.
//!
//! The builder deduplicates sort work: when every `add_field` call asserted
//! `sorted` and the tags actually arrived in ascending order, commit skips
//! sorting entirely. The assertion is verified cheaply against the previous
//! tag, so a wrong assertion degrades to a sort instead of a corrupt
//! record.

use smallvec::SmallVec;

use crate::error::Result;
use crate::records::layout::{execute_plan, LayoutPlan, Strategy};
use crate::records::types::{flags, FieldValue};

#[derive(Debug, Default)]
pub struct RecordBuilder<'a> {
    fields: Vec<FieldValue<'a>>,
    hot_tags: SmallVec<[u16; 8]>,
    ascending: bool,
    out: Vec<u8>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new() -> Self {
        Self {
            ascending: true,
            ..Self::default()
        }
    }

    /// Appends a field. `sorted` asserts that this tag keeps the field list
    /// in ascending order; the claim is checked against the previous tag.
    pub fn add_field(
        &mut self,
        tag: u16,
        comp_flags: u16,
        payload: &'a [u8],
        sorted: bool,
    ) -> &mut Self {
        if self.ascending {
            let in_order = self.fields.last().map_or(true, |prev| prev.tag <= tag);
            self.ascending = sorted && in_order;
        }
        self.fields.push(FieldValue::new(tag, comp_flags, payload));
        self
    }

    /// Declares the hot tags used by the hot-vtable strategy and the header
    /// hot bitmap.
    pub fn set_hot_tags(&mut self, tags: &[u16]) -> &mut Self {
        self.hot_tags.clear();
        self.hot_tags.extend_from_slice(tags);
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Clears accumulated fields for reuse; buffers keep their capacity.
    pub fn reset(&mut self) {
        self.fields.clear();
        self.hot_tags.clear();
        self.ascending = true;
        self.out.clear();
    }

    /// Runs the planner. The strategy comes from the layout-mode bits of
    /// `header_flags`: `MODE_TAG_WALK` selects the tag-walk stream,
    /// `MODE_HOT_VTABLE` the hot layout, anything else the full vtable.
    ///
    /// The returned slice borrows the builder and stays valid until the
    /// next commit or reset.
    pub fn commit(&mut self, schema_id: u64, header_flags: u16) -> Result<&[u8]> {
        let strategy = if header_flags & flags::MODE_TAG_WALK != 0 {
            Strategy::TagWalk
        } else if header_flags & flags::MODE_HOT_VTABLE != 0 {
            Strategy::HotVTable
        } else {
            Strategy::FullVTable
        };

        if !self.ascending {
            self.fields.sort_by_key(|f| f.tag);
            self.ascending = true;
        }

        let plan = LayoutPlan {
            fields: &self.fields,
            schema_id,
            hot_tags: &self.hot_tags,
            strategy,
            flags: header_flags,
        };
        self.out = execute_plan(&plan)?;
        Ok(&self.out)
    }
}
