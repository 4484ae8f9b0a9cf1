//! # Row Decoder
//!
//! The inverse of the row encoder: reads `varUint N`, then the variable-
//! field offset table, then materializes fields in declaration order.
//! Variable fields position by their table offset (the table is
//! authoritative); fixed fields read sequentially from the running cursor.
//!
//! A zero `N` leaves the destination unchanged. A nonzero `N` that
//! disagrees with the shape's plan is a malformed record for this shape
//! (schema evolution is out of scope) and fails with `BadHeader`.
//!
//! ## Zero-Copy Reads
//!
//! String, byte, and scalar-sequence reads return `Cow` values borrowing
//! the input buffer when the options allow aliasing:
//!
//! - `unsafe_strings`: strings alias the input (`Cow::Borrowed`)
//! - `unsafe_primitives`: byte arrays and scalar sequences alias the input;
//!   scalar sequences go through an alignment-verified zerocopy cast
//!   (little-endian targets only) and fall back to an element-wise copy
//!   when the buffer is misaligned or the target is big-endian
//! - `check_alignment`: pre-check the base address before attempting the
//!   cast; without it the cast itself still verifies, so a misaligned
//!   buffer can only ever produce a copy, never undefined behavior
//!
//! The caller owns the input buffer and must keep it alive while borrowed
//! values are in use; the borrow checker enforces the contract, and
//! [`Aliased`](crate::rows::Aliased) makes it explicit in API signatures.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use smallvec::SmallVec;
use zerocopy::FromBytes;

use crate::encoding::fixed::{check_slice, ScalarKind};
use crate::encoding::varint::read_varuint;
use crate::error::{Error, Result};
use crate::rows::kind::{FieldKind, ScalarElem};
use crate::rows::plan::{PlanCache, RowPlan, ShapeRegistry};
use crate::rows::{Aliased, RowOptions, RowShape};

#[derive(Default)]
pub struct RowDecoder {
    opts: RowOptions,
    plans: PlanCache,
    registry: ShapeRegistry,
}

impl RowDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(opts: RowOptions) -> Self {
        Self {
            opts,
            ..Self::default()
        }
    }

    pub fn options(&self) -> RowOptions {
        self.opts
    }

    /// Registers `T` for the dynamically-typed [`decode_any`] entry point.
    ///
    /// [`decode_any`]: RowDecoder::decode_any
    pub fn register<T>(&mut self)
    where
        T: for<'b> RowShape<'b> + Any,
    {
        self.registry.register::<T>();
    }

    /// Decodes into an existing destination. A zero field count leaves
    /// `out` unchanged.
    pub fn decode_into<'b, T: RowShape<'b>>(&self, data: &'b [u8], out: &mut T) -> Result<()> {
        let plan = self.plans.plan_for(T::fields());
        let Some(mut reader) = self.make_reader(plan, data)? else {
            return Ok(());
        };
        out.read_fields(&mut reader)?;
        reader.finish()
    }

    /// Decodes a fresh row value.
    pub fn decode<'b, T: RowShape<'b> + Default>(&self, data: &'b [u8]) -> Result<T> {
        let mut out = T::default();
        self.decode_into(data, &mut out)?;
        Ok(out)
    }

    /// Decodes a fresh row value wrapped in the aliasing guard, making the
    /// decoded value's dependence on `data` explicit in the types.
    pub fn decode_aliased<'b, T: RowShape<'b> + Default>(
        &self,
        data: &'b [u8],
    ) -> Result<Aliased<'b, T>> {
        Ok(Aliased::new(self.decode(data)?, data))
    }

    /// Dynamically-typed decode: `out` must be a mutable reference to a
    /// registered row type, otherwise this fails with `NotStructPointer`.
    pub fn decode_any(&self, data: &[u8], out: &mut dyn Any) -> Result<()> {
        let shape = self
            .registry
            .get((*out).type_id())
            .ok_or(Error::NotStructPointer)?;
        let plan = self.plans.plan_for(shape.kinds);
        let Some(mut reader) = self.make_reader(plan, data)? else {
            return Ok(());
        };
        (shape.read)(out, &mut reader)?;
        reader.finish()
    }

    fn make_reader<'b>(
        &self,
        plan: Arc<RowPlan>,
        data: &'b [u8],
    ) -> Result<Option<RowReader<'b>>> {
        let (n, mut pos) = read_varuint(data)?;
        if n == 0 {
            return Ok(None);
        }
        if n as usize != plan.field_count {
            return Err(Error::BadHeader("row field count does not match the shape"));
        }

        let mut offsets: SmallVec<[usize; 16]> = SmallVec::new();
        for _ in 0..plan.var_count {
            let (off, used) = read_varuint(&data[pos..])?;
            pos += used;
            offsets.push(off as usize);
        }

        Ok(Some(RowReader {
            plan,
            opts: self.opts,
            body: &data[pos..],
            offsets,
            field_idx: 0,
            var_idx: 0,
            pos: 0,
        }))
    }
}

/// Plan-validating body reader handed to `RowShape::read_fields`.
///
/// `'b` is the input buffer lifetime; borrowed (`Cow::Borrowed`) return
/// values live as long as that buffer.
pub struct RowReader<'b> {
    plan: Arc<RowPlan>,
    opts: RowOptions,
    body: &'b [u8],
    offsets: SmallVec<[usize; 16]>,
    field_idx: usize,
    var_idx: usize,
    pos: usize,
}

impl<'b> RowReader<'b> {
    fn expect(&mut self, want: FieldKind) -> Result<()> {
        let info = self
            .plan
            .fields
            .get(self.field_idx)
            .ok_or(Error::Unsupported("row read more fields than declared"))?;
        if info.kind != want {
            return Err(Error::Unsupported("field kind does not match the declared shape"));
        }
        if info.is_variable {
            let start = *self
                .offsets
                .get(self.var_idx)
                .ok_or(Error::BadHeader("missing variable-field offset"))?;
            if start > self.body.len() {
                return Err(Error::ShortBuffer {
                    needed: start,
                    available: self.body.len(),
                });
            }
            self.var_idx += 1;
            self.pos = start;
        }
        self.field_idx += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.field_idx != self.plan.field_count {
            return Err(Error::Unsupported("row read fewer fields than declared"));
        }
        Ok(())
    }

    /// Reads a length-prefixed blob at the cursor, advancing past it.
    fn take_blob(&mut self) -> Result<&'b [u8]> {
        let (len, used) = read_varuint(&self.body[self.pos..])?;
        let start = self.pos + used;
        let blob = check_slice(self.body, start, len as usize)?;
        self.pos = start + len as usize;
        Ok(blob)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.expect(FieldKind::Scalar(ScalarKind::Bool))?;
        let byte = check_slice(self.body, self.pos, 1)?[0];
        self.pos += 1;
        Ok(byte != 0)
    }

    /// Reads any fixed-width scalar from its little-endian bytes.
    pub fn read_scalar<T: ScalarElem>(&mut self) -> Result<T> {
        self.expect(FieldKind::Scalar(T::KIND))?;
        let width = T::KIND.width();
        let value = T::read_le(check_slice(self.body, self.pos, width)?)?;
        self.pos += width;
        Ok(value)
    }

    /// Reads a string field: borrowed from the input under
    /// `unsafe_strings`, copied otherwise.
    pub fn read_str(&mut self) -> Result<Cow<'b, str>> {
        self.expect(FieldKind::Str)?;
        let blob = self.take_blob()?;
        let s = std::str::from_utf8(blob).map_err(|_| Error::InvalidUtf8)?;
        if self.opts.unsafe_strings {
            Ok(Cow::Borrowed(s))
        } else {
            Ok(Cow::Owned(s.to_owned()))
        }
    }

    /// Reads a byte-array field: borrowed under `unsafe_primitives`,
    /// copied otherwise.
    pub fn read_bytes(&mut self) -> Result<Cow<'b, [u8]>> {
        self.expect(FieldKind::Bytes)?;
        let blob = self.take_blob()?;
        if self.opts.unsafe_primitives {
            Ok(Cow::Borrowed(blob))
        } else {
            Ok(Cow::Owned(blob.to_vec()))
        }
    }

    /// Reads a scalar sequence. Under `unsafe_primitives` the elements are
    /// aliased over the input via an alignment-verified cast; a misaligned
    /// buffer falls back to the element-wise copy. The cast reinterprets
    /// wire bytes as in-memory values, so it is only taken on
    /// little-endian targets; everywhere else the little-endian copy path
    /// serves the read.
    pub fn read_seq<T: ScalarElem>(&mut self) -> Result<Cow<'b, [T]>> {
        self.expect(FieldKind::ScalarSeq(T::KIND))?;
        let (count, used) = read_varuint(&self.body[self.pos..])?;
        let count = count as usize;
        let width = T::KIND.width();
        let byte_len = count
            .checked_mul(width)
            .ok_or(Error::BadHeader("sequence length overflow"))?;
        let start = self.pos + used;
        let raw = check_slice(self.body, start, byte_len)?;
        self.pos = start + byte_len;

        if self.opts.unsafe_primitives && cfg!(target_endian = "little") {
            let aligned = !self.opts.check_alignment
                || (raw.as_ptr() as usize) % T::KIND.alignment() == 0;
            if aligned {
                if let Ok(view) = <[T]>::ref_from_bytes(raw) {
                    return Ok(Cow::Borrowed(view));
                }
            }
        }

        let mut values = Vec::with_capacity(count);
        for chunk in raw.chunks_exact(width) {
            values.push(T::read_le(chunk)?);
        }
        Ok(Cow::Owned(values))
    }

    /// Reads a bool sequence. Always copied: arbitrary buffer bytes are
    /// not valid `bool` representations, so this sequence kind never
    /// aliases.
    pub fn read_bool_seq(&mut self) -> Result<Vec<bool>> {
        self.expect(FieldKind::ScalarSeq(ScalarKind::Bool))?;
        let (count, used) = read_varuint(&self.body[self.pos..])?;
        let start = self.pos + used;
        let raw = check_slice(self.body, start, count as usize)?;
        self.pos = start + count as usize;
        Ok(raw.iter().map(|&b| b != 0).collect())
    }

    pub fn read_str_seq(&mut self) -> Result<Vec<Cow<'b, str>>> {
        self.expect(FieldKind::StrSeq)?;
        let (count, used) = read_varuint(&self.body[self.pos..])?;
        self.pos += used;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (len, used) = read_varuint(&self.body[self.pos..])?;
            let start = self.pos + used;
            let blob = check_slice(self.body, start, len as usize)?;
            self.pos = start + len as usize;
            let s = std::str::from_utf8(blob).map_err(|_| Error::InvalidUtf8)?;
            values.push(if self.opts.unsafe_strings {
                Cow::Borrowed(s)
            } else {
                Cow::Owned(s.to_owned())
            });
        }
        Ok(values)
    }

    pub fn read_bytes_seq(&mut self) -> Result<Vec<Cow<'b, [u8]>>> {
        self.expect(FieldKind::BytesSeq)?;
        let (count, used) = read_varuint(&self.body[self.pos..])?;
        self.pos += used;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (len, used) = read_varuint(&self.body[self.pos..])?;
            let start = self.pos + used;
            let blob = check_slice(self.body, start, len as usize)?;
            self.pos = start + len as usize;
            values.push(if self.opts.unsafe_primitives {
                Cow::Borrowed(blob)
            } else {
                Cow::Owned(blob.to_vec())
            });
        }
        Ok(values)
    }
}
