//! # Row Encoder
//!
//! Serializes a row shape into the wire form
//! `varUint N | varUint bodyOffset per variable field | body`, where the
//! offsets are relative to the body start and recorded in declaration
//! order.
//!
//! The encoder owns its output and scratch buffers; `encode` returns a
//! slice into them that stays valid until the next encode call. Buffers
//! are cleared at the start of every call, so errors discard partial
//! output.
//!
//! ## Writer Validation
//!
//! [`RowWriter`] checks every `put_*` call against the cached plan: wrong
//! kind, too many fields, or too few fields at the end all fail with
//! `Unsupported`. The shape description and the emit order therefore
//! cannot silently drift apart.

use std::any::Any;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::encoding::varint::write_varuint;
use crate::error::{Error, Result};
use crate::rows::kind::{FieldKind, ScalarElem};
use crate::rows::plan::{PlanCache, RowPlan, ShapeRegistry};
use crate::rows::{RowOptions, RowShape};
use crate::encoding::fixed::ScalarKind;

#[derive(Default)]
pub struct RowEncoder {
    opts: RowOptions,
    plans: PlanCache,
    registry: ShapeRegistry,
    buf: Vec<u8>,
    body: Vec<u8>,
    offsets: SmallVec<[u64; 16]>,
}

impl RowEncoder {
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

    /// Registers `T` for the dynamically-typed [`encode_any`] entry point.
    ///
    /// [`encode_any`]: RowEncoder::encode_any
    pub fn register<T>(&mut self)
    where
        T: for<'b> RowShape<'b> + Any,
    {
        self.registry.register::<T>();
    }

    /// Encodes one row. The returned slice borrows the encoder and is
    /// valid until the next encode call.
    pub fn encode<'b, T: RowShape<'b>>(&mut self, row: &T) -> Result<&[u8]> {
        let plan = self.plans.plan_for(T::fields());
        self.encode_with(plan, |writer| row.write_fields(writer))
    }

    /// Dynamically-typed encode: `value` must be a registered row type,
    /// otherwise this fails with `NotStruct`.
    pub fn encode_any(&mut self, value: &dyn Any) -> Result<&[u8]> {
        let shape = self
            .registry
            .get(value.type_id())
            .ok_or(Error::NotStruct)?;
        let plan = self.plans.plan_for(shape.kinds);
        self.encode_with(plan, |writer| (shape.write)(value, writer))
    }

    fn encode_with(
        &mut self,
        plan: Arc<RowPlan>,
        emit: impl FnOnce(&mut RowWriter<'_>) -> Result<()>,
    ) -> Result<&[u8]> {
        self.buf.clear();
        self.body.clear();
        self.offsets.clear();
        // Fixed fields have exact sizes; variable fields get a starting
        // guess that the buffer grows past on demand.
        self.body.reserve(plan.fixed_size + plan.var_count * 32);

        write_varuint(&mut self.buf, plan.field_count as u64);

        let mut writer = RowWriter {
            plan,
            opts: self.opts,
            body: &mut self.body,
            offsets: &mut self.offsets,
            cursor: 0,
        };
        emit(&mut writer)?;
        writer.finish()?;

        for &off in self.offsets.iter() {
            write_varuint(&mut self.buf, off);
        }
        self.buf.extend_from_slice(&self.body);
        Ok(&self.buf)
    }
}

/// Plan-validating body writer handed to `RowShape::write_fields`.
pub struct RowWriter<'a> {
    plan: Arc<RowPlan>,
    opts: RowOptions,
    body: &'a mut Vec<u8>,
    offsets: &'a mut SmallVec<[u64; 16]>,
    cursor: usize,
}

impl RowWriter<'_> {
    fn expect(&mut self, want: FieldKind) -> Result<()> {
        let info = self
            .plan
            .fields
            .get(self.cursor)
            .ok_or(Error::Unsupported("row emitted more fields than declared"))?;
        if info.kind != want {
            return Err(Error::Unsupported("field kind does not match the declared shape"));
        }
        if info.is_variable {
            self.offsets.push(self.body.len() as u64);
        }
        self.cursor += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.cursor != self.plan.field_count {
            return Err(Error::Unsupported("row emitted fewer fields than declared"));
        }
        Ok(())
    }

    pub fn put_bool(&mut self, value: bool) -> Result<()> {
        self.expect(FieldKind::Scalar(ScalarKind::Bool))?;
        self.body.push(u8::from(value));
        Ok(())
    }

    /// Writes any fixed-width scalar as little-endian bytes.
    pub fn put_scalar<T: ScalarElem>(&mut self, value: T) -> Result<()> {
        self.expect(FieldKind::Scalar(T::KIND))?;
        value.write_le(self.body);
        Ok(())
    }

    pub fn put_str(&mut self, value: &str) -> Result<()> {
        self.expect(FieldKind::Str)?;
        write_varuint(self.body, value.len() as u64);
        self.body.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.expect(FieldKind::Bytes)?;
        write_varuint(self.body, value.len() as u64);
        self.body.extend_from_slice(value);
        Ok(())
    }

    /// Writes a scalar sequence: `varUint count | count x element`.
    ///
    /// The wire is little-endian regardless of options: the zero-copy
    /// branch appends the elements' in-memory bytes in one piece and is
    /// therefore only taken on little-endian targets, where it produces
    /// the same bytes as the element-by-element path. Everywhere else the
    /// elements are encoded one at a time.
    pub fn put_seq<T: ScalarElem>(&mut self, values: &[T]) -> Result<()> {
        self.expect(FieldKind::ScalarSeq(T::KIND))?;
        write_varuint(self.body, values.len() as u64);
        if self.opts.unsafe_primitives && cfg!(target_endian = "little") {
            self.body.extend_from_slice(zerocopy::IntoBytes::as_bytes(values));
        } else {
            for &value in values {
                value.write_le(self.body);
            }
        }
        Ok(())
    }

    pub fn put_bool_seq(&mut self, values: &[bool]) -> Result<()> {
        self.expect(FieldKind::ScalarSeq(ScalarKind::Bool))?;
        write_varuint(self.body, values.len() as u64);
        self.body.extend(values.iter().map(|&v| u8::from(v)));
        Ok(())
    }

    pub fn put_str_seq<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        self.expect(FieldKind::StrSeq)?;
        write_varuint(self.body, values.len() as u64);
        for value in values {
            let s = value.as_ref();
            write_varuint(self.body, s.len() as u64);
            self.body.extend_from_slice(s.as_bytes());
        }
        Ok(())
    }

    pub fn put_bytes_seq<B: AsRef<[u8]>>(&mut self, values: &[B]) -> Result<()> {
        self.expect(FieldKind::BytesSeq)?;
        write_varuint(self.body, values.len() as u64);
        for value in values {
            let b = value.as_ref();
            write_varuint(self.body, b.len() as u64);
            self.body.extend_from_slice(b);
        }
        Ok(())
    }
}
