//! # Row Codec
//!
//! Serializes a structural record (an ordered set of typed fields) into a
//! compact, partially-decodable body:
//!
//! ```text
//! +-----------+---------------------------+----------------------------+
//! | varUint N | varUint x var-field-count | body                       |
//! | (fields)  | (offsets into body)       | (fields in decl. order)    |
//! +-----------+---------------------------+----------------------------+
//! ```
//!
//! Row types describe their shape by implementing [`RowShape`]: a static
//! field-kind list plus a writer visit and a reader visit, both in
//! declaration order. The derived plan (field count, variable count, fixed
//! size) is cached per shape and shared across calls; see
//! [`plan`](crate::rows::plan) for the cache discipline.
//!
//! ## Example
//!
//! ```
//! use dbflat::rows::{RowDecoder, RowEncoder, RowReader, RowShape, RowWriter};
//! use dbflat::rows::kind::FieldKind;
//! use dbflat::encoding::fixed::ScalarKind;
//! use dbflat::Result;
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Event {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl<'b> RowShape<'b> for Event {
//!     fn fields() -> &'static [FieldKind] {
//!         &[FieldKind::Scalar(ScalarKind::U32), FieldKind::Str]
//!     }
//!
//!     fn write_fields(&self, w: &mut RowWriter<'_>) -> Result<()> {
//!         w.put_scalar(self.id)?;
//!         w.put_str(&self.name)
//!     }
//!
//!     fn read_fields(&mut self, r: &mut RowReader<'b>) -> Result<()> {
//!         self.id = r.read_scalar()?;
//!         self.name = r.read_str()?.into_owned();
//!         Ok(())
//!     }
//! }
//!
//! let mut enc = RowEncoder::new();
//! let bytes = enc.encode(&Event { id: 7, name: "boot".into() })?.to_vec();
//! let dec = RowDecoder::new();
//! let event: Event = dec.decode(&bytes)?;
//! assert_eq!(event, Event { id: 7, name: "boot".into() });
//! # Ok::<(), dbflat::Error>(())
//! ```
//!
//! ## Zero-Copy Options
//!
//! [`RowOptions`] selects the aliasing behavior of the decode path; the
//! encode output is byte-identical across all option combinations. The
//! [`Aliased`] guard pairs a decoded value with the borrow of its source
//! buffer so the aliasing lifetime contract is visible in signatures.

pub mod decoder;
pub mod encoder;
pub mod kind;
pub mod plan;

#[cfg(test)]
mod tests;

use crate::error::Result;

pub use decoder::{RowDecoder, RowReader};
pub use encoder::{RowEncoder, RowWriter};
pub use kind::{FieldKind, ScalarElem};
pub use plan::{FieldInfo, RowPlan};

/// Zero-copy policy for the row decode path.
///
/// - `unsafe_strings`: decoded strings alias the input buffer.
/// - `unsafe_primitives`: decoded byte arrays and scalar sequences alias
///   the input buffer when the bytes are properly aligned.
/// - `check_alignment`: verify base-address alignment before attempting an
///   aliasing cast; misalignment silently falls back to copying.
///
/// Options never change the wire format, only who owns the decoded bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOptions {
    pub unsafe_strings: bool,
    pub unsafe_primitives: bool,
    pub check_alignment: bool,
}

impl RowOptions {
    /// All aliasing enabled, with alignment checks.
    pub const fn aliasing() -> Self {
        Self {
            unsafe_strings: true,
            unsafe_primitives: true,
            check_alignment: true,
        }
    }
}

/// A structural record the row codec can encode and decode.
///
/// `fields()` declares the shape; `write_fields` and `read_fields` visit
/// the fields in declaration order against a validating writer/reader.
/// `'b` is the lifetime of the decode input buffer, which borrowed fields
/// of the row (e.g. `Cow` values) may alias.
pub trait RowShape<'b> {
    fn fields() -> &'static [FieldKind];

    fn write_fields(&self, w: &mut RowWriter<'_>) -> Result<()>;

    fn read_fields(&mut self, r: &mut RowReader<'b>) -> Result<()>;
}

/// Pairs a decoded row with the source buffer its aliased views borrow
/// from, making the retention contract explicit: the row cannot outlive
/// the buffer, and the buffer is reachable through the guard for callers
/// that need to hold both together.
#[derive(Debug)]
pub struct Aliased<'buf, T> {
    value: T,
    source: &'buf [u8],
}

impl<'buf, T> Aliased<'buf, T> {
    pub(crate) fn new(value: T, source: &'buf [u8]) -> Self {
        Self { value, source }
    }

    /// The buffer the decoded value may borrow from.
    pub fn source(&self) -> &'buf [u8] {
        self.source
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> std::ops::Deref for Aliased<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
