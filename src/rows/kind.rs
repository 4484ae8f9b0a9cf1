//! # Row Field Kinds
//!
//! The closed set of field kinds a row shape may declare, and the sealed
//! [`ScalarElem`] trait connecting Rust scalar types to their wire kind.
//!
//! ## Kind Categories
//!
//! | Category | Kinds | Body encoding |
//! |----------|-------|---------------|
//! | Fixed | `Scalar(_)` | raw little-endian bytes, no tag, no length |
//! | Variable | `Str`, `Bytes` | `varUint length \| bytes` |
//! | Variable | `ScalarSeq(_)` | `varUint count \| count x fixed element` |
//! | Variable | `StrSeq`, `BytesSeq` | `varUint count \| (varUint len \| bytes) x count` |
//!
//! `ScalarElem` is bounded by the zerocopy traits so scalar sequences can
//! be aliased directly over wire bytes on the zero-copy decode path; the
//! cast verifies length and alignment, so a misaligned buffer degrades to
//! the copying path instead of undefined behavior. `bool` is deliberately
//! not a `ScalarElem`: arbitrary buffer bytes are not valid `bool`s, so
//! bool sequences always copy.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::encoding::fixed::ScalarKind;
use crate::error::{Error, Result};

/// Declared kind of one row field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Str,
    Bytes,
    ScalarSeq(ScalarKind),
    StrSeq,
    BytesSeq,
}

impl FieldKind {
    /// Variable-length kinds get an entry in the record's offset table.
    pub const fn is_variable(self) -> bool {
        !matches!(self, FieldKind::Scalar(_))
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width scalar element type: knows its wire kind and its
/// little-endian codec, and is safe to view directly over wire bytes.
pub trait ScalarElem:
    sealed::Sealed + Copy + FromBytes + IntoBytes + Immutable + KnownLayout + 'static
{
    const KIND: ScalarKind;

    fn read_le(bytes: &[u8]) -> Result<Self>;
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! scalar_elem {
    ($ty:ty, $kind:expr, $width:expr) => {
        impl sealed::Sealed for $ty {}

        impl ScalarElem for $ty {
            const KIND: ScalarKind = $kind;

            #[inline]
            fn read_le(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; $width] = bytes.try_into().map_err(|_| Error::ShortBuffer {
                    needed: $width,
                    available: bytes.len(),
                })?;
                Ok(<$ty>::from_le_bytes(arr))
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

scalar_elem!(i8, ScalarKind::I8, 1);
scalar_elem!(u8, ScalarKind::U8, 1);
scalar_elem!(i16, ScalarKind::I16, 2);
scalar_elem!(u16, ScalarKind::U16, 2);
scalar_elem!(i32, ScalarKind::I32, 4);
scalar_elem!(u32, ScalarKind::U32, 4);
scalar_elem!(i64, ScalarKind::I64, 8);
scalar_elem!(u64, ScalarKind::U64, 8);
scalar_elem!(f32, ScalarKind::F32, 4);
scalar_elem!(f64, ScalarKind::F64, 8);
