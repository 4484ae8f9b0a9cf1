//! # Typed Payload Helpers
//!
//! Conveniences for building and reading record field payloads from typed
//! values, so callers do not hand-roll little-endian conversions:
//!
//! - [`scalar_payload`] encodes a scalar as its wire bytes
//! - [`scalar_field`] additionally embeds the width-class hint into the
//!   compFlags word, producing a self-delimiting fixed field
//! - [`read_scalar`] / [`read_str`] interpret decoded payload bytes
//!
//! These helpers are pure conversions; they never touch the record layout.

use crate::encoding::fixed::ScalarKind;
use crate::error::{Error, Result};
use crate::records::types::{with_width_hint, FieldValue};
use crate::rows::kind::ScalarElem;

/// Encodes a scalar value as its little-endian payload bytes.
pub fn scalar_payload<T: ScalarElem>(value: T) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::KIND.width());
    value.write_le(&mut out);
    out
}

/// Builds a fixed-width field over a caller-owned payload buffer: writes
/// the value into `scratch` and returns a [`FieldValue`] whose compFlags
/// embed the width class, so decoders can delimit it without out-of-band
/// knowledge.
pub fn scalar_field<T: ScalarElem>(tag: u16, value: T, scratch: &mut Vec<u8>) -> FieldValue<'_> {
    scratch.clear();
    value.write_le(scratch);
    FieldValue::new(tag, with_width_hint(0, T::KIND), scratch)
}

/// Reads a scalar back out of a decoded payload. The payload must be
/// exactly the scalar's width.
pub fn read_scalar<T: ScalarElem>(payload: &[u8]) -> Result<T> {
    if payload.len() != T::KIND.width() {
        return Err(Error::ShortBuffer {
            needed: T::KIND.width(),
            available: payload.len(),
        });
    }
    T::read_le(payload)
}

/// Reads a boolean payload (one byte, nonzero = true).
pub fn read_bool(payload: &[u8]) -> Result<bool> {
    if payload.len() != ScalarKind::Bool.width() {
        return Err(Error::ShortBuffer {
            needed: 1,
            available: payload.len(),
        });
    }
    Ok(payload[0] != 0)
}

/// Interprets a decoded payload as UTF-8 text.
pub fn read_str(payload: &[u8]) -> Result<&str> {
    std::str::from_utf8(payload).map_err(|_| Error::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{decode_record, RecordEncoder};

    #[test]
    fn scalar_payloads_are_little_endian() {
        assert_eq!(scalar_payload(300u32), 300u32.to_le_bytes());
        assert_eq!(scalar_payload(-2i16), (-2i16).to_le_bytes());
        assert_eq!(scalar_payload(1.5f64), 1.5f64.to_le_bytes());
    }

    #[test]
    fn scalar_round_trips_through_payload_bytes() {
        let bytes = scalar_payload(0xDEAD_BEEFu32);
        assert_eq!(read_scalar::<u32>(&bytes).unwrap(), 0xDEAD_BEEF);
        assert!(read_scalar::<u64>(&bytes).is_err());
    }

    #[test]
    fn hinted_scalar_field_round_trips_through_a_record() {
        let mut scratch = Vec::new();
        let field = scalar_field(192, 300u32, &mut scratch);
        let fields = [field];
        let mut enc = RecordEncoder::new();
        let raw = enc.encode_full(1, &[], &fields).unwrap();

        let decoded = decode_record(raw).unwrap();
        assert_eq!(read_scalar::<u32>(&decoded[&192]).unwrap(), 300);
    }

    #[test]
    fn bool_and_str_payload_readers() {
        assert!(read_bool(&[1]).unwrap());
        assert!(!read_bool(&[0]).unwrap());
        assert!(read_bool(&[]).is_err());

        assert_eq!(read_str(b"hello").unwrap(), "hello");
        assert_eq!(read_str(&[0xFF]), Err(Error::InvalidUtf8));
    }
}
