//! Tests for the row codec

use std::borrow::Cow;

use super::*;
use crate::encoding::fixed::ScalarKind;
use crate::error::Error;

#[derive(Debug, PartialEq)]
struct Telemetry<'a> {
    val: Vec<Cow<'a, str>>,
    modes: Cow<'a, [i8]>,
    integers: Cow<'a, [i16]>,
    float3: Cow<'a, [f32]>,
    float6: Cow<'a, [f64]>,
}

impl Default for Telemetry<'_> {
    fn default() -> Self {
        Self {
            val: Vec::new(),
            modes: Cow::Owned(Vec::new()),
            integers: Cow::Owned(Vec::new()),
            float3: Cow::Owned(Vec::new()),
            float6: Cow::Owned(Vec::new()),
        }
    }
}

impl<'b> RowShape<'b> for Telemetry<'b> {
    fn fields() -> &'static [FieldKind] {
        &[
            FieldKind::StrSeq,
            FieldKind::ScalarSeq(ScalarKind::I8),
            FieldKind::ScalarSeq(ScalarKind::I16),
            FieldKind::ScalarSeq(ScalarKind::F32),
            FieldKind::ScalarSeq(ScalarKind::F64),
        ]
    }

    fn write_fields(&self, w: &mut RowWriter<'_>) -> crate::Result<()> {
        w.put_str_seq(&self.val)?;
        w.put_seq(&self.modes)?;
        w.put_seq(&self.integers)?;
        w.put_seq(&self.float3)?;
        w.put_seq(&self.float6)
    }

    fn read_fields(&mut self, r: &mut RowReader<'b>) -> crate::Result<()> {
        self.val = r.read_str_seq()?;
        self.modes = r.read_seq()?;
        self.integers = r.read_seq()?;
        self.float3 = r.read_seq()?;
        self.float6 = r.read_seq()?;
        Ok(())
    }
}

fn sample_telemetry() -> Telemetry<'static> {
    Telemetry {
        val: vec![
            "azerty".into(),
            "hello".into(),
            "world".into(),
            "random".into(),
        ],
        modes: Cow::Owned(vec![12, 10, 13, 0]),
        integers: Cow::Owned(vec![100, 250, 300]),
        float3: Cow::Owned(vec![12.13, 16.23, 75.1]),
        float6: Cow::Owned(vec![100.5, 165.63, 153.5]),
    }
}

#[derive(Debug, Default, PartialEq)]
struct Sample {
    flag: bool,
    label: String,
    count: u32,
    blob: Vec<u8>,
    ratio: f64,
}

impl<'b> RowShape<'b> for Sample {
    fn fields() -> &'static [FieldKind] {
        &[
            FieldKind::Scalar(ScalarKind::Bool),
            FieldKind::Str,
            FieldKind::Scalar(ScalarKind::U32),
            FieldKind::Bytes,
            FieldKind::Scalar(ScalarKind::F64),
        ]
    }

    fn write_fields(&self, w: &mut RowWriter<'_>) -> crate::Result<()> {
        w.put_bool(self.flag)?;
        w.put_str(&self.label)?;
        w.put_scalar(self.count)?;
        w.put_bytes(&self.blob)?;
        w.put_scalar(self.ratio)
    }

    fn read_fields(&mut self, r: &mut RowReader<'b>) -> crate::Result<()> {
        self.flag = r.read_bool()?;
        self.label = r.read_str()?.into_owned();
        self.count = r.read_scalar()?;
        self.blob = r.read_bytes()?.into_owned();
        self.ratio = r.read_scalar()?;
        Ok(())
    }
}

fn sample_row() -> Sample {
    Sample {
        flag: true,
        label: "sensor-7".to_string(),
        count: 300,
        blob: vec![0xDE, 0xAD, 0xBE, 0xEF],
        ratio: 0.875,
    }
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn sample_round_trips() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();
    let dec = RowDecoder::new();
    let back: Sample = dec.decode(&bytes).unwrap();
    assert_eq!(back, row);
}

#[test]
fn mixed_sequences_round_trip() {
    let row = sample_telemetry();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();
    let dec = RowDecoder::new();
    let back: Telemetry<'_> = dec.decode(&bytes).unwrap();
    assert_eq!(back, row);
}

#[test]
fn safe_and_unsafe_encoders_produce_identical_bytes() {
    let row = sample_telemetry();
    let mut safe_enc = RowEncoder::new();
    let safe = safe_enc.encode(&row).unwrap().to_vec();
    let mut unsafe_enc = RowEncoder::with_options(RowOptions {
        unsafe_strings: true,
        unsafe_primitives: true,
        check_alignment: false,
    });
    let aliased = unsafe_enc.encode(&row).unwrap().to_vec();
    assert_eq!(safe, aliased);

    // Both decode back to the original through either decoder.
    let safe_dec = RowDecoder::new();
    let unsafe_dec = RowDecoder::with_options(RowOptions::aliasing());
    let a: Telemetry<'_> = safe_dec.decode(&safe).unwrap();
    let b: Telemetry<'_> = unsafe_dec.decode(&aliased).unwrap();
    assert_eq!(a, row);
    assert_eq!(b, row);
}

#[test]
fn fixed_field_after_variable_field_round_trips() {
    // `Sample` interleaves fixed and variable fields, so this exercises
    // the cursor hand-off between offset-table jumps and sequential reads.
    let row = Sample {
        label: "x".repeat(200),
        ..sample_row()
    };
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();
    let back: Sample = RowDecoder::new().decode(&bytes).unwrap();
    assert_eq!(back, row);
}

#[test]
fn encoder_buffer_is_reused_across_calls() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let first = enc.encode(&row).unwrap().to_vec();
    let second = enc.encode(&row).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Zero-copy behavior
// ---------------------------------------------------------------------------

#[test]
fn strings_alias_the_input_under_unsafe_strings() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();

    let dec = RowDecoder::with_options(RowOptions {
        unsafe_strings: true,
        ..RowOptions::default()
    });
    let mut out = Sample::default();
    // Read through the reader directly to observe the borrow.
    struct Probe<'a> {
        label: Cow<'a, str>,
    }
    impl Default for Probe<'_> {
        fn default() -> Self {
            Probe { label: Cow::Borrowed("") }
        }
    }
    impl<'b> RowShape<'b> for Probe<'b> {
        fn fields() -> &'static [FieldKind] {
            Sample::fields()
        }
        fn write_fields(&self, _w: &mut RowWriter<'_>) -> crate::Result<()> {
            unreachable!("probe is decode-only")
        }
        fn read_fields(&mut self, r: &mut RowReader<'b>) -> crate::Result<()> {
            r.read_bool()?;
            self.label = r.read_str()?;
            r.read_scalar::<u32>()?;
            r.read_bytes()?;
            r.read_scalar::<f64>()?;
            Ok(())
        }
    }
    let probe: Probe<'_> = dec.decode(&bytes).unwrap();
    assert!(matches!(probe.label, Cow::Borrowed(_)));
    let range = bytes.as_ptr() as usize..bytes.as_ptr() as usize + bytes.len();
    assert!(range.contains(&(probe.label.as_ptr() as usize)));

    // The safe decoder copies.
    RowDecoder::new().decode_into(&bytes, &mut out).unwrap();
    assert_eq!(out.label, row.label);
}

#[test]
fn misaligned_sequences_fall_back_to_copying() {
    let row = sample_telemetry();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();

    let dec = RowDecoder::with_options(RowOptions::aliasing());
    // Shift the buffer through every alignment class; values must survive
    // regardless of whether the cast or the copy path served them.
    for shift in 0..8usize {
        let mut shifted = vec![0u8; shift];
        shifted.extend_from_slice(&bytes);
        let back: Telemetry<'_> = dec.decode(&shifted[shift..]).unwrap();
        assert_eq!(back, row, "shift {shift}");
    }
}

#[test]
fn aliased_guard_carries_the_source_buffer() {
    let row = sample_telemetry();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();

    let dec = RowDecoder::with_options(RowOptions::aliasing());
    let guarded: Aliased<'_, Telemetry<'_>> = dec.decode_aliased(&bytes).unwrap();
    assert!(std::ptr::eq(guarded.source().as_ptr(), bytes.as_ptr()));
    assert_eq!(guarded.integers.as_ref(), &[100, 250, 300]);
    assert_eq!(guarded.into_inner(), row);
}

// ---------------------------------------------------------------------------
// Edge cases and errors
// ---------------------------------------------------------------------------

#[test]
fn zero_field_count_leaves_destination_unchanged() {
    let mut out = sample_row();
    let expected = sample_row();
    RowDecoder::new().decode_into(&[0u8], &mut out).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn field_count_mismatch_is_rejected() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let mut bytes = enc.encode(&row).unwrap().to_vec();
    bytes[0] = 3; // claim three fields against a five-field shape
    let mut out = Sample::default();
    assert!(matches!(
        RowDecoder::new().decode_into(&bytes, &mut out),
        Err(Error::BadHeader(_))
    ));
}

#[test]
fn truncated_input_is_rejected() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();
    let mut out = Sample::default();
    assert!(RowDecoder::new()
        .decode_into(&bytes[..bytes.len() / 2], &mut out)
        .is_err());
}

#[test]
fn corrupt_offset_table_is_rejected_not_panicking() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    let mut bytes = enc.encode(&row).unwrap().to_vec();
    // First offset byte follows the field count; point it far past the body.
    bytes[1] = 0x7F;
    let mut out = Sample::default();
    assert!(RowDecoder::new().decode_into(&bytes, &mut out).is_err());
}

#[test]
fn writer_rejects_shape_drift() {
    struct WrongKind;
    impl<'b> RowShape<'b> for WrongKind {
        fn fields() -> &'static [FieldKind] {
            &[FieldKind::Scalar(ScalarKind::U32)]
        }
        fn write_fields(&self, w: &mut RowWriter<'_>) -> crate::Result<()> {
            w.put_str("not a u32")
        }
        fn read_fields(&mut self, _r: &mut RowReader<'b>) -> crate::Result<()> {
            Ok(())
        }
    }

    struct TooFew;
    impl<'b> RowShape<'b> for TooFew {
        fn fields() -> &'static [FieldKind] {
            &[FieldKind::Str, FieldKind::Str]
        }
        fn write_fields(&self, w: &mut RowWriter<'_>) -> crate::Result<()> {
            w.put_str("only one")
        }
        fn read_fields(&mut self, _r: &mut RowReader<'b>) -> crate::Result<()> {
            Ok(())
        }
    }

    let mut enc = RowEncoder::new();
    assert!(matches!(
        enc.encode(&WrongKind),
        Err(Error::Unsupported(_))
    ));
    assert!(matches!(enc.encode(&TooFew), Err(Error::Unsupported(_))));
}

#[test]
fn invalid_utf8_in_string_field_is_rejected() {
    struct BadStr;
    impl<'b> RowShape<'b> for BadStr {
        fn fields() -> &'static [FieldKind] {
            &[FieldKind::Str]
        }
        fn write_fields(&self, _w: &mut RowWriter<'_>) -> crate::Result<()> {
            Ok(())
        }
        fn read_fields(&mut self, r: &mut RowReader<'b>) -> crate::Result<()> {
            r.read_str()?;
            Ok(())
        }
    }
    // N=1, one offset (0), body: len=2 followed by invalid UTF-8.
    let crafted = [1u8, 0, 2, 0xFF, 0xFE];
    let mut out = BadStr;
    assert_eq!(
        RowDecoder::new().decode_into(&crafted, &mut out),
        Err(Error::InvalidUtf8)
    );
}

// ---------------------------------------------------------------------------
// Dynamically-typed entry points
// ---------------------------------------------------------------------------

#[test]
fn encode_any_rejects_unregistered_values() {
    let mut enc = RowEncoder::new();
    let not_a_row = "abc";
    assert_eq!(enc.encode_any(&not_a_row), Err(Error::NotStruct));
}

#[test]
fn decode_any_rejects_unregistered_destinations() {
    let dec = RowDecoder::new();
    let mut not_a_row = String::new();
    assert_eq!(
        dec.decode_any(&[0u8], &mut not_a_row),
        Err(Error::NotStructPointer)
    );
}

#[test]
fn registered_types_round_trip_through_any() {
    let row = sample_row();
    let mut enc = RowEncoder::new();
    enc.register::<Sample>();
    let bytes = enc.encode_any(&row).unwrap().to_vec();

    let mut dec = RowDecoder::new();
    dec.register::<Sample>();
    let mut out = Sample::default();
    dec.decode_any(&bytes, &mut out).unwrap();
    assert_eq!(out, row);
}

// ---------------------------------------------------------------------------
// Bool sequences
// ---------------------------------------------------------------------------

#[test]
fn bool_sequences_round_trip_by_copy() {
    #[derive(Debug, Default, PartialEq)]
    struct Flags {
        bits: Vec<bool>,
    }
    impl<'b> RowShape<'b> for Flags {
        fn fields() -> &'static [FieldKind] {
            &[FieldKind::ScalarSeq(ScalarKind::Bool)]
        }
        fn write_fields(&self, w: &mut RowWriter<'_>) -> crate::Result<()> {
            w.put_bool_seq(&self.bits)
        }
        fn read_fields(&mut self, r: &mut RowReader<'b>) -> crate::Result<()> {
            self.bits = r.read_bool_seq()?;
            Ok(())
        }
    }

    let row = Flags {
        bits: vec![true, false, true, true, false],
    };
    let mut enc = RowEncoder::new();
    let bytes = enc.encode(&row).unwrap().to_vec();
    let back: Flags = RowDecoder::with_options(RowOptions::aliasing())
        .decode(&bytes)
        .unwrap();
    assert_eq!(back, row);
}
