//! Encoding benchmarks for dbflat
//!
//! These benchmarks track the hot paths: varint codec throughput, record
//! encoding under each storage strategy, O(1) hot-field reads, and full
//! materialization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box as hint_black_box;

use dbflat::encoding::varint::{read_varuint, write_varuint};
use dbflat::records::{decode_record_into, read_hot, DecodedRecord, FieldValue, RecordEncoder};

fn bench_varint_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint_encode");

    let test_values: Vec<(u64, &str)> = vec![
        (0, "zero"),
        (127, "1_byte_max"),
        (16383, "2_byte_max"),
        (2097151, "3_byte_max"),
        (268435455, "4_byte_max"),
        (u64::MAX, "max_u64"),
    ];

    for (value, name) in test_values {
        group.bench_with_input(BenchmarkId::new("encode", name), &value, |b, &value| {
            let mut buf = Vec::with_capacity(10);
            b.iter(|| {
                buf.clear();
                let len = write_varuint(&mut buf, black_box(value));
                hint_black_box(len)
            });
        });
    }

    group.finish();
}

fn bench_varint_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint_decode");

    let test_values: Vec<(u64, &str)> = vec![
        (0, "zero"),
        (127, "1_byte_max"),
        (16383, "2_byte_max"),
        (u64::MAX, "max_u64"),
    ];

    for (value, name) in test_values {
        let mut buf = Vec::new();
        write_varuint(&mut buf, value);

        group.bench_with_input(BenchmarkId::new("decode", name), &buf, |b, data| {
            b.iter(|| {
                let result = read_varuint(black_box(data));
                hint_black_box(result)
            });
        });
    }

    group.finish();
}

fn skinny_fields() -> Vec<(u16, u16, Vec<u8>)> {
    vec![
        (1, 0x8000, b"Hello I'm Test 1".to_vec()),
        (2, 0x8000, b"Hello I'm Test 2".to_vec()),
        (3, 0x8000, b"Hello I'm Test Comp+10".to_vec()),
        (192, 0x0000, 300u32.to_le_bytes().to_vec()),
    ]
}

fn bench_record_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encode");
    let owned = skinny_fields();
    let mut fields: Vec<FieldValue<'_>> = owned
        .iter()
        .map(|(tag, cf, p)| FieldValue::new(*tag, *cf, p))
        .collect();
    fields.sort_by_key(|f| f.tag);

    group.bench_function("full_sorted", |b| {
        let mut enc = RecordEncoder::new();
        b.iter(|| {
            let out = enc.encode_full(112, &[1, 2, 3], black_box(&fields)).unwrap();
            hint_black_box(out.len())
        });
    });

    group.bench_function("hot_sorted", |b| {
        let mut enc = RecordEncoder::new();
        b.iter(|| {
            let out = enc.encode_hot(112, &[1, 2, 3], black_box(&fields)).unwrap();
            hint_black_box(out.len())
        });
    });

    group.bench_function("tag_walk_sorted", |b| {
        let mut enc = RecordEncoder::new();
        b.iter(|| {
            let out = enc.encode_tag_walk(black_box(&fields)).unwrap();
            hint_black_box(out.len())
        });
    });

    let mut shuffled = fields.clone();
    shuffled.reverse();
    group.bench_function("full_unsorted", |b| {
        let mut enc = RecordEncoder::new();
        b.iter(|| {
            let out = enc.encode_full(112, &[1, 2, 3], black_box(&shuffled)).unwrap();
            hint_black_box(out.len())
        });
    });

    group.finish();
}

fn bench_record_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_decode");
    let owned = skinny_fields();
    let fields: Vec<FieldValue<'_>> = owned
        .iter()
        .map(|(tag, cf, p)| FieldValue::new(*tag, *cf, p))
        .collect();

    let mut enc = RecordEncoder::new();
    let raw = enc.encode_full(112, &[1, 2, 3], &fields).unwrap().to_vec();

    group.bench_function("read_hot", |b| {
        b.iter(|| {
            let payload = read_hot(black_box(&raw), 3, None).unwrap();
            hint_black_box(payload.len())
        });
    });

    group.bench_function("full_materialization", |b| {
        let mut out = DecodedRecord::new();
        b.iter(|| {
            decode_record_into(black_box(&raw), &mut out).unwrap();
            hint_black_box(out.len())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_varint_encode,
    bench_varint_decode,
    bench_record_encode,
    bench_record_decode
);
criterion_main!(benches);
