//! Benchmarks for text-protocol value decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mysql_protocol::{ColumnDefinition, ColumnType};
use mysql_types::{FromSql, decode_text};
use std::hint::black_box;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_text");

    let int = ColumnDefinition::new("id", ColumnType::LongLong);
    group.bench_function("bigint", |b| {
        b.iter(|| decode_text(black_box(Some(&b"9223372036854775807"[..])), &int).unwrap())
    });

    let double = ColumnDefinition::new("price", ColumnType::Double);
    group.bench_function("double", |b| {
        b.iter(|| decode_text(black_box(Some(&b"12345.678"[..])), &double).unwrap())
    });

    let utf8 = ColumnDefinition::new("name", ColumnType::VarString).with_collation(45);
    let text = "This is a typical database column value with some content";
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("varchar_utf8", |b| {
        b.iter(|| decode_text(black_box(Some(text.as_bytes())), &utf8).unwrap())
    });

    let latin1 = ColumnDefinition::new("name", ColumnType::VarString).with_collation(8);
    group.bench_function("varchar_latin1", |b| {
        b.iter(|| decode_text(black_box(Some(text.as_bytes())), &latin1).unwrap())
    });

    let datetime = ColumnDefinition::new("created", ColumnType::DateTime);
    group.bench_function("datetime", |b| {
        b.iter(|| decode_text(black_box(Some(&b"2024-06-01 12:30:45.123456"[..])), &datetime).unwrap())
    });

    group.finish();
}

fn bench_from_sql(c: &mut Criterion) {
    let column = ColumnDefinition::new("n", ColumnType::Long);
    let value = decode_text(Some(b"42"), &column).unwrap();

    c.bench_function("from_sql_i32", |b| {
        b.iter(|| i32::from_sql(black_box(&value)).unwrap())
    });
    c.bench_function("from_sql_option_i64", |b| {
        b.iter(|| Option::<i64>::from_sql(black_box(&value)).unwrap())
    });
}

criterion_group!(benches, bench_decode, bench_from_sql);
criterion_main!(benches);
