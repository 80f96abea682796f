//! Benchmarks for mysql-client row access and configuration parsing.

#![allow(missing_docs, clippy::unwrap_used)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mysql_client::{BufferedRows, Column, Config, Row, RowSource};
use mysql_protocol::{ColumnDefinition, ColumnFlags, ColumnType, RawRow};

fn bench_connection_string_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection_string");

    let simple = "Server=localhost;Database=test;User=app;Password=secret;";
    group.throughput(Throughput::Bytes(simple.len() as u64));
    group.bench_function("simple", |b| {
        b.iter(|| black_box(Config::from_connection_string(black_box(simple))))
    });

    let full = "Server=db1.internal:3307;Database=shop;User=app;Password=secret;\
                CharacterEncoding=latin1;ConnectTimeout=5;CommandTimeout=30;Liveness=select1";
    group.throughput(Throughput::Bytes(full.len() as u64));
    group.bench_function("full", |b| {
        b.iter(|| black_box(Config::from_connection_string(black_box(full))))
    });

    group.finish();
}

fn columns() -> Arc<[Column]> {
    vec![
        Column::new(
            0,
            ColumnDefinition::new("id", ColumnType::LongLong).with_flags(ColumnFlags::UNSIGNED),
        ),
        Column::new(
            1,
            ColumnDefinition::new("email", ColumnType::VarString).with_collation(45),
        ),
        Column::new(2, ColumnDefinition::new("balance", ColumnType::Double)),
    ]
    .into()
}

fn make_row(columns: &Arc<[Column]>, id: usize) -> Row {
    let id = id.to_string();
    let payload = RawRow::encode([
        Some(id.as_bytes()),
        Some(&b"alice@example.com"[..]),
        Some(&b"1024.5"[..]),
    ]);
    Row::new(RawRow::decode(payload, 3).unwrap(), Arc::clone(columns))
}

fn bench_row_access(c: &mut Criterion) {
    let columns = columns();
    let row = make_row(&columns, 42);

    let mut group = c.benchmark_group("row_access");
    group.bench_function("get_u64", |b| {
        b.iter(|| black_box(row.get::<u64>(black_box(0)).unwrap()))
    });
    group.bench_function("get_string", |b| {
        b.iter(|| black_box(row.get::<String>(black_box(1)).unwrap()))
    });
    group.bench_function("get_by_name", |b| {
        b.iter(|| black_box(row.get_by_name::<f64>(black_box("balance")).unwrap()))
    });
    group.finish();
}

fn bench_buffered_traversal(c: &mut Criterion) {
    let columns = columns();
    let rows: Vec<Row> = (0..1000).map(|i| make_row(&columns, i)).collect();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("buffered_rows");
    group.throughput(Throughput::Elements(rows.len() as u64));
    group.bench_function("forward_1000", |b| {
        b.iter(|| {
            let mut source = BufferedRows::new(Arc::clone(&columns), rows.clone());
            runtime.block_on(async {
                let mut total = 0u64;
                while source.has_next().await.unwrap() {
                    total += source.next().await.unwrap().get::<u64>(0).unwrap();
                }
                black_box(total)
            })
        })
    });
    group.bench_function("random_access", |b| {
        let mut source = BufferedRows::new(Arc::clone(&columns), rows.clone());
        b.iter(|| black_box(source.get(black_box(731)).unwrap().len()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_connection_string_parsing,
    bench_row_access,
    bench_buffered_traversal,
);
criterion_main!(benches);
