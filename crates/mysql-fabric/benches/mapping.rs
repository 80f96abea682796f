//! Benchmarks for shard key resolution.

#![allow(missing_docs, clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use mysql_fabric::{MappingKind, ShardMapping, hash_key};

fn range_mapping(shards: u32) -> ShardMapping {
    let mut mapping = ShardMapping::new(1, MappingKind::Range, "global");
    for i in 0..shards {
        mapping
            .add_shard(&(i * 10_000).to_string(), format!("shard-{i}"))
            .unwrap();
    }
    mapping
}

fn hash_mapping(shards: u64) -> ShardMapping {
    let mut mapping = ShardMapping::new(2, MappingKind::Hash, "global");
    let step = u64::MAX / shards;
    for i in 0..shards {
        mapping
            .add_shard(&format!("{:x}", i * step), format!("shard-{i}"))
            .unwrap();
    }
    mapping
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("shard_lookup");

    let range = range_mapping(256);
    group.bench_function("range_256", |b| {
        b.iter(|| black_box(range.group_for(black_box("1234567")).unwrap()))
    });

    let hash = hash_mapping(256);
    group.bench_function("hash_256", |b| {
        b.iter(|| black_box(hash.group_for(black_box("customer-1234567")).unwrap()))
    });

    group.bench_function("hash_key", |b| {
        b.iter(|| black_box(hash_key(black_box("customer-1234567"))))
    });

    group.finish();
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
