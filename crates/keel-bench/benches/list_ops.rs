//! Criterion micro-benchmarks for the fixed-element list.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keel_heap::StaticListHolder;

const ELEMENT: [u8; 8] = [0xA5; 8];

/// Benchmark: Append 10K 8-byte elements with the default granularity.
fn bench_add_10k(c: &mut Criterion) {
    c.bench_function("list_add_10k", |b| {
        b.iter(|| {
            let mut list = StaticListHolder::new(8, 64).unwrap();
            for _ in 0..10_000 {
                black_box(list.add(&ELEMENT));
            }
            list
        });
    });
}

/// Benchmark: Insert 1K elements at the front, shifting everything behind.
fn bench_insert_front_1k(c: &mut Criterion) {
    c.bench_function("list_insert_front_1k", |b| {
        b.iter(|| {
            let mut list = StaticListHolder::new(8, 64).unwrap();
            for _ in 0..1_000 {
                black_box(list.insert(0, &ELEMENT));
            }
            list
        });
    });
}

/// Benchmark: Linear search for the last of 10K distinct elements.
fn bench_find_10k(c: &mut Criterion) {
    let mut list = StaticListHolder::new(8, 256).unwrap();
    for v in 0..10_000u64 {
        list.add(&v.to_le_bytes());
    }
    let needle = 9_999u64.to_le_bytes();

    c.bench_function("list_find_10k", |b| {
        b.iter(|| black_box(list.find(black_box(&needle))));
    });
}

criterion_group!(benches, bench_add_10k, bench_insert_front_1k, bench_find_10k);
criterion_main!(benches);
