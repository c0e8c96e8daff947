//! Criterion micro-benchmarks for byte and typed arena push/pop.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hit_mem::{Arena, FastTypedArena, MemoryUsage, TypedArena};

/// Push 4K 64-byte records, then pop them all, on a warm arena.
fn bench_arena_push_pop(c: &mut Criterion) {
    let mut arena = Arena::with_capacity(4096 * 64, MemoryUsage::Any).unwrap();
    c.bench_function("arena_push_pop_4k", |b| {
        b.iter(|| {
            for _ in 0..4096 {
                black_box(arena.push_memory(64));
            }
            arena.pop_memory(4096 * 64);
        });
    });
}

/// Grow a byte arena from 1 byte to 1MB through power-of-two growth.
fn bench_arena_growth(c: &mut Criterion) {
    c.bench_function("arena_growth_1mb", |b| {
        b.iter(|| {
            let mut arena = Arena::with_capacity(1, MemoryUsage::Any).unwrap();
            for _ in 0..1024 {
                arena.push_memory(1024);
            }
            black_box(arena.capacity());
        });
    });
}

/// Push 10K owned strings into a constructing arena, growing from 16.
fn bench_typed_push_strings(c: &mut Criterion) {
    c.bench_function("typed_push_string_10k", |b| {
        b.iter(|| {
            let mut arena: TypedArena<String> =
                TypedArena::with_capacity(16, MemoryUsage::Any).unwrap();
            for i in 0..10_000 {
                arena.push_back(i.to_string());
            }
            black_box(arena.len());
        });
    });
}

/// Bulk-append 64K floats to a fast arena and clear it.
fn bench_fast_push_array(c: &mut Criterion) {
    let mut arena: FastTypedArena<f32> =
        FastTypedArena::with_capacity(65_536, MemoryUsage::Buffer).unwrap();
    c.bench_function("fast_push_array_64k", |b| {
        b.iter(|| {
            arena.push_array(65_536).fill(1.0);
            black_box(arena.as_bytes().len());
            arena.clear();
        });
    });
}

criterion_group!(
    benches,
    bench_arena_push_pop,
    bench_arena_growth,
    bench_typed_push_strings,
    bench_fast_push_array
);
criterion_main!(benches);
