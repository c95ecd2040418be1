//! Pool hot-path benchmarks
//!
//! Compares the tiered pool's acquire/release cycle against the system
//! allocator across the configured block sizes.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use reserve_pool::{AllocContext, PoolConfig, TieredPool};
use std::alloc::Layout;
use std::hint::black_box;

const SIZES: &[usize] = &[8 * 1024, 32 * 1024, 128 * 1024];

/// Benchmark a single acquire/release cycle per tier
fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");
    let pools = TieredPool::new(PoolConfig::default()).unwrap();

    for &size in SIZES {
        group.bench_with_input(BenchmarkId::new("pool", size), &size, |b, &size| {
            b.iter(|| {
                let block = pools.acquire(size).unwrap();
                black_box(block.as_ptr());
            });
        });

        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &size| {
            let layout = Layout::from_size_align(size, 64).unwrap();
            b.iter(|| unsafe {
                let ptr = std::alloc::alloc(layout);
                std::alloc::dealloc(ptr, layout);
                black_box(ptr);
            });
        });
    }

    group.finish();
}

/// Benchmark the atomic-context path (no blocking permitted downstream)
fn bench_atomic_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic_context");
    group.throughput(Throughput::Elements(1));

    let pools = TieredPool::new(PoolConfig::default()).unwrap();
    group.bench_function("acquire_16k", |b| {
        b.iter(|| {
            let block = pools.acquire_in(16 * 1024, AllocContext::Atomic).unwrap();
            black_box(block.size());
        });
    });

    group.finish();
}

/// Benchmark the pointer-scan release path against the handle path
fn bench_release_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_strategies");
    let pools = TieredPool::new(PoolConfig::default()).unwrap();

    group.bench_function("by_handle", |b| {
        b.iter(|| {
            let block = pools.acquire(8 * 1024).unwrap();
            black_box(pools.release(block));
        });
    });

    group.bench_function("by_pointer_scan", |b| {
        b.iter(|| {
            let ptr = pools.acquire(8 * 1024).unwrap().detach();
            black_box(pools.release_ptr(ptr));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_atomic_context,
    bench_release_strategies
);
criterion_main!(benches);
