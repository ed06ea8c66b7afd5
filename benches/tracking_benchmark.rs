//! Performance benchmarks for cache-stats
//!
//! This benchmark suite measures the overhead of the tracking proxy:
//! - Raw InMemory backend operations vs the same calls through the proxy
//! - Bulk reads across batch sizes
//! - Snapshot rendering as the table grows
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use cache_stats::backend::{CacheBackend, InMemoryBackend};
use cache_stats::StatsTrackingCache;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

// ============================================================================
// Group 1: Proxy Overhead
// ============================================================================

fn proxy_overhead_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("proxy_overhead");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [100, 1_000, 10_000].iter() {
        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("raw_get_hit", size), size, |b, &size| {
                let backend = InMemoryBackend::new();
                rt.block_on(async {
                    backend
                        .set("bench_key", vec![1u8; size], None)
                        .await
                        .expect("Failed to set");
                });

                b.to_async(&rt)
                    .iter(|| async { backend.get(black_box("bench_key")).await });
            });

        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("tracked_read_hit", size), size, |b, &size| {
                let cache = StatsTrackingCache::new(InMemoryBackend::new());
                rt.block_on(async {
                    cache
                        .write("bench_key", vec![1u8; size], None)
                        .await
                        .expect("Failed to write");
                });

                b.to_async(&rt)
                    .iter(|| async { cache.read(black_box("bench_key")).await });
            });

        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("tracked_write", size), size, |b, &size| {
                let cache = StatsTrackingCache::new(InMemoryBackend::new());
                let value = vec![1u8; size];

                b.to_async(&rt).iter(|| async {
                    cache
                        .write(black_box("bench_key"), black_box(value.clone()), None)
                        .await
                        .expect("Failed to write")
                });
            });
    }

    group.bench_function("raw_get_miss", |b| {
        let backend = InMemoryBackend::new();

        b.to_async(&rt)
            .iter(|| async { backend.get(black_box("nonexistent_key")).await });
    });

    group.bench_function("tracked_read_miss", |b| {
        let cache = StatsTrackingCache::new(InMemoryBackend::new());

        b.to_async(&rt)
            .iter(|| async { cache.read(black_box("nonexistent_key")).await });
    });

    group.finish();
}

// ============================================================================
// Group 2: Bulk Reads
// ============================================================================

fn bulk_read_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_read");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for batch in [4, 32, 256].iter() {
        group
            .throughput(Throughput::Elements(*batch as u64))
            .bench_with_input(BenchmarkId::new("read_many", batch), batch, |b, &batch| {
                let cache = StatsTrackingCache::new(InMemoryBackend::new());
                let names: Vec<String> = (0..batch).map(|i| format!("key:{}", i)).collect();
                let keys: Vec<&str> = names.iter().map(String::as_str).collect();

                // Half of the batch hits, half misses
                rt.block_on(async {
                    for key in keys.iter().step_by(2) {
                        cache
                            .write(key, vec![0u8; 256], None)
                            .await
                            .expect("Failed to write");
                    }
                });

                b.to_async(&rt)
                    .iter(|| async { cache.read_many(black_box(&keys)).await });
            });
    }

    group.finish();
}

// ============================================================================
// Group 3: Snapshot Rendering
// ============================================================================

fn snapshot_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for entries in [10, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("snapshot", entries),
            entries,
            |b, &entries| {
                let cache = StatsTrackingCache::new(InMemoryBackend::new());
                rt.block_on(async {
                    for i in 0..entries {
                        cache
                            .read(&format!("key:{}", i))
                            .await
                            .expect("Failed to read");
                    }
                });

                b.iter(|| black_box(cache.snapshot()));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(
    benches,
    proxy_overhead_benchmarks,
    bulk_read_benchmarks,
    snapshot_benchmarks
);
criterion_main!(benches);
