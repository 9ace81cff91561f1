//! Benchmarks for the access layer hot paths
//!
//! This benchmark measures:
//! - Cache hits and misses through CacheManager
//! - Inserts into a full cache (eviction path)
//! - Cache key derivation
//! - Limiter admission when the window has room

use ai_notes_rust::cache::{CacheConfig, CacheKey, CacheKeyGenerator, CacheManager};
use ai_notes_rust::{RateLimiter, RateLimiterConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn bench_cache_get(c: &mut Criterion) {
    let rt = runtime();
    let cache = CacheManager::in_memory(CacheConfig::notes());
    let hit = CacheKey::new("get_note:n_1");
    let miss = CacheKey::new("get_note:n_missing");
    rt.block_on(async {
        cache
            .set(&hit, &json!({"id": "n_1", "title": "Standup", "markdown": "- item"}))
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("cache_get");
    group.throughput(Throughput::Elements(1));
    group.bench_function("hit", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.get::<serde_json::Value>(&hit).await) })
    });
    group.bench_function("miss", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cache.get::<serde_json::Value>(&miss).await) })
    });
    group.finish();
}

fn bench_cache_set_at_capacity(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cache_set_full");

    for capacity in [50usize, 100, 1000] {
        let cache = CacheManager::in_memory(
            CacheConfig::notes()
                .with_capacity(capacity)
                .with_ttl(Duration::from_secs(300)),
        );
        rt.block_on(async {
            for i in 0..capacity {
                cache.set(&CacheKey::new(format!("k{}", i)), &i).await.unwrap();
            }
        });

        let mut n = 0u64;
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.to_async(&rt).iter(|| {
                n += 1;
                let key = CacheKey::new(format!("new{}", n));
                let cache = &cache;
                async move { cache.set(&key, &n).await.unwrap() }
            })
        });
    }
    group.finish();
}

fn bench_key_generation(c: &mut Criterion) {
    let keys = CacheKeyGenerator::new();
    let payload = json!({"query": "weekly sync", "hits_per_page": 10});
    c.bench_function("cache_key_generate", |b| {
        b.iter(|| black_box(keys.generate("search_notes", black_box(&payload))))
    });
}

fn bench_limiter_admission(c: &mut Criterion) {
    let rt = runtime();
    let limiter = RateLimiter::new(RateLimiterConfig::new(0, Duration::from_secs(60)));
    c.bench_function("limiter_try_acquire_unlimited", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(limiter.try_acquire().await) })
    });
}

criterion_group!(
    benches,
    bench_cache_get,
    bench_cache_set_at_capacity,
    bench_key_generation,
    bench_limiter_admission
);
criterion_main!(benches);
