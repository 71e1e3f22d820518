use criterion::{black_box, criterion_group, criterion_main, Criterion};
use decision_core::cache::{DecisionCache, Fingerprinter, InMemoryCacheStore};
use decision_core::{Decision, DecisionMetrics, DecisionServiceConfig, RequestContext};
use std::sync::Arc;

fn context() -> RequestContext {
    RequestContext::new("BTC")
        .expect("valid symbol")
        .field("price", 101.25)
        .field("volume", 12_000i64)
        .field("momentum", 0.3)
}

fn benchmark_fingerprint(c: &mut Criterion) {
    let fingerprinter = Fingerprinter::new(vec!["price".to_string(), "volume".to_string()]);
    let context = context();
    c.bench_function("fingerprint", |b| {
        b.iter(|| fingerprinter.fingerprint(black_box(&context)))
    });
}

fn benchmark_cache_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let config = DecisionServiceConfig::default();
    let cache = DecisionCache::new(
        Arc::new(InMemoryCacheStore::new()),
        Arc::new(DecisionMetrics::default()),
        &config,
    )
    .expect("valid config");
    let context = context();
    let decision = Decision::new("BUY", 0.8, "benchmark");

    c.bench_function("cache_set", |b| {
        b.iter(|| runtime.block_on(cache.set(black_box(&context), black_box(&decision))))
    });
    c.bench_function("cache_get_hit", |b| {
        b.iter(|| runtime.block_on(cache.get(black_box(&context))))
    });
}

criterion_group!(benches, benchmark_fingerprint, benchmark_cache_round_trip);
criterion_main!(benches);
