//! Resilience Pattern Benchmarks
//!
//! Benchmarks for bulkhead admission, retry backoff, and fallback execution.

use bulwark::prelude::*;
use bulwark::{RetryPolicy, TimeoutPolicy};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

// =============================================================================
// Bulkhead Benchmarks
// =============================================================================

fn bench_bulkhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulkhead");
    let runtime = runtime();

    group.bench_function("create", |b| {
        b.iter(|| Bulkhead::new("bench", BulkheadConfig::default().logging(false)))
    });

    let bulkhead = Bulkhead::new("bench", BulkheadConfig::default().logging(false)).unwrap();
    group.bench_function("stats", |b| b.iter(|| black_box(bulkhead.get_stats())));

    for concurrency in [10u32, 50, 100] {
        let bulkhead = Bulkhead::new("bench", BulkheadConfig::default().logging(false)).unwrap();
        bulkhead
            .create_pool("svc", concurrency, 0, Duration::from_secs(5))
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("execute_success", concurrency),
            &concurrency,
            |b, _| {
                b.to_async(&runtime).iter(|| async {
                    let request = BulkheadRequest::new("svc", "noop", Value::Null);
                    let response = bulkhead
                        .execute(&RequestContext::new(), request, |_ctx, req| async move {
                            Ok::<_, BoxError>(BulkheadResponse::success(req.id, json!(42)))
                        })
                        .await;
                    black_box(response)
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// Retry / Timeout Benchmarks
// =============================================================================

fn bench_retry(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry");

    let backoff = BackoffStrategy::exponential(Duration::from_millis(100));
    for attempt in [1u32, 3, 5, 10] {
        group.bench_with_input(
            BenchmarkId::new("delay_for_attempt", attempt),
            &attempt,
            |b, &attempt| b.iter(|| backoff.delay_for_attempt(black_box(attempt))),
        );
    }

    group.bench_function("policy_new", |b| {
        b.iter(|| RetryPolicy::new(3, BackoffStrategy::default()))
    });

    let timeout = TimeoutPolicy::new(Duration::from_secs(30));
    group.bench_function("effective_timeout", |b| {
        b.iter(|| timeout.effective(black_box(Some(Duration::from_secs(5)))))
    });

    group.finish();
}

// =============================================================================
// Fallback Benchmarks
// =============================================================================

fn bench_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback");
    let runtime = runtime();

    let strategy =
        FallbackStrategy::new("bench", FallbackConfig::default().logging(false)).unwrap();
    strategy
        .register_fallback(FallbackHandler::new(
            "default",
            "svc",
            FallbackKind::DefaultResponse {
                value: json!({"status": "degraded"}),
            },
        ))
        .unwrap();

    group.bench_function("fallback_not_needed", |b| {
        b.to_async(&runtime).iter(|| async {
            let request = FallbackRequest::new("svc", "lookup", json!({"id": 1}));
            let response = strategy
                .execute_with_fallback(&RequestContext::new(), request, |_ctx, req| async move {
                    Ok::<_, BoxError>(FallbackResponse::success(req.id, json!("primary")))
                })
                .await;
            black_box(response)
        })
    });

    group.bench_function("fallback_needed", |b| {
        b.to_async(&runtime).iter(|| async {
            let request = FallbackRequest::new("svc", "lookup", json!({"id": 1}));
            let response = strategy
                .execute_with_fallback(&RequestContext::new(), request, |_ctx, _req| async {
                    Err::<FallbackResponse, BoxError>("primary down".into())
                })
                .await;
            black_box(response)
        })
    });

    group.finish();
}

// =============================================================================
// Combined Resilience Pattern Benchmarks
// =============================================================================

fn bench_combined_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("combined_patterns");
    let runtime = runtime();

    let bulkhead = Bulkhead::new("bench", BulkheadConfig::new(100, 0).logging(false)).unwrap();
    let strategy =
        FallbackStrategy::new("bench", FallbackConfig::default().logging(false)).unwrap();

    group.bench_function("bulkhead_inside_fallback", |b| {
        b.to_async(&runtime).iter(|| async {
            let request = FallbackRequest::new("svc", "lookup", Value::Null);
            let response = strategy
                .execute_with_fallback(&RequestContext::new(), request, |ctx, req| {
                    let bulkhead = &bulkhead;
                    async move {
                        let inner = BulkheadRequest::new("svc", req.operation.clone(), req.data);
                        let response = bulkhead
                            .execute(&ctx, inner, |_ctx, inner| async move {
                                Ok::<_, BoxError>(BulkheadResponse::success(inner.id, json!(1)))
                            })
                            .await?;
                        Ok::<_, BoxError>(FallbackResponse::success(req.id, response.result))
                    }
                })
                .await;
            black_box(response)
        })
    });

    group.finish();
}

criterion_group!(
    resilience_benches,
    bench_bulkhead,
    bench_retry,
    bench_fallback,
    bench_combined_patterns,
);

criterion_main!(resilience_benches);
