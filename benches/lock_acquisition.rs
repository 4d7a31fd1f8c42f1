//! Benchmarks for lock acquisition latency

use criterion::{Criterion, criterion_group, criterion_main};
use distributed_mutex_core::prelude::*;

fn bench_memory_lock_acquisition(c: &mut Criterion) {
    let client = LockClient::new(MemoryLockStore::new());

    let mut group = c.benchmark_group("memory_lock");
    group.bench_function("acquire_release", |b| {
        b.to_async(tokio::runtime::Runtime::new().unwrap())
            .iter(|| async {
                if let Ok(Some(token)) = client.acquire("bench-lock", None, None).await {
                    let _ = client.release("bench-lock", &token).await;
                }
            });
    });

    group.bench_function("reentrant_enter_exit", |b| {
        b.to_async(tokio::runtime::Runtime::new().unwrap())
            .iter(|| async {
                let mut ctx = ReentrancyContext::new();
                for _ in 0..3 {
                    let _ = ctx.enter(&client, "bench-reentrant", AcquireOptions::new()).await;
                }
                for _ in 0..3 {
                    let _ = ctx.exit(&client, "bench-reentrant").await;
                }
            });
    });

    group.finish();
}

criterion_group!(benches, bench_memory_lock_acquisition);
criterion_main!(benches);
