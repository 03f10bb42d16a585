//! Click gate 性能基准测试

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use soplink::config::ExpiryPolicy;
use soplink::tracking::{BotFilter, ClickGate, MemoryClickGate, SystemClock};
use std::sync::Arc;
use std::time::Duration;

fn create_gate(policy: ExpiryPolicy) -> Arc<MemoryClickGate> {
    // 在 runtime 之外创建时不会启动清理定时器，只靠惰性过期
    Arc::new(MemoryClickGate::new(
        Duration::from_secs(3),
        policy,
        SystemClock::arc(),
    ))
}

/// 同一指纹反复出现（重复点击路径）
fn bench_duplicate_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("try_acquire/duplicate");

    for policy in [ExpiryPolicy::Fixed, ExpiryPolicy::Sliding] {
        let gate = create_gate(policy);
        gate.try_acquire("amy@example.com-SOP-1");
        group.bench_function(policy.as_ref(), |b| {
            b.iter(|| gate.try_acquire("amy@example.com-SOP-1"));
        });
    }
    group.finish();
}

/// 不同指纹（首次点击路径）
fn bench_distinct_hits(c: &mut Criterion) {
    let gate = create_gate(ExpiryPolicy::Fixed);
    let keys: Vec<String> = (0..10_000).map(|i| format!("user{}-SOP-{}", i, i % 50)).collect();
    let mut idx = 0;

    c.bench_function("try_acquire/distinct", |b| {
        b.iter(|| {
            gate.try_acquire(&keys[idx % keys.len()]);
            idx += 1;
        });
    });
}

/// 多线程争用同一指纹
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("try_acquire/contended");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            &num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let gate = create_gate(ExpiryPolicy::Fixed);
                    std::thread::scope(|s| {
                        for _ in 0..num_threads {
                            let gate = Arc::clone(&gate);
                            s.spawn(move || {
                                for _ in 0..1000 / num_threads {
                                    gate.try_acquire("shared");
                                }
                            });
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

fn bench_bot_filter(c: &mut Criterion) {
    let filter = BotFilter::new(soplink::config::default_bot_signatures());
    let chrome = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

    c.bench_function("bot_filter/browser", |b| {
        b.iter(|| filter.is_bot(Some(chrome)));
    });
}

criterion_group!(
    benches,
    bench_duplicate_hits,
    bench_distinct_hits,
    bench_contended,
    bench_bot_filter
);
criterion_main!(benches);
