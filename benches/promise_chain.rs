use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use evently_promise::{ExecutorConfig, ExecutorKind, Promise};

fn bench_resolved(c: &mut Criterion) {
    c.bench_function("of_wait", |b| {
        b.iter(|| Promise::of(black_box(42u64)).wait().unwrap())
    });
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for kind in [ExecutorKind::ThreadPool, ExecutorKind::Tokio] {
        let executor = ExecutorConfig::new()
            .with_kind(kind)
            .build()
            .expect("executor");
        group.bench_function(format!("{:?}", kind), |b| {
            b.iter(|| {
                let (start, completer) = Promise::<u64>::pending_on(executor.clone());
                let end = start
                    .map(|v| v + 1)
                    .then(|v| Promise::of(v * 2))
                    .map(|v| v - 1);
                completer.succeed(black_box(20));
                end.wait().unwrap()
            })
        });
    }
    group.finish();
}

fn bench_all(c: &mut Criterion) {
    c.bench_function("all_64", |b| {
        b.iter(|| {
            let promises = (0..64u64).map(Promise::of);
            Promise::all(promises).wait().unwrap()
        })
    });
}

criterion_group!(benches, bench_resolved, bench_chain, bench_all);
criterion_main!(benches);
