use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

mod helpers;

use helpers::{
    bench_engine, bench_runtime, build_branch_chain, build_fanout_flow, build_linear_flow,
};

fn bench_dispatch(c: &mut Criterion) {
    let rt = bench_runtime();
    let engine = bench_engine();

    let mut group = c.benchmark_group("dispatch/linear");
    for nodes in [1usize, 10, 50] {
        let flow = build_linear_flow(nodes);
        group.bench_function(format!("{}_nodes", nodes), |b| {
            b.to_async(&rt)
                .iter(|| async { engine.execute(&flow, None, Some(json!(0))).await });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("dispatch/branch");
    for depth in [2usize, 10] {
        let flow = build_branch_chain(depth);
        group.bench_function(format!("depth_{}", depth), |b| {
            b.to_async(&rt)
                .iter(|| async { engine.execute(&flow, None, None).await });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("dispatch/fanout");
    let flow = build_fanout_flow(32);
    group.bench_function("32_children", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.execute(&flow, None, None).await });
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));
    targets = bench_dispatch
}
criterion_main!(benches);
