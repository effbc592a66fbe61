use behavior_core::TickContext;
use behavior_graph::{GraphBuilder, GraphConfig, ParallelPolicy, Wait};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_sequence_restart(c: &mut Criterion) {
    let config = GraphConfig {
        restart_on_completion: true,
        ..GraphConfig::default()
    };
    let mut b = GraphBuilder::new("bench/sequence").config(config);
    let leaves = (0..32)
        .map(|i| b.action(format!("leaf{i}"), Wait::new(0.0)))
        .collect::<Vec<_>>();
    let root = b.sequence("root", leaves);
    let mut module = b.build(root).expect("bench graph builds");

    let mut tick: u64 = 0;
    c.bench_function("behavior-graph/tick(sequence=32)", |b| {
        b.iter(|| {
            let status = module.tick(TickContext::new(tick, 0.1));
            black_box(status);
            tick = tick.wrapping_add(1);
        })
    });
}

fn bench_parallel_sweep(c: &mut Criterion) {
    let mut b = GraphBuilder::new("bench/parallel");
    let leaves = (0..32)
        .map(|i| b.action(format!("wait{i}"), Wait::new(f32::MAX)))
        .collect::<Vec<_>>();
    let root = b.parallel("root", ParallelPolicy::All, leaves);
    let mut module = b.build(root).expect("bench graph builds");
    module.start();

    let mut ctx = TickContext::new(1, 0.1);
    c.bench_function("behavior-graph/sweep(running=32)", |b| {
        b.iter(|| {
            let status = module.tick(ctx);
            black_box(module.active_nodes().len());
            black_box(status);
            ctx = ctx.next();
        })
    });
}

criterion_group!(benches, bench_sequence_restart, bench_parallel_sweep);
criterion_main!(benches);
