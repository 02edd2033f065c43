use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use multiqueue_sched::balancer::rebalance;
use multiqueue_sched::loader::{decode_records, encode_records};
use multiqueue_sched::partition::partition;
use multiqueue_sched::scheduler::run_discipline;
use multiqueue_sched::{CpuQueue, Discipline, ProcessRecord, SchedulerConfig};

fn records(count: usize) -> Vec<ProcessRecord> {
    (0..count)
        .map(|i| ProcessRecord::new(i as i32, "bench", (i % 50 + 1) as i32, (i % 20) as i8))
        .collect()
}

fn unpaced() -> SchedulerConfig {
    SchedulerConfig {
        tick: Duration::ZERO,
        ..SchedulerConfig::default()
    }
}

fn bench_disciplines(c: &mut Criterion) {
    let mut group = c.benchmark_group("discipline_pass");
    let config = unpaced();
    let running = AtomicBool::new(true);

    for discipline in Discipline::ALL {
        group.bench_function(discipline.label(), |b| {
            b.iter_batched(
                || CpuQueue::new(0, discipline, records(256)),
                |queue| black_box(run_discipline(&queue, &config, &running)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_rebalance(c: &mut Criterion) {
    let mut group = c.benchmark_group("balancer");

    group.bench_function("steal_half", |b| {
        b.iter_batched(
            || {
                vec![
                    CpuQueue::new(0, Discipline::Fcfs, vec![ProcessRecord::new(0, "idle", 0, 0); 128]),
                    CpuQueue::new(1, Discipline::RoundRobin, records(256)),
                    CpuQueue::new(2, Discipline::Sjf, records(64)),
                ]
            },
            |queues| black_box(rebalance(&queues, 0)),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("setup");
    let bytes = encode_records(&records(4096));

    group.bench_function("decode_4096", |b| {
        b.iter(|| black_box(decode_records(black_box(&bytes))));
    });
    group.bench_function("partition", |b| {
        b.iter(|| black_box(partition(black_box(100_000), &[0.1, 0.2, 0.3, 0.15, 0.25])));
    });
    group.finish();
}

criterion_group!(benches, bench_disciplines, bench_rebalance, bench_setup);
criterion_main!(benches);
