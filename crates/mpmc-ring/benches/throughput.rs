use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mpmc_ring::{consume_with, produce_with, Backoff, Ring, SpinLoop, YieldNow};
use std::sync::Arc;
use std::thread;

const MSG_TOTAL: usize = 1_000_000;
const QUEUE_SIZE: usize = 1024;

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");
    group.throughput(Throughput::Elements(1));

    let ring = Ring::<usize>::new(QUEUE_SIZE).unwrap();
    group.bench_function("produce_consume", |b| {
        b.iter(|| {
            ring.produce(black_box(1)).unwrap();
            black_box(ring.consume());
        });
    });

    group.bench_function("consume_empty", |b| {
        b.iter(|| black_box(ring.consume()));
    });

    group.finish();
}

fn run_mpmc<B, F>(producers: usize, consumers: usize, make_policy: F)
where
    B: mpmc_ring::BackoffPolicy,
    F: Fn() -> B + Send + Sync + Copy + 'static,
{
    let ring = Arc::new(Ring::<usize>::new(QUEUE_SIZE).unwrap());
    let per_producer = MSG_TOTAL / producers;
    let per_consumer = MSG_TOTAL / consumers;

    let mut handles = vec![];
    for p in 0..producers {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            let mut policy = make_policy();
            for i in p * per_producer..(p + 1) * per_producer {
                produce_with(&*ring, i + 1, &mut policy);
            }
            0
        }));
    }
    for _ in 0..consumers {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            let mut policy = make_policy();
            let mut sum = 0usize;
            for _ in 0..per_consumer {
                sum = sum.wrapping_add(consume_with(&*ring, &mut policy));
            }
            sum
        }));
    }

    let sum = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold(0usize, usize::wrapping_add);
    black_box(sum);
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.throughput(Throughput::Elements(MSG_TOTAL as u64));
    group.sample_size(10);

    for (p, c_) in [(1, 1), (2, 2), (4, 1), (4, 4)] {
        let id = format!("{}P_{}C", p, c_);
        group.bench_with_input(BenchmarkId::new("yield", &id), &(p, c_), |b, &(p, c_)| {
            b.iter(|| run_mpmc(p, c_, || YieldNow));
        });
        group.bench_with_input(BenchmarkId::new("adaptive", &id), &(p, c_), |b, &(p, c_)| {
            b.iter(|| run_mpmc(p, c_, Backoff::new));
        });
        group.bench_with_input(BenchmarkId::new("spin", &id), &(p, c_), |b, &(p, c_)| {
            b.iter(|| run_mpmc(p, c_, || SpinLoop));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_mpmc);
criterion_main!(benches);
