use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};
use trendid::{
    BitLayout, Generator, IdInt, InstanceRegistry, MonotonicClock, RadixExt, RandSource,
    ReseedStrategy, ThreadRandom, TimeSource,
};

#[derive(Clone, Copy)]
struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Ids per benchmark iteration (split across threads when contended). Equal to
// one full tick of the WORKER layout, so a fixed clock never stalls.
const TOTAL_IDS: usize = 4096;

fn generator<T, C, R>(layout: BitLayout, reseed: ReseedStrategy, clock: C, rand: R) -> Generator<T, C, R>
where
    T: IdInt,
    C: TimeSource,
    R: RandSource,
{
    Generator::builder(layout)
        .node(1)
        .reseed(reseed)
        .registry(Arc::new(InstanceRegistry::new()))
        .clock(clock)
        .rand(rand)
        .build()
        .unwrap()
}

/// Hot path: every call is served from the current tick.
fn bench_sequential<T, C, R>(c: &mut Criterion, group_name: &str, factory: impl Fn() -> Generator<T, C, R>)
where
    T: IdInt,
    C: TimeSource,
    R: RandSource,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let generator = factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// One generator shared by several threads.
fn bench_contended<T, C, R>(c: &mut Criterion, group_name: &str, factory: impl Fn() -> Generator<T, C, R>)
where
    T: IdInt,
    C: TimeSource + Send + Sync,
    R: RandSource + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);
    let max_threads = num_cpus::get().clamp(1, 16);

    for thread_count in [1, 2, 4, 8, 16].into_iter().filter(|&t| t <= max_threads) {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    let generator = Arc::new(factory());
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.next_id().unwrap());
                                }
                            });
                        }
                        barrier.wait();
                    });
                }
                start.elapsed()
            });
        });
    }

    group.finish();
}

#[cfg(feature = "async-tokio")]
fn bench_async_tokio<T, C, R>(c: &mut Criterion, group_name: &str, factory: impl Fn() -> Generator<T, C, R> + Copy)
where
    T: IdInt,
    C: TimeSource + Send + Sync + 'static,
    R: RandSource + Send + Sync + 'static,
{
    use trendid::GeneratorAsyncExt;

    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(1)
            .build()
            .unwrap();

        b.to_async(&rt).iter_custom(|iters| async move {
            let start = Instant::now();
            for _ in 0..iters {
                let generator = factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id_async().await.unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

fn benchmark_mock_sequential(c: &mut Criterion) {
    bench_sequential(c, "mock/sequential/worker", || {
        generator::<u64, _, _>(
            BitLayout::WORKER,
            ReseedStrategy::Zero,
            FixedMockTime { millis: 1 },
            ThreadRandom,
        )
    });
}

fn benchmark_mock_contended(c: &mut Criterion) {
    bench_contended(c, "mock/contended/worker", || {
        generator::<u64, _, _>(
            BitLayout::WORKER,
            ReseedStrategy::Zero,
            FixedMockTime { millis: 1 },
            ThreadRandom,
        )
    });
}

fn benchmark_mono_sequential(c: &mut Criterion) {
    bench_sequential(c, "mono/sequential/worker", || {
        generator::<u64, _, _>(
            BitLayout::WORKER,
            ReseedStrategy::Random,
            MonotonicClock::default(),
            ThreadRandom,
        )
    });
    bench_sequential(c, "mono/sequential/wide", || {
        generator::<u128, _, _>(
            BitLayout::WIDE,
            ReseedStrategy::Random,
            MonotonicClock::default(),
            ThreadRandom,
        )
    });
}

fn benchmark_mono_contended(c: &mut Criterion) {
    bench_contended(c, "mono/contended/worker", || {
        generator::<u64, _, _>(
            BitLayout::WORKER,
            ReseedStrategy::Random,
            MonotonicClock::default(),
            ThreadRandom,
        )
    });
}

fn benchmark_radix36(c: &mut Criterion) {
    let generator = generator::<u128, _, _>(
        BitLayout::WIDE,
        ReseedStrategy::Random,
        MonotonicClock::default(),
        ThreadRandom,
    );
    let ids: Vec<u128> = (0..TOTAL_IDS).map(|_| generator.next_id().unwrap()).collect();

    let mut group = c.benchmark_group("radix36/wide");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));
    group.bench_function("encode", |b| {
        b.iter(|| {
            for &id in &ids {
                black_box(id.to_radix36());
            }
        });
    });
    let encoded: Vec<String> = ids.iter().map(|&id| id.to_radix36()).collect();
    group.bench_function("decode", |b| {
        b.iter(|| {
            for s in &encoded {
                black_box(u128::from_radix36(s).unwrap());
            }
        });
    });
    group.finish();
}

#[cfg(feature = "async-tokio")]
fn benchmark_mono_sequential_tokio(c: &mut Criterion) {
    bench_async_tokio(c, "mono/sequential/tokio/worker", || {
        generator::<u64, _, _>(
            BitLayout::WORKER,
            ReseedStrategy::Random,
            MonotonicClock::default(),
            ThreadRandom,
        )
    });
}

#[cfg(not(feature = "async-tokio"))]
fn benchmark_mono_sequential_tokio(_: &mut Criterion) {}

criterion_group!(
    benches,
    // Mock clock, never pending
    benchmark_mock_sequential,
    benchmark_mock_contended,
    // Monotonic clock, waits for the next tick when exhausted
    benchmark_mono_sequential,
    benchmark_mono_contended,
    benchmark_mono_sequential_tokio,
    // Presentation
    benchmark_radix36,
);
criterion_main!(benches);
