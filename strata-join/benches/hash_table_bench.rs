use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_join::{
    merge_partitions, partition_offsets, FinalTable, GlobalAllocator, ProbeIndex, TupleCollector,
    UnchainedHashTable,
};

const BUILD_ROWS: usize = 1 << 20;
const PROBE_ROWS: usize = 1 << 20;

fn make_keys(n: usize, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..(n as i32))).collect()
}

fn bench_serial_build(c: &mut Criterion) {
    let keys = make_keys(BUILD_ROWS, 1);
    let mut group = c.benchmark_group("serial_build");
    group.throughput(Throughput::Elements(BUILD_ROWS as u64));
    group.bench_function("insert_finalize", |b| {
        b.iter_batched(
            || keys.clone(),
            |keys| {
                let mut table = UnchainedHashTable::with_capacity(keys.len());
                for (row, key) in keys.iter().enumerate() {
                    table.insert(*key, row as u64);
                }
                table.finalize();
                black_box(table.len())
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_partitioned_build(c: &mut Criterion) {
    let keys = make_keys(BUILD_ROWS, 2);
    let mut group = c.benchmark_group("partitioned_build");
    group.throughput(Throughput::Elements(BUILD_ROWS as u64));
    for num_threads in [2usize, 4, 8] {
        group.bench_function(BenchmarkId::from_parameter(num_threads), |b| {
            b.iter(|| {
                let level1 = GlobalAllocator::new();
                let mut collectors: Vec<TupleCollector<'_>> = (0..num_threads)
                    .map(|_| TupleCollector::new(&level1, num_threads))
                    .collect();
                let per_thread = keys.len().div_ceil(num_threads);
                std::thread::scope(|scope| {
                    for (t, collector) in collectors.iter_mut().enumerate() {
                        let slice = &keys[t * per_thread..((t + 1) * per_thread).min(keys.len())];
                        let base = (t * per_thread) as u64;
                        scope.spawn(move || {
                            for (i, key) in slice.iter().enumerate() {
                                collector.consume(*key, base + i as u64);
                            }
                        });
                    }
                });
                let blocks = merge_partitions(&collectors, num_threads);
                let offsets = partition_offsets(&collectors, num_threads);
                let mut table = FinalTable::new(*offsets.last().unwrap(), num_threads);
                table.post_process(&collectors, &blocks, &offsets);
                black_box(table.len())
            })
        });
    }
    group.finish();
}

fn bench_probe(c: &mut Criterion) {
    let keys = make_keys(BUILD_ROWS, 3);
    let mut table = UnchainedHashTable::with_capacity(keys.len());
    for (row, key) in keys.iter().enumerate() {
        table.insert(*key, row as u64);
    }
    table.finalize();

    let probes = make_keys(PROBE_ROWS, 4);
    let mut group = c.benchmark_group("probe");
    group.throughput(Throughput::Elements(PROBE_ROWS as u64));
    group.bench_function("for_each_match", |b| {
        b.iter(|| {
            let mut matched = 0u64;
            for key in &probes {
                table.for_each_match(*key, |_| matched += 1);
            }
            black_box(matched)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_serial_build,
    bench_partitioned_build,
    bench_probe
);
criterion_main!(benches);
