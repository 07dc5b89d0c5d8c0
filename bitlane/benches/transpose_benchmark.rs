use bitlane::BitMatrix;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

const SEED: u64 = 0x51ab;

pub fn square_transpose_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("BitMatrix::transpose_in_place");
    for side in [256usize, 1024, 4096] {
        group.sample_size(20);
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |bencher, &side| {
            bencher.iter_batched(
                || {
                    let mut rng = SmallRng::seed_from_u64(SEED);
                    BitMatrix::random(side, side, &mut rng)
                },
                |mut matrix| {
                    matrix.transpose_in_place();
                    matrix
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

pub fn rectangular_transpose_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("BitMatrix::transposed");
    for (rows, columns) in [(256usize, 4096usize), (1000, 3000), (4096, 256)] {
        group.sample_size(20);
        let label = format!("{rows}x{columns}");
        group.bench_with_input(BenchmarkId::from_parameter(label), &(rows, columns), |bencher, &(rows, columns)| {
            bencher.iter_batched(
                || {
                    let mut rng = SmallRng::seed_from_u64(SEED);
                    BitMatrix::random(rows, columns, &mut rng)
                },
                |matrix| matrix.transposed(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, square_transpose_benchmark, rectangular_transpose_benchmark);
criterion_main!(benches);
