use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use downsampler_core::PointCloud;
use downsampler_filters::{range_filter, RangeFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_cloud(n: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(-150.0..150.0)).collect();
    let y: Vec<f64> = (0..n).map(|_| rng.gen_range(-150.0..150.0)).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(-5.0..15.0)).collect();
    PointCloud::from_xyz(x, y, z)
}

fn bench_range_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_filter_0_80");
    for size in [100_000, 1_000_000] {
        let cloud = random_cloud(size, 42);
        group.bench_with_input(
            BenchmarkId::new("points-downsampler", size),
            &cloud,
            |b, cloud| b.iter(|| range_filter(cloud, 0.0, 80.0)),
        );
    }
    group.finish();
}

fn bench_unbounded_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_filter_unbounded");
    let filter = RangeFilter::default();
    for size in [100_000, 1_000_000] {
        let cloud = random_cloud(size, 42);
        group.bench_with_input(
            BenchmarkId::new("points-downsampler", size),
            &cloud,
            |b, cloud| b.iter(|| filter.apply(cloud)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_range_filter, bench_unbounded_range);
criterion_main!(benches);
