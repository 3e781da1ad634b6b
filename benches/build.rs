//! Benchmarks for index construction and loading.
//!
//! Run with: `cargo bench --bench build`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use snapmatch::index;
use snapmatch::storage::ArtifactPaths;
use snapmatch::{ForestConfig, Handle};
use tempfile::tempdir;

const DIM: usize = 128;

fn make_embedding(seed: u64) -> Vec<f32> {
    (0..DIM)
        .map(|i| ((seed * 31 + i as u64 * 17) as f32 * 0.37).sin())
        .collect()
}

fn corpus(n: usize) -> (Vec<Vec<f32>>, Vec<Handle>) {
    (
        (0..n as u64).map(make_embedding).collect(),
        (0..n).map(|i| Handle::new(format!("sku-{}", i))).collect(),
    )
}

/// Benchmark building and persisting an index at several tree counts.
fn bench_build(c: &mut Criterion) {
    let (vectors, handles) = corpus(5_000);
    let mut group = c.benchmark_group("build_5k");
    group.sample_size(10);

    for n_trees in [10usize, 50, 100] {
        let config = ForestConfig {
            n_trees,
            seed: Some(1),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), &config, |b, config| {
            b.iter_custom(|iters| {
                let mut total = std::time::Duration::ZERO;
                for _ in 0..iters {
                    let dir = tempdir().unwrap();
                    let paths = ArtifactPaths::in_dir(dir.path());

                    let start = std::time::Instant::now();
                    index::build(&vectors, &handles, DIM, config, &paths).unwrap();
                    total += start.elapsed();
                }
                total
            });
        });
    }
    group.finish();
}

/// Benchmark loading an existing artifact set.
fn bench_load(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let (vectors, handles) = corpus(5_000);
    let config = ForestConfig {
        seed: Some(1),
        ..Default::default()
    };
    index::build(&vectors, &handles, DIM, &config, &paths).unwrap();

    c.bench_function("load_5k", |b| {
        b.iter(|| index::load(&paths).unwrap());
    });
}

criterion_group!(benches, bench_build, bench_load);
criterion_main!(benches);
