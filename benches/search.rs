//! Benchmarks for the query path.
//!
//! Run with: `cargo bench --bench search`
//!
//! The request path is index search (candidate over-fetch) followed by
//! metadata filtering; both are measured separately and together.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use snapmatch::{
    Catalog, Config, ForestConfig, Handle, ProductRecord, SearchContext, SearchFilter,
};
use tempfile::tempdir;

const DIM: usize = 128;
const PRODUCTS: usize = 10_000;

fn make_embedding(seed: u64) -> Vec<f32> {
    (0..DIM)
        .map(|i| ((seed * 31 + i as u64 * 17) as f32 * 0.37).sin())
        .collect()
}

fn catalog() -> Catalog {
    Catalog::from_records((0..PRODUCTS).map(|i| {
        ProductRecord::new(format!("sku-{}", i))
            .with_vendor(["Acme", "Globex", "Initech", "Umbrella"][i % 4])
            .with_product_type(["Mugs", "Shirts", "Hats"][i % 3])
    }))
}

fn ready_context() -> (SearchContext, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let config = Config {
        index_dir: dir.path().to_path_buf(),
        forest: ForestConfig {
            seed: Some(7),
            ..Default::default()
        },
        ..Default::default()
    };
    let ctx = SearchContext::new(config, catalog()).unwrap();
    let vectors: Vec<_> = (0..PRODUCTS as u64).map(make_embedding).collect();
    let handles: Vec<_> = (0..PRODUCTS).map(|i| Handle::new(format!("sku-{}", i))).collect();
    ctx.rebuild(&vectors, &handles, DIM).unwrap();
    (ctx, dir)
}

/// Benchmark raw index search at the candidate sizes used in practice.
fn bench_index_search(c: &mut Criterion) {
    let (ctx, _dir) = ready_context();
    let index = ctx.index().unwrap();
    let query = make_embedding(123_456);

    let mut group = c.benchmark_group("index_search_10k");
    for k in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            b.iter(|| index.search(black_box(&query), k).unwrap());
        });
    }
    group.finish();
}

/// Benchmark the full two-stage search with a vendor filter.
fn bench_two_stage(c: &mut Criterion) {
    let (ctx, _dir) = ready_context();
    let query = make_embedding(654_321);
    let filter = SearchFilter::default().with_vendor("acme");

    c.bench_function("two_stage_search_10k", |b| {
        b.iter(|| ctx.search(black_box(&query), &filter).unwrap());
    });
}

criterion_group!(benches, bench_index_search, bench_two_stage);
criterion_main!(benches);
