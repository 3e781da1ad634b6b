//! Integration tests for query behavior of a built index.

use proptest::prelude::*;
use snapmatch::index::{self, LoadedIndex};
use snapmatch::storage::ArtifactPaths;
use snapmatch::{Config, ForestConfig, Handle};
use tempfile::tempdir;

const DIM: usize = 24;

/// Pseudo-random embedding; different seeds point in unrelated directions.
fn scattered(seed: u64) -> Vec<f32> {
    (0..DIM)
        .map(|i| ((seed * 31 + i as u64 * 17) as f32 * 0.37).sin())
        .collect()
}

fn build_index(n: usize, config: ForestConfig) -> (LoadedIndex, Vec<Vec<f32>>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let vectors: Vec<_> = (0..n as u64).map(scattered).collect();
    let handles: Vec<_> = (0..n).map(|i| Handle::new(format!("h{}", i))).collect();
    let index = index::build(&vectors, &handles, DIM, &config, &paths).unwrap();
    (index, vectors, dir)
}

fn small_forest() -> ForestConfig {
    ForestConfig {
        n_trees: 10,
        max_leaf_size: 8,
        seed: Some(2024),
    }
}

// ============================================================================
// Recall
// ============================================================================

#[test]
fn test_self_query_recall() {
    let (index, vectors, _dir) = build_index(400, small_forest());
    let k = 5.min(index.len());

    for (i, v) in vectors.iter().enumerate() {
        let hits = index.search(v, k).unwrap();
        assert!(
            hits.iter().any(|h| h.as_str() == format!("h{}", i)),
            "h{} missing from its own top {}: {:?}",
            i,
            k,
            hits
        );
    }
}

#[test]
fn test_self_query_recall_tiny_catalog() {
    let (index, vectors, _dir) = build_index(3, small_forest());
    for (i, v) in vectors.iter().enumerate() {
        let hits = index.search(v, 5).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.contains(&Handle::new(format!("h{}", i))));
    }
}

#[test]
fn test_k_beyond_catalog_returns_everything_ordered() {
    let (index, _vectors, _dir) = build_index(25, small_forest());
    let scored = index.search_scored(&scattered(9999), 1000).unwrap();

    assert_eq!(scored.len(), 25);
    for w in scored.windows(2) {
        assert!(w[0].1 <= w[1].1);
    }
}

#[test]
fn test_exhaustive_budget_matches_brute_force() {
    let (index, vectors, _dir) = build_index(150, small_forest());
    let index = index.with_search_k(Some(150));
    let query = scattered(777);

    let mut expected: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, snapmatch::vector::angular_distance(v, &query)))
        .collect();
    expected.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut hits = index.search(&query, 10).unwrap();
    let mut expected: Vec<_> = expected[..10]
        .iter()
        .map(|(i, _)| Handle::new(format!("h{}", i)))
        .collect();
    // Stored vectors are pre-normalized, so compare membership, not float-level order
    hits.sort();
    expected.sort();
    assert_eq!(hits, expected);
}

#[test]
fn test_default_budget_larger_k_extends_smaller_k() {
    let config = ForestConfig {
        n_trees: 10,
        max_leaf_size: 16,
        seed: Some(3),
    };
    let (index, _vectors, _dir) = build_index(5000, config);
    let index = index.with_search_k(Config::default().search.search_k);

    for seed in 0..200u64 {
        let query = scattered(seed + 90_000);
        let five = index.search(&query, 5).unwrap();
        let fifty = index.search(&query, 50).unwrap();
        let five_hundred = index.search(&query, 500).unwrap();
        assert_eq!(five[..], fifty[..5], "query {}", seed);
        assert_eq!(fifty[..], five_hundred[..50], "query {}", seed);
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_fixed_budget_results_are_prefixes(seed in 0u64..10_000, k1 in 1usize..10, extra in 1usize..20) {
        let (index, _vectors, _dir) = build_index(300, small_forest());
        let index = index.with_search_k(Some(100));
        let query = scattered(seed + 50_000);

        let short = index.search(&query, k1).unwrap();
        let long = index.search(&query, k1 + extra).unwrap();
        prop_assert_eq!(&short[..], &long[..k1]);
    }

    #[test]
    fn prop_wrong_length_query_always_rejected(len in 0usize..64, k in 1usize..500) {
        prop_assume!(len != DIM);
        let (index, _vectors, _dir) = build_index(20, small_forest());

        let err = index.search(&vec![0.5; len], k).unwrap_err();
        prop_assert!(err.is_dimension_mismatch());
        prop_assert!(err.is_service_unavailable());
    }
}
