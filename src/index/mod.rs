//! The loaded, queryable index.
//!
//! A [`LoadedIndex`] pairs a [`Forest`] with the handle sequence that maps
//! forest ordinals back to catalog handles. It is produced either by
//! [`build`] (which also persists the artifact set) or by [`load`], and is
//! immutable afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! use snapmatch::{index, storage::ArtifactPaths, ForestConfig, Handle};
//!
//! # fn main() -> snapmatch::Result<()> {
//! let paths = ArtifactPaths::in_dir("./data");
//! let vectors = vec![vec![0.1, 0.9, 0.2], vec![0.8, 0.1, 0.3]];
//! let handles = vec![Handle::from("red-mug"), Handle::from("blue-mug")];
//!
//! index::build(&vectors, &handles, 3, &ForestConfig::default(), &paths)?;
//!
//! let index = index::load(&paths)?;
//! let nearest = index.search(&[0.1, 0.8, 0.2], 1)?;
//! assert_eq!(nearest[0].as_str(), "red-mug");
//! # Ok(())
//! # }
//! ```

mod build;
mod load;

pub use build::build;
pub use load::load;

use crate::error::{Result, ValidationError};
use crate::types::Handle;
use crate::vector::{Forest, VectorIndex};

/// An immutable, in-memory index ready for queries.
///
/// `LoadedIndex` is `Send + Sync`; share it behind an `Arc` and query it
/// from any number of threads.
#[derive(Clone, Debug)]
pub struct LoadedIndex {
    dimension: usize,
    forest: Forest,
    handles: Vec<Handle>,
    search_k: Option<usize>,
}

impl LoadedIndex {
    /// Assembles an index from parts that are already known to agree.
    pub(crate) fn from_parts(dimension: usize, forest: Forest, handles: Vec<Handle>) -> Self {
        debug_assert_eq!(forest.item_count(), handles.len());
        debug_assert_eq!(forest.dimension(), dimension);
        Self {
            dimension,
            forest,
            handles,
            search_k: None,
        }
    }

    /// Sets the query-time candidate budget (see [`crate::SearchConfig::search_k`]).
    pub fn with_search_k(mut self, search_k: Option<usize>) -> Self {
        self.search_k = search_k;
        self
    }

    /// Vector length every query must have.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed items.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the index holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in ordinal order.
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    /// The underlying forest.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Returns up to `k` handles, closest first.
    ///
    /// `k` may exceed [`len`](Self::len), in which case every handle is
    /// returned. An empty index yields an empty list.
    ///
    /// # Errors
    ///
    /// - `ValidationError::DimensionMismatch` if `query.len()` differs from
    ///   [`dimension`](Self::dimension), regardless of `k`
    /// - `ValidationError::InvalidField` if `k` is 0 or the query holds a
    ///   NaN/infinite component
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Handle>> {
        Ok(self
            .search_scored(query, k)?
            .into_iter()
            .map(|(handle, _)| handle)
            .collect())
    }

    /// Like [`search`](Self::search) but also returns the angular distance
    /// of each hit, in `[0, 2]`.
    pub fn search_scored(&self, query: &[f32], k: usize) -> Result<Vec<(Handle, f32)>> {
        if query.len() != self.dimension {
            return Err(ValidationError::dimension_mismatch(self.dimension, query.len()).into());
        }
        if k == 0 {
            return Err(ValidationError::invalid_field("k", "must be at least 1").into());
        }

        let hits = self.forest.search(query, k, self.search_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, distance)| self.handles.get(id).map(|h| (h.clone(), distance)))
            .collect())
    }
}

/// Free-function form of [`LoadedIndex::search`].
pub fn search(index: &LoadedIndex, query: &[f32], k: usize) -> Result<Vec<Handle>> {
    index.search(query, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;

    fn small_index() -> LoadedIndex {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.7, 0.7, 0.0],
        ];
        let config = ForestConfig {
            n_trees: 4,
            max_leaf_size: 1,
            seed: Some(5),
        };
        let forest = Forest::build(3, &vectors, &config).unwrap();
        let handles = ["x", "y", "z", "xy"].iter().map(|&h| Handle::from(h)).collect();
        LoadedIndex::from_parts(3, forest, handles)
    }

    #[test]
    fn test_search_maps_ordinals_to_handles() {
        let index = small_index();
        let hits = index.search(&[0.0, 2.0, 0.0], 1).unwrap();
        assert_eq!(hits, vec![Handle::from("y")]);
    }

    #[test]
    fn test_search_scored_distances_in_range() {
        let index = small_index();
        let hits = index.search_scored(&[1.0, 0.1, 0.0], 4).unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].0.as_str(), "x");
        for (_, d) in &hits {
            assert!((0.0..=2.0).contains(d));
        }
    }

    #[test]
    fn test_zero_k_rejected() {
        let err = small_index().search(&[1.0, 0.0, 0.0], 0).unwrap_err();
        assert!(err.is_validation());
        assert!(!err.is_dimension_mismatch());
    }

    #[test]
    fn test_dimension_checked_before_k() {
        let err = small_index().search(&[1.0, 0.0], 0).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_free_function_matches_method() {
        let index = small_index();
        let q = [0.3, 0.3, 0.9];
        assert_eq!(search(&index, &q, 2).unwrap(), index.search(&q, 2).unwrap());
    }

    #[test]
    fn test_loaded_index_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LoadedIndex>();
    }
}
