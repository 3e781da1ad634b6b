//! Vector index abstractions for visual similarity search.
//!
//! This module provides a trait-based abstraction over vector indexes,
//! allowing different ANN (Approximate Nearest Neighbor) backends.
//! The implementation is a forest of randomized space-partitioning trees
//! with angular distance ([`Forest`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         VectorIndex trait         │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┴────────┐
//!    │     Forest     │  (random two-means hyperplane trees)
//!    └────────────────┘
//! ```
//!
//! # Distance
//!
//! Embedding magnitude carries no meaning for image features, only
//! direction. Every distance here is the angular distance
//! `sqrt(2 - 2·cos(a, b))`, which is 0.0 for identical directions and 2.0
//! for opposite ones.

mod build;
mod forest;

pub use forest::Forest;

use crate::error::Result;
use crate::types::ItemId;

/// Vector index trait for approximate nearest neighbor search.
///
/// Implementations must be `Send + Sync`: one loaded index is shared by
/// every request worker. Searching never mutates the index.
pub trait VectorIndex: Send + Sync {
    /// Dimension every indexed and query vector must have.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns true if the index has no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Searches for the k nearest neighbors to the query vector.
    ///
    /// Returns `(ordinal, distance)` pairs sorted by distance ascending
    /// (closest first), at most `k` of them. `search_k` is the size of each
    /// exactly ranked candidate tier; `None` lets the implementation pick a
    /// default that does not depend on `k`. For a fixed query, the result
    /// for a smaller `k` is a prefix of the result for a larger one.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if `query.len()` differs
    /// from [`dimension`](Self::dimension).
    fn search(&self, query: &[f32], k: usize, search_k: Option<usize>)
        -> Result<Vec<(ItemId, f32)>>;
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Returns a unit-length copy of `v`. A zero vector stays zero.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        vec![0.0; v.len()]
    }
}

/// Angular distance between two unit vectors.
#[inline]
pub(crate) fn unit_angular_distance(a: &[f32], b: &[f32]) -> f32 {
    let cos = dot(a, b).clamp(-1.0, 1.0);
    (2.0 - 2.0 * cos).max(0.0).sqrt()
}

/// Angular distance between two vectors of any magnitude.
///
/// If either vector is all zeros the cosine is taken as 0, giving
/// `sqrt(2)`.
///
/// # Example
/// ```
/// use snapmatch::vector::angular_distance;
///
/// let d = angular_distance(&[1.0, 0.0], &[5.0, 0.0]);
/// assert!(d.abs() < 1e-6);
///
/// let d = angular_distance(&[1.0, 0.0], &[-1.0, 0.0]);
/// assert!((d - 2.0).abs() < 1e-6);
/// ```
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    let denom = (dot(a, a) * dot(b, b)).sqrt();
    let cos = if denom > 0.0 { dot(a, b) / denom } else { 0.0 };
    (2.0 - 2.0 * cos.clamp(-1.0, 1.0)).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_angular_distance_ignores_magnitude() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert!(angular_distance(&a, &b) < 1e-3);
    }

    #[test]
    fn test_angular_distance_orthogonal() {
        let d = angular_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_angular_distance_zero_vector() {
        let d = angular_distance(&[0.0, 0.0], &[0.0, 1.0]);
        assert!((d - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_unit_distance_matches_general() {
        let a = [0.3, -0.7, 1.1];
        let b = [2.0, 0.5, -0.4];
        let unit = unit_angular_distance(&normalize(&a), &normalize(&b));
        assert!((unit - angular_distance(&a, &b)).abs() < 1e-5);
    }
}
