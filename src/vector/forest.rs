//! Randomized-projection forest: storage layout and query traversal.
//!
//! Each tree recursively splits the item set with a hyperplane through the
//! origin, chosen by a short two-means run over random samples, until a
//! node holds at most `max_leaf_size` items. Construction lives in
//! `build.rs`; this file holds the layout and the search.
//!
//! # Query
//!
//! All trees are searched together with one priority queue. A node's
//! priority is the smallest signed margin seen on the path from its root,
//! so the queue always expands the region the query is most confidently
//! inside. The traversal order depends only on the query.
//!
//! Distinct items are gathered in that order and cut into tiers of
//! `search_k` items. Each tier is ranked by exact angular distance and the
//! tiers are concatenated, so the first tier is the approximate top
//! `search_k` and a larger `k` only ever appends to a smaller one.
//!
//! # Layout
//!
//! Nodes of all trees share one `Vec`. Children are always stored before
//! their parent, which the loader checks so a crafted blob cannot make the
//! traversal loop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::types::ItemId;

use super::{dot, normalize, unit_angular_distance, VectorIndex};

/// A forest of randomized partitioning trees over unit-normalized vectors.
///
/// Immutable once built. `Forest` is `Send + Sync` and is queried
/// concurrently without locking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forest {
    pub(super) dimension: usize,
    pub(super) item_count: usize,
    pub(super) max_leaf_size: usize,
    /// Seed the trees were grown from (diagnostics only).
    pub(super) seed: u64,
    /// Unit-normalized vectors, `item_count * dimension` values, row-major.
    pub(super) vectors: Vec<f32>,
    pub(super) nodes: Vec<Node>,
    pub(super) roots: Vec<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(super) enum Node {
    Leaf {
        items: Vec<ItemId>,
    },
    /// Items with `dot(normal, v) > 0` went right. A zero normal marks a
    /// random split.
    Split {
        normal: Vec<f32>,
        left: usize,
        right: usize,
    },
}

/// Queue entry for the best-first traversal.
#[derive(Debug)]
struct Frontier {
    priority: f32,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl Forest {
    /// Creates a forest with no items (and no trees).
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            item_count: 0,
            max_leaf_size: 1,
            seed: 0,
            vectors: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Dimension of the indexed vectors.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed items.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.roots.len()
    }

    /// Total node count across all trees.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Seed the forest was built from.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the stored (unit-normalized) vector for an ordinal.
    pub fn item(&self, id: ItemId) -> Option<&[f32]> {
        if id >= self.item_count {
            return None;
        }
        let start = id * self.dimension;
        self.vectors.get(start..start + self.dimension)
    }

    #[inline]
    pub(super) fn row(&self, id: ItemId) -> &[f32] {
        &self.vectors[id * self.dimension..(id + 1) * self.dimension]
    }

    /// Checks that every reference inside the forest is in range.
    ///
    /// Called by the loader on blobs read from disk. Returns a description
    /// of the first problem found.
    pub fn check_structure(&self) -> std::result::Result<(), String> {
        if self.item_count > 0 && self.dimension == 0 {
            return Err("forest holds items but has dimension 0".to_string());
        }
        let expected_len = self
            .item_count
            .checked_mul(self.dimension)
            .ok_or_else(|| "item_count * dimension overflows".to_string())?;
        if self.vectors.len() != expected_len {
            return Err(format!(
                "vector storage holds {} values, expected {} ({} items x {} dims)",
                self.vectors.len(),
                expected_len,
                self.item_count,
                self.dimension
            ));
        }
        if self.item_count > 0 && self.roots.is_empty() {
            return Err("forest holds items but has no trees".to_string());
        }
        for &root in &self.roots {
            if root >= self.nodes.len() {
                return Err(format!("root {} out of range", root));
            }
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { items } => {
                    if let Some(&bad) = items.iter().find(|&&id| id >= self.item_count) {
                        return Err(format!("leaf {} references item {}", idx, bad));
                    }
                }
                Node::Split {
                    normal,
                    left,
                    right,
                } => {
                    if normal.len() != self.dimension {
                        return Err(format!(
                            "split {} has normal of length {}",
                            idx,
                            normal.len()
                        ));
                    }
                    // Children precede parents; this also rules out cycles.
                    if *left >= idx || *right >= idx {
                        return Err(format!("split {} has forward child reference", idx));
                    }
                }
            }
        }
        Ok(())
    }

    /// Candidate budget used when the caller does not set `search_k`.
    ///
    /// Derived from the forest shape only, never from `k`: roughly one
    /// full leaf per tree.
    pub fn default_search_k(&self) -> usize {
        self.n_trees().saturating_mul(self.max_leaf_size).max(1)
    }

    /// Best-first search over all trees with a unit-normalized query.
    pub(super) fn nearest(
        &self,
        query: &[f32],
        k: usize,
        search_k: Option<usize>,
    ) -> Vec<(ItemId, f32)> {
        if self.item_count == 0 || k == 0 {
            return Vec::new();
        }

        let tier = search_k.unwrap_or_else(|| self.default_search_k()).max(1);
        if tier >= self.item_count {
            return self.rank(0..self.item_count, query, k);
        }

        // Whole tiers only, so the ranking of a tier never depends on k.
        let wanted = k.div_ceil(tier).saturating_mul(tier).min(self.item_count);
        let candidates = self.gather(query, wanted);

        let mut ranked = Vec::with_capacity(k.min(candidates.len()));
        for chunk in candidates.chunks(tier) {
            if ranked.len() >= k {
                break;
            }
            ranked.extend(self.rank(chunk.iter().copied(), query, chunk.len()));
        }
        ranked.truncate(k);
        ranked
    }

    /// Collects the first `wanted` distinct items in traversal order.
    fn gather(&self, query: &[f32], wanted: usize) -> Vec<ItemId> {
        let mut queue: BinaryHeap<Frontier> = self
            .roots
            .iter()
            .map(|&node| Frontier {
                priority: f32::INFINITY,
                node,
            })
            .collect();
        let mut seen = vec![false; self.item_count];
        let mut candidates: Vec<ItemId> = Vec::with_capacity(wanted);

        while candidates.len() < wanted {
            let Some(Frontier { priority, node }) = queue.pop() else {
                break;
            };
            match &self.nodes[node] {
                Node::Leaf { items } => {
                    for &id in items {
                        if !seen[id] {
                            seen[id] = true;
                            candidates.push(id);
                        }
                    }
                }
                Node::Split {
                    normal,
                    left,
                    right,
                } => {
                    let margin = dot(normal, query);
                    queue.push(Frontier {
                        priority: priority.min(margin),
                        node: *right,
                    });
                    queue.push(Frontier {
                        priority: priority.min(-margin),
                        node: *left,
                    });
                }
            }
        }

        candidates.truncate(wanted);
        candidates
    }

    /// Exact re-ranking: closest first, ties broken by ordinal.
    fn rank(
        &self,
        ids: impl IntoIterator<Item = ItemId>,
        query: &[f32],
        k: usize,
    ) -> Vec<(ItemId, f32)> {
        let mut scored: Vec<(ItemId, f32)> = ids
            .into_iter()
            .map(|id| (id, unit_angular_distance(self.row(id), query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}

impl VectorIndex for Forest {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.item_count
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        search_k: Option<usize>,
    ) -> Result<Vec<(ItemId, f32)>> {
        if query.len() != self.dimension {
            return Err(ValidationError::dimension_mismatch(self.dimension, query.len()).into());
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(
                ValidationError::invalid_field("query", "contains a non-finite component").into(),
            );
        }
        Ok(self.nearest(&normalize(query), k, search_k))
    }
}
