//! Forest construction.
//!
//! Trees are independent, so they are grown in parallel with rayon. Each
//! tree gets its own `StdRng` derived from the forest seed, which keeps a
//! seeded build reproducible regardless of thread scheduling.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::config::ForestConfig;
use crate::error::{Result, ValidationError};
use crate::types::{Embedding, ItemId};

use super::forest::{Forest, Node};
use super::{angular_distance, dot, normalize};

/// Samples drawn by each two-means run.
const TWO_MEANS_ITERATIONS: usize = 200;

/// Two-means attempts before falling back to a random split.
const SPLIT_ATTEMPTS: usize = 3;

/// A split sending more than this share of items to one side is retried.
const MAX_SPLIT_SHARE: f64 = 0.95;

/// Golden-ratio increment, spreads per-tree seeds apart.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

impl Forest {
    /// Builds a forest over `vectors`, assigning ordinal `i` to `vectors[i]`.
    ///
    /// An empty input produces an empty forest. Callers that must reject
    /// empty input (such as [`crate::index::build`]) check before calling.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidField` if `dimension` is 0, the config is
    ///   invalid, or a vector has a NaN/infinite component
    /// - `ValidationError::DimensionMismatch` if any vector's length is not
    ///   `dimension`
    #[instrument(skip(vectors, config), fields(items = vectors.len(), n_trees = config.n_trees))]
    pub fn build(dimension: usize, vectors: &[Embedding], config: &ForestConfig) -> Result<Self> {
        config.validate()?;
        if dimension == 0 {
            return Err(ValidationError::invalid_field("dimension", "must be greater than 0").into());
        }
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dimension {
                return Err(ValidationError::dimension_mismatch(dimension, v.len()).into());
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(ValidationError::invalid_field(
                    format!("vectors[{}]", i),
                    "contains a non-finite component",
                )
                .into());
            }
        }

        if vectors.is_empty() {
            return Ok(Self::empty(dimension));
        }

        let item_count = vectors.len();
        let mut flat = Vec::with_capacity(item_count * dimension);
        for v in vectors {
            flat.extend(normalize(v));
        }

        let seed = config.seed.unwrap_or_else(rand::random);

        let trees: Vec<(Vec<Node>, usize)> = (0..config.n_trees)
            .into_par_iter()
            .map(|tree| {
                let tree_seed = seed.wrapping_add((tree as u64).wrapping_mul(SEED_STRIDE));
                let rng = StdRng::seed_from_u64(tree_seed);
                let mut grower = TreeGrower {
                    vectors: &flat,
                    dimension,
                    max_leaf_size: config.max_leaf_size,
                    rng,
                    nodes: Vec::new(),
                };
                let root = grower.grow((0..item_count).collect());
                (grower.nodes, root)
            })
            .collect();

        let mut nodes = Vec::with_capacity(trees.iter().map(|(n, _)| n.len()).sum());
        let mut roots = Vec::with_capacity(trees.len());
        for (tree_nodes, root) in trees {
            let offset = nodes.len();
            roots.push(offset + root);
            nodes.extend(tree_nodes.into_iter().map(|node| match node {
                Node::Split {
                    normal,
                    left,
                    right,
                } => Node::Split {
                    normal,
                    left: left + offset,
                    right: right + offset,
                },
                leaf => leaf,
            }));
        }

        debug!(nodes = nodes.len(), seed, "Forest built");

        Ok(Self {
            dimension,
            item_count,
            max_leaf_size: config.max_leaf_size,
            seed,
            vectors: flat,
            nodes,
            roots,
        })
    }
}

/// Grows one tree into a local node list.
struct TreeGrower<'a> {
    vectors: &'a [f32],
    dimension: usize,
    max_leaf_size: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl<'a> TreeGrower<'a> {
    #[inline]
    fn row(&self, id: ItemId) -> &'a [f32] {
        let vectors: &'a [f32] = self.vectors;
        &vectors[id * self.dimension..(id + 1) * self.dimension]
    }

    /// Grows the subtree over `items` and returns its node index.
    /// Children are pushed before their parent.
    fn grow(&mut self, items: Vec<ItemId>) -> usize {
        if items.len() <= self.max_leaf_size {
            self.nodes.push(Node::Leaf { items });
            return self.nodes.len() - 1;
        }

        let (normal, left_items, right_items) = self.split(&items);
        let left = self.grow(left_items);
        let right = self.grow(right_items);
        self.nodes.push(Node::Split {
            normal,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    /// Returns `(normal, left, right)`. Both sides are non-empty.
    fn split(&mut self, items: &[ItemId]) -> (Vec<f32>, Vec<ItemId>, Vec<ItemId>) {
        for _ in 0..SPLIT_ATTEMPTS {
            let Some(normal) = self.two_means_normal(items) else {
                continue;
            };

            let mut left = Vec::new();
            let mut right = Vec::new();
            for &id in items {
                let margin = dot(&normal, self.row(id));
                let goes_right = if margin == 0.0 {
                    self.rng.gen::<bool>()
                } else {
                    margin > 0.0
                };
                if goes_right {
                    right.push(id);
                } else {
                    left.push(id);
                }
            }

            let larger = left.len().max(right.len()) as f64;
            if larger / items.len() as f64 <= MAX_SPLIT_SHARE {
                return (normal, left, right);
            }
        }

        // Duplicates or degenerate data: split at random so recursion still halves.
        let mut shuffled = items.to_vec();
        shuffled.shuffle(&mut self.rng);
        let right = shuffled.split_off(shuffled.len() / 2);
        (vec![0.0; self.dimension], shuffled, right)
    }

    /// Runs two-means on random samples and returns the unit hyperplane
    /// normal separating the two centroids, or `None` if they coincide.
    fn two_means_normal(&mut self, items: &[ItemId]) -> Option<Vec<f32>> {
        let n = items.len();
        let i = self.rng.gen_range(0..n);
        let mut j = self.rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }

        let mut p = self.row(items[i]).to_vec();
        let mut q = self.row(items[j]).to_vec();
        let mut p_count = 1.0f32;
        let mut q_count = 1.0f32;

        for _ in 0..TWO_MEANS_ITERATIONS {
            let k = items[self.rng.gen_range(0..n)];
            let v = self.row(k);
            let dp = p_count * angular_distance(&p, v);
            let dq = q_count * angular_distance(&q, v);
            if dp < dq {
                for (c, x) in p.iter_mut().zip(v) {
                    *c = (*c * p_count + x) / (p_count + 1.0);
                }
                p_count += 1.0;
            } else if dq < dp {
                for (c, x) in q.iter_mut().zip(v) {
                    *c = (*c * q_count + x) / (q_count + 1.0);
                }
                q_count += 1.0;
            }
        }

        let p = normalize(&p);
        let q = normalize(&q);
        let diff: Vec<f32> = p.iter().zip(&q).map(|(a, b)| a - b).collect();
        if dot(&diff, &diff) <= f32::EPSILON {
            return None;
        }
        Some(normalize(&diff))
    }
}
