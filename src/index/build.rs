//! Batch index construction.

use tracing::{info, instrument};

use crate::config::ForestConfig;
use crate::error::{Result, ValidationError};
use crate::storage::{write_artifacts, ArtifactPaths};
use crate::types::{Embedding, Handle};
use crate::vector::Forest;

use super::LoadedIndex;

/// Builds a forest over `vectors`, persists the artifact set to `paths`
/// and returns the in-memory index.
///
/// `vectors[i]` is stored under ordinal `i` and answers to `handles[i]`.
/// Input order is kept as given; duplicates are indexed as separate items.
///
/// # Errors
///
/// - `ValidationError::EmptyInput` if `vectors` is empty
/// - `ValidationError::CountMismatch` if `vectors` and `handles` differ in length
/// - `ValidationError::DimensionMismatch` if any vector's length is not `dimension`
/// - `ArtifactError::Persistence` if writing the artifact set fails; no
///   partial set is left behind
#[instrument(
    skip(vectors, handles, config),
    fields(items = vectors.len(), dir = %paths.dir.display())
)]
pub fn build(
    vectors: &[Embedding],
    handles: &[Handle],
    dimension: usize,
    config: &ForestConfig,
    paths: &ArtifactPaths,
) -> Result<LoadedIndex> {
    if vectors.is_empty() {
        return Err(ValidationError::EmptyInput.into());
    }
    if vectors.len() != handles.len() {
        return Err(ValidationError::count_mismatch(vectors.len(), handles.len()).into());
    }

    let forest = Forest::build(dimension, vectors, config)?;
    write_artifacts(paths, &forest, handles)?;

    info!(
        items = forest.item_count(),
        dimension,
        n_trees = forest.n_trees(),
        "Index built and persisted"
    );

    Ok(LoadedIndex::from_parts(dimension, forest, handles.to_vec()))
}
