//! Loading a persisted artifact set.

use tracing::{info, instrument};

use crate::error::Result;
use crate::storage::{read_artifacts, ArtifactPaths};

use super::LoadedIndex;

/// Loads the artifact set at `paths` into memory.
///
/// Only internal consistency is checked here. Whether the index matches
/// the feature extractor in use is the caller's concern (see
/// [`crate::SearchContext`]).
///
/// # Errors
///
/// - `ArtifactError::NotFound` naming every absent file
/// - `ArtifactError::Corrupt` if a file is unreadable, the dimension record
///   does not parse, the forest disagrees with it, or the handle count
///   differs from the forest's item count
#[instrument(fields(dir = %paths.dir.display()))]
pub fn load(paths: &ArtifactPaths) -> Result<LoadedIndex> {
    let (dimension, forest, handles) = read_artifacts(paths)?;

    info!(
        items = handles.len(),
        dimension,
        n_trees = forest.n_trees(),
        "Index loaded"
    );

    Ok(LoadedIndex::from_parts(dimension, forest, handles))
}
