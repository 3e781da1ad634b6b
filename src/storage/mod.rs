//! Persistence of the index artifact set.
//!
//! One logical index is three co-located files (see [`schema`]): the
//! forest blob, the handle sequence and the dimension record. This module
//! writes them as a unit and reads them back with consistency checks.
//!
//! # Write Protocol
//!
//! ```text
//! lock_exclusive(.index.lock)
//!   write + fsync  *.tmp  (dimension, forest, handles)
//!       └── any failure: remove temps, previous set untouched
//!   rename *.tmp → final (all three)
//!       └── any failure: remove all three finals, no partial set remains
//! unlock
//! ```
//!
//! Readers take a shared lock on the same file, so a reader in another
//! process never observes a build in progress.

pub mod schema;

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument, warn};

use crate::error::{ArtifactError, ArtifactKind, Result, SnapMatchError, ValidationError};
use crate::types::Handle;
use crate::vector::Forest;

use schema::{
    BlobHeader, ForestBlob, ForestBlobRef, HandleBlob, HandleBlobRef, DIMENSION_FILE, FOREST_FILE,
    FOREST_MAGIC, HANDLES_FILE, HANDLES_MAGIC, LOCK_FILE, STAGING_SUFFIX,
};

/// Locations of the three artifacts of one index.
///
/// # Example
///
/// ```rust
/// use snapmatch::storage::ArtifactPaths;
///
/// let paths = ArtifactPaths::in_dir("./data");
/// assert!(paths.forest.ends_with("product_index.forest"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Directory holding all three files (and the lock file).
    pub dir: PathBuf,
    /// Forest blob path.
    pub forest: PathBuf,
    /// Handle sequence path.
    pub handles: PathBuf,
    /// Dimension record path.
    pub dimension: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            dir: dir.to_path_buf(),
            forest: dir.join(FOREST_FILE),
            handles: dir.join(HANDLES_FILE),
            dimension: dir.join(DIMENSION_FILE),
        }
    }

    /// Returns the path of one artifact.
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Forest => &self.forest,
            ArtifactKind::Handles => &self.handles,
            ArtifactKind::Dimension => &self.dimension,
        }
    }

    /// Path of the advisory lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Artifacts that do not exist on disk, in read order.
    pub fn missing(&self) -> Vec<(ArtifactKind, PathBuf)> {
        ArtifactKind::ALL
            .iter()
            .map(|&kind| (kind, self.path(kind)))
            .filter(|(_, path)| !path.exists())
            .map(|(kind, path)| (kind, path.to_path_buf()))
            .collect()
    }

    /// Returns true if all three artifacts exist.
    pub fn all_present(&self) -> bool {
        self.missing().is_empty()
    }

    /// Removes whichever artifacts exist.
    ///
    /// Used to discard a set an operator knows to be corrupt.
    pub fn remove_all(&self) -> Result<()> {
        for kind in ArtifactKind::ALL {
            let path = self.path(kind);
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Writes the full artifact set for `forest` and `handles`.
///
/// # Errors
///
/// - `ValidationError::CountMismatch` if `handles` and the forest disagree
/// - `ArtifactError::Persistence` if any file cannot be written; no partial
///   set is left behind
#[instrument(skip(forest, handles), fields(dir = %paths.dir.display(), items = handles.len()))]
pub fn write_artifacts(paths: &ArtifactPaths, forest: &Forest, handles: &[Handle]) -> Result<()> {
    if handles.len() != forest.item_count() {
        return Err(ValidationError::count_mismatch(forest.item_count(), handles.len()).into());
    }

    fs::create_dir_all(&paths.dir).map_err(|e| ArtifactError::persistence(&paths.dir, e))?;

    // fs2's flock, called by path: std's inherent `File` lock methods
    // would otherwise shadow the trait.
    let lock = open_lock_for_write(paths)?;
    FileExt::lock_exclusive(&lock)
        .map_err(|e| ArtifactError::persistence(paths.lock_path(), e))?;

    let forest_bytes = bincode::serialize(&ForestBlobRef {
        header: BlobHeader::new(FOREST_MAGIC),
        dimension: forest.dimension() as u64,
        forest,
    })
    .map_err(|e| ArtifactError::persistence(&paths.forest, e))?;
    let handle_bytes = bincode::serialize(&HandleBlobRef {
        header: BlobHeader::new(HANDLES_MAGIC),
        handles,
    })
    .map_err(|e| ArtifactError::persistence(&paths.handles, e))?;
    let dimension_bytes = forest.dimension().to_string().into_bytes();

    let staged = [
        (ArtifactKind::Dimension, dimension_bytes),
        (ArtifactKind::Forest, forest_bytes),
        (ArtifactKind::Handles, handle_bytes),
    ];

    for (kind, bytes) in &staged {
        let tmp = staging_path(paths.path(*kind));
        if let Err(e) = write_synced(&tmp, bytes) {
            discard_staged(paths);
            return Err(ArtifactError::persistence(tmp, e).into());
        }
        debug!(artifact = %kind, bytes = bytes.len(), "Staged artifact");
    }

    for (kind, _) in &staged {
        let path = paths.path(*kind);
        if let Err(e) = fs::rename(staging_path(path), path) {
            // A mix of old and new files would load as a valid-looking index.
            warn!(artifact = %kind, error = %e, "Rename failed, removing artifact set");
            discard_staged(paths);
            let _ = paths.remove_all();
            return Err(ArtifactError::persistence(path, e).into());
        }
    }

    if let Ok(dir) = File::open(&paths.dir) {
        let _ = dir.sync_all();
    }

    // Lock is released when `lock` is dropped.
    drop(lock);
    Ok(())
}

/// Reads and cross-checks the artifact set.
///
/// Returns `(dimension, forest, handles)`. Order: dimension record first,
/// then the forest blob (checked against that dimension), then handles.
#[instrument(fields(dir = %paths.dir.display()))]
pub fn read_artifacts(paths: &ArtifactPaths) -> Result<(usize, Forest, Vec<Handle>)> {
    let missing = paths.missing();
    if !missing.is_empty() {
        return Err(ArtifactError::NotFound { missing }.into());
    }

    let _lock = lock_for_read(paths)?;

    let text = read_artifact(paths, ArtifactKind::Dimension, |p| fs::read_to_string(p))?;
    let dimension: usize = text.trim().parse().map_err(|_| {
        ArtifactError::corrupt(format!(
            "dimension record is not a decimal integer: {:?}",
            text.trim()
        ))
    })?;
    if dimension == 0 {
        return Err(ArtifactError::corrupt("dimension record is 0").into());
    }

    let bytes = read_artifact(paths, ArtifactKind::Forest, |p| fs::read(p))?;
    let blob: ForestBlob = bincode::deserialize(&bytes)
        .map_err(|e| ArtifactError::corrupt(format!("forest blob unreadable: {}", e)))?;
    blob.header
        .check(FOREST_MAGIC, "forest blob")
        .map_err(ArtifactError::corrupt)?;
    if blob.dimension != dimension as u64 || blob.forest.dimension() != dimension {
        return Err(ArtifactError::corrupt(format!(
            "forest blob dimension {} disagrees with dimension record {}",
            blob.forest.dimension(),
            dimension
        ))
        .into());
    }
    blob.forest
        .check_structure()
        .map_err(|reason| ArtifactError::corrupt(format!("forest blob inconsistent: {}", reason)))?;
    let forest = blob.forest;

    let bytes = read_artifact(paths, ArtifactKind::Handles, |p| fs::read(p))?;
    let blob: HandleBlob = bincode::deserialize(&bytes)
        .map_err(|e| ArtifactError::corrupt(format!("handle sequence unreadable: {}", e)))?;
    blob.header
        .check(HANDLES_MAGIC, "handle sequence")
        .map_err(ArtifactError::corrupt)?;

    if blob.handles.len() != forest.item_count() {
        return Err(ArtifactError::corrupt(format!(
            "handle sequence has {} entries but forest blob has {} items",
            blob.handles.len(),
            forest.item_count()
        ))
        .into());
    }

    Ok((dimension, forest, blob.handles))
}

/// Reads one artifact, mapping a vanished file to `NotFound`.
fn read_artifact<T>(
    paths: &ArtifactPaths,
    kind: ArtifactKind,
    read: impl FnOnce(&Path) -> io::Result<T>,
) -> Result<T> {
    let path = paths.path(kind);
    read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ArtifactError::NotFound {
                missing: vec![(kind, path.to_path_buf())],
            }
            .into()
        } else {
            SnapMatchError::Io(e)
        }
    })
}

fn open_lock_for_write(paths: &ArtifactPaths) -> Result<File> {
    let path = paths.lock_path();
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|e| ArtifactError::persistence(path, e).into())
}

/// Shared lock if the lock file exists. Artifact sets copied in by hand
/// have none, and a read-only deployment must still load them.
fn lock_for_read(paths: &ArtifactPaths) -> Result<Option<File>> {
    let file = match File::open(paths.lock_path()) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    FileExt::lock_shared(&file)?;
    Ok(Some(file))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn discard_staged(paths: &ArtifactPaths) {
    for kind in ArtifactKind::ALL {
        let _ = fs::remove_file(staging_path(paths.path(kind)));
    }
}
