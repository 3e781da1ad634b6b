//! On-disk layout of the index artifact set.
//!
//! # File Layout
//!
//! ```text
//! <index_dir>/
//!   product_index.forest   bincode ForestBlob   (magic "SMFT")
//!   handles.bin            bincode HandleBlob   (magic "SMHD")
//!   feature_dimension.txt  UTF-8 decimal integer
//!   .index.lock            advisory lock (fs2), empty
//! ```
//!
//! The dimension record is plain text so operators can inspect it and so
//! the forest blob can be opened without guessing its dimension.

use serde::{Deserialize, Serialize};

use crate::types::Handle;
use crate::vector::Forest;

/// Current artifact format version.
///
/// Increment when the blob layout changes. Blobs with any other version
/// are reported as corrupt and must be rebuilt.
pub const FORMAT_VERSION: u32 = 1;

/// Magic bytes at the start of the forest blob.
pub const FOREST_MAGIC: [u8; 4] = *b"SMFT";

/// Magic bytes at the start of the handle sequence.
pub const HANDLES_MAGIC: [u8; 4] = *b"SMHD";

/// Forest blob file name.
pub const FOREST_FILE: &str = "product_index.forest";

/// Handle sequence file name.
pub const HANDLES_FILE: &str = "handles.bin";

/// Dimension record file name.
pub const DIMENSION_FILE: &str = "feature_dimension.txt";

/// Advisory lock file name.
pub const LOCK_FILE: &str = ".index.lock";

/// Suffix for staged writes, renamed into place once all three are written.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Header shared by both binary artifacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHeader {
    /// File-type magic.
    pub magic: [u8; 4],
    /// Layout version, see [`FORMAT_VERSION`].
    pub format_version: u32,
}

impl BlobHeader {
    pub(crate) fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            format_version: FORMAT_VERSION,
        }
    }

    /// Checks magic and version, returning a description on mismatch.
    pub(crate) fn check(&self, magic: [u8; 4], what: &str) -> Result<(), String> {
        if self.magic != magic {
            return Err(format!(
                "{} has wrong magic {:?} (expected {:?})",
                what, self.magic, magic
            ));
        }
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "{} has format version {} (expected {})",
                what, self.format_version, FORMAT_VERSION
            ));
        }
        Ok(())
    }
}

/// Forest blob as written. Borrows the forest to avoid a copy.
#[derive(Serialize)]
pub(crate) struct ForestBlobRef<'a> {
    pub(crate) header: BlobHeader,
    pub(crate) dimension: u64,
    pub(crate) forest: &'a Forest,
}

/// Forest blob as read.
#[derive(Deserialize)]
pub(crate) struct ForestBlob {
    pub(crate) header: BlobHeader,
    pub(crate) dimension: u64,
    pub(crate) forest: Forest,
}

/// Handle sequence as written.
#[derive(Serialize)]
pub(crate) struct HandleBlobRef<'a> {
    pub(crate) header: BlobHeader,
    pub(crate) handles: &'a [Handle],
}

/// Handle sequence as read.
#[derive(Deserialize)]
pub(crate) struct HandleBlob {
    pub(crate) header: BlobHeader,
    pub(crate) handles: Vec<Handle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_check() {
        let header = BlobHeader::new(FOREST_MAGIC);
        assert!(header.check(FOREST_MAGIC, "forest blob").is_ok());
        assert!(header.check(HANDLES_MAGIC, "handle sequence").is_err());

        let old = BlobHeader {
            magic: FOREST_MAGIC,
            format_version: FORMAT_VERSION + 1,
        };
        let err = old.check(FOREST_MAGIC, "forest blob").unwrap_err();
        assert!(err.contains("format version"));
    }

    #[test]
    fn test_handle_blob_ref_decodes_as_owned() {
        let handles = vec![Handle::from("a"), Handle::from("b")];
        let bytes = bincode::serialize(&HandleBlobRef {
            header: BlobHeader::new(HANDLES_MAGIC),
            handles: &handles,
        })
        .unwrap();
        let blob: HandleBlob = bincode::deserialize(&bytes).unwrap();
        assert_eq!(blob.handles, handles);
        assert_eq!(blob.header, BlobHeader::new(HANDLES_MAGIC));
    }
}
