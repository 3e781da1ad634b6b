//! Error types for SnapMatch.
//!
//! SnapMatch uses a hierarchical error system:
//! - `SnapMatchError` is the top-level error returned by all public APIs
//! - Specific error types (`ValidationError`, `ArtifactError`) provide detail
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use snapmatch::{index, storage::ArtifactPaths, Result};
//!
//! fn example() -> Result<()> {
//!     let index = index::load(&ArtifactPaths::in_dir("./data"))?;
//!     let handles = index.search(&query, 50)?;
//!     Ok(())
//! }
//! ```
//!
//! # Service Boundary
//!
//! A request layer should map errors for which
//! [`SnapMatchError::is_service_unavailable`] is true to a "not ready"
//! response. An empty result list is a normal success, not an error.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for SnapMatch operations.
pub type Result<T> = std::result::Result<T, SnapMatchError>;

/// Top-level error enum for all SnapMatch operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum SnapMatchError {
    /// Input validation error (empty input, dimension mismatch, ...).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persisted index artifacts are missing, corrupt, or could not be written.
    #[error("Index artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Search attempted before any index was successfully loaded or built.
    #[error("Index not ready: no index has been loaded or built yet")]
    IndexNotReady,

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Product catalog could not be read or parsed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Embedding generation error (external collaborator).
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapMatchError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates a catalog error with the given message.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Creates an embedding error with the given message.
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the input was empty.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::EmptyInput))
    }

    /// Returns true if a vector length disagreed with the expected dimension.
    ///
    /// Covers both a mismatched query/build vector and an index that is
    /// stale relative to the configured feature extractor.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(
            self,
            Self::Validation(
                ValidationError::DimensionMismatch { .. } | ValidationError::StaleIndex { .. }
            )
        )
    }

    /// Returns true if one or more artifacts were missing.
    pub fn is_artifacts_not_found(&self) -> bool {
        matches!(self, Self::Artifact(ArtifactError::NotFound { .. }))
    }

    /// Returns true if the artifacts were present but inconsistent.
    pub fn is_artifacts_corrupt(&self) -> bool {
        matches!(self, Self::Artifact(ArtifactError::Corrupt { .. }))
    }

    /// Returns true if writing the artifact set failed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Artifact(ArtifactError::Persistence { .. }))
    }

    /// Returns true if no index is loaded yet.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::IndexNotReady)
    }

    /// Returns true if a search request hitting this error should be
    /// answered with "service unavailable" rather than "no results".
    pub fn is_service_unavailable(&self) -> bool {
        self.is_not_ready() || self.is_dimension_mismatch()
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Build called with zero vectors.
    #[error("No feature vectors provided to build the index")]
    EmptyInput,

    /// A vector's length doesn't match the declared or loaded dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension (declared at build, or the loaded index's).
        expected: usize,
        /// Actual vector length provided.
        got: usize,
    },

    /// Different number of vectors and handles passed to build.
    #[error("Count mismatch: {vectors} vectors but {handles} handles")]
    CountMismatch {
        /// Number of vectors.
        vectors: usize,
        /// Number of handles.
        handles: usize,
    },

    /// The loaded index was built with a different embedding model than
    /// the one currently configured.
    #[error(
        "Index dimension {index} does not match feature extractor dimension {extractor}; \
         rebuild the index with the current extractor"
    )]
    StaleIndex {
        /// Dimension recorded in the index artifacts.
        index: usize,
        /// Dimension produced by the configured extractor.
        extractor: usize,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Creates a count mismatch error.
    pub fn count_mismatch(vectors: usize, handles: usize) -> Self {
        Self::CountMismatch { vectors, handles }
    }

    /// Creates a stale index error.
    pub fn stale_index(index: usize, extractor: usize) -> Self {
        Self::StaleIndex { index, extractor }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The three files that make up one persisted index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Serialized tree forest.
    Forest,
    /// Ordered handle sequence.
    Handles,
    /// Decimal dimension record.
    Dimension,
}

impl ArtifactKind {
    /// All kinds, in the order the loader reads them.
    pub const ALL: [ArtifactKind; 3] = [Self::Dimension, Self::Forest, Self::Handles];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Forest => "forest blob",
            Self::Handles => "handle sequence",
            Self::Dimension => "dimension record",
        };
        f.write_str(name)
    }
}

/// Errors from reading or writing the index artifact set.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// One or more artifact files are absent. The index needs an initial build.
    #[error("Index artifacts not found ({}); build the index first", format_missing(.missing))]
    NotFound {
        /// The missing artifacts with their expected paths.
        missing: Vec<(ArtifactKind, PathBuf)>,
    },

    /// Files are present but unreadable or mutually inconsistent.
    /// The index must be rebuilt; retrying will not help.
    #[error("Index artifacts corrupt: {reason}; delete the artifacts and rebuild")]
    Corrupt {
        /// What was inconsistent.
        reason: String,
    },

    /// Writing the artifact set failed. Any partial output is untrustworthy
    /// and the build must be repeated in full.
    #[error("Failed to persist index artifact {}: {reason}", .path.display())]
    Persistence {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
}

impl ArtifactError {
    /// Creates a corruption error with the given reason.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    /// Creates a persistence error for the given path.
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the kinds of the missing artifacts, if this is a not-found error.
    pub fn missing_kinds(&self) -> Vec<ArtifactKind> {
        match self {
            Self::NotFound { missing } => missing.iter().map(|(kind, _)| *kind).collect(),
            _ => Vec::new(),
        }
    }
}

fn format_missing(missing: &[(ArtifactKind, PathBuf)]) -> String {
    missing
        .iter()
        .map(|(kind, path)| format!("{} at {}", kind, path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
