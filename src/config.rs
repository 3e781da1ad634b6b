//! Configuration types for SnapMatch.
//!
//! The [`Config`] struct controls:
//! - Where the index artifact set lives
//! - Forest construction (tree count, leaf size, seed)
//! - The two-stage retrieval sizes (candidate overfetch, display count)
//! - The extractor dimension used to detect a stale index
//!
//! # Example
//! ```rust
//! use snapmatch::{Config, ForestConfig};
//!
//! // Use defaults (100 trees, 50 candidates, 10 displayed)
//! let config = Config::default();
//!
//! // Faster, lower-recall builds for development
//! let config = Config {
//!     forest: ForestConfig {
//!         n_trees: 10,
//!         ..Default::default()
//!     },
//!     expected_dimension: Some(1280),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound accepted for `expected_dimension`.
pub const MAX_DIMENSION: usize = 65_536;

/// Service configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use snapmatch::Config;
///
/// let config = Config {
///     index_dir: "/var/lib/snapmatch".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the three index artifacts.
    pub index_dir: PathBuf,

    /// Forest construction parameters.
    pub forest: ForestConfig,

    /// Retrieval sizes and the query-time candidate budget.
    pub search: SearchConfig,

    /// Output dimension of the configured feature extractor.
    ///
    /// When set, an index whose dimension differs is rejected at load and
    /// rebuild time so a stale index never serves traffic. `None` skips
    /// the check.
    pub expected_dimension: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data"),
            forest: ForestConfig::default(),
            search: SearchConfig::default(),
            expected_dimension: None,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config rooted at the given artifact directory.
    pub fn with_index_dir(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `SearchContext::new()`.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `forest.n_trees` or `forest.max_leaf_size` is 0
    /// - `search.candidate_count` or `search.display_limit` is 0
    /// - `search.candidate_count` is smaller than `search.display_limit`
    /// - `search.search_k` is `Some(0)`
    /// - `expected_dimension` is `Some(0)` or exceeds [`MAX_DIMENSION`]
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.forest.validate()?;
        self.search.validate()?;

        if let Some(dim) = self.expected_dimension {
            if dim == 0 {
                return Err(ValidationError::invalid_field(
                    "expected_dimension",
                    "must be greater than 0",
                ));
            }
            if dim > MAX_DIMENSION {
                return Err(ValidationError::invalid_field(
                    "expected_dimension",
                    format!("must not exceed {}", MAX_DIMENSION),
                ));
            }
        }

        Ok(())
    }
}

/// Forest construction parameters.
///
/// More trees give better recall at the cost of build time, blob size and
/// query time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of randomized trees. Default: 100
    pub n_trees: usize,

    /// A node holding at most this many items becomes a leaf. Default: 64
    pub max_leaf_size: usize,

    /// Seed for split selection. `None` draws a fresh seed per build.
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_leaf_size: 64,
            seed: None,
        }
    }
}

impl ForestConfig {
    /// Validates the forest parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.n_trees == 0 {
            return Err(ValidationError::invalid_field(
                "forest.n_trees",
                "must be greater than 0",
            ));
        }
        if self.max_leaf_size == 0 {
            return Err(ValidationError::invalid_field(
                "forest.max_leaf_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Two-stage retrieval sizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidates fetched from the index before metadata filtering. Default: 50
    pub candidate_count: usize,

    /// Maximum records returned after filtering. Default: 10
    pub display_limit: usize,

    /// Items gathered from the forest per exactly ranked tier.
    ///
    /// `None` uses `n_trees * max_leaf_size` of the loaded forest. Indexes
    /// no larger than the budget are searched exhaustively.
    pub search_k: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_count: 50,
            display_limit: 10,
            search_k: None,
        }
    }
}

impl SearchConfig {
    /// Validates the retrieval sizes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.candidate_count == 0 {
            return Err(ValidationError::invalid_field(
                "search.candidate_count",
                "must be greater than 0",
            ));
        }
        if self.display_limit == 0 {
            return Err(ValidationError::invalid_field(
                "search.display_limit",
                "must be greater than 0",
            ));
        }
        if self.candidate_count < self.display_limit {
            return Err(ValidationError::invalid_field(
                "search.candidate_count",
                format!(
                    "must be at least display_limit ({}), got {}",
                    self.display_limit, self.candidate_count
                ),
            ));
        }
        if self.search_k == Some(0) {
            return Err(ValidationError::invalid_field(
                "search.search_k",
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}
