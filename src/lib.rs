//! # SnapMatch
//!
//! Visual product search core: find catalog products that look like a
//! query image.
//!
//! SnapMatch indexes one feature vector per product in a forest of
//! randomized projection trees (angular distance), persists the index as a
//! small artifact set, and answers queries in two stages: over-fetch
//! similar products from the index, then filter them by catalog metadata
//! and keep the top few for display.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use snapmatch::{Catalog, Config, SearchContext, SearchFilter};
//!
//! // Load product metadata and open the context (loads ./data if built)
//! let catalog = Catalog::from_json_file("data/products_cleaned.json")?;
//! let ctx = SearchContext::open(Config::default(), catalog)?;
//!
//! // (Re)build from fresh embeddings, one per product handle
//! ctx.rebuild(&vectors, &handles, 1280)?;
//!
//! // Search with a query embedding, keeping only one vendor
//! let filter = SearchFilter::default().with_vendor("Acme");
//! let results = ctx.search(&query_embedding, &filter)?;
//! for product in &results.matches {
//!     println!("{} {:?}", product.handle, product.title);
//! }
//! ```
//!
//! ## Key Concepts
//!
//! ### Handle
//!
//! A **handle** is the catalog-unique product id. It is the only thing the
//! index stores about a product; everything else comes from the
//! [`Catalog`].
//!
//! ### Artifact Set
//!
//! A built index is three files in one directory: the forest blob, the
//! handle sequence and the dimension record. They are written together and
//! checked against each other on load (see [`storage`]).
//!
//! ### Stale Index
//!
//! An index built with one feature extractor cannot answer queries from
//! another. Set [`Config::expected_dimension`] so a mismatched index is
//! rejected with an instruction to rebuild.
//!
//! ## Thread Safety
//!
//! [`LoadedIndex`], [`Catalog`] and [`SearchContext`] are `Send + Sync`.
//! Searches never block on I/O; reloads swap in a new index atomically.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod context;
mod error;
mod types;

pub mod catalog;
pub mod embedding;
pub mod index;
pub mod search;
pub mod storage;

/// Vector index module: randomized projection forest with angular distance.
pub mod vector;

// ============================================================================
// Public API re-exports
// ============================================================================

// Application context
pub use context::{IndexState, IndexStatus, SearchContext, SearchResults};

// Configuration
pub use config::{Config, ForestConfig, SearchConfig, MAX_DIMENSION};

// Error handling
pub use error::{ArtifactError, ArtifactKind, Result, SnapMatchError, ValidationError};

// Core types
pub use types::{Embedding, Handle, ItemId};

// Index
pub use index::LoadedIndex;

// Catalog and filtering
pub use catalog::{Catalog, FilterOptions, ProductRecord};
pub use search::{filter_and_page, SearchFilter, ALL_SENTINEL};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common SnapMatch usage.
///
/// ```rust
/// use snapmatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::catalog::{Catalog, ProductRecord};
    pub use crate::config::Config;
    pub use crate::context::{SearchContext, SearchResults};
    pub use crate::embedding::ImageEmbedder;
    pub use crate::error::{Result, SnapMatchError};
    pub use crate::search::SearchFilter;
    pub use crate::types::{Embedding, Handle};
}
