//! Application context: configuration, catalog and the index slot.
//!
//! The [`SearchContext`] is the object a request layer holds. It owns the
//! product catalog and an atomically swappable index slot, and runs the
//! two-stage query (over-fetch from the index, then filter and page by
//! catalog metadata).
//!
//! # Lifecycle
//!
//! ```text
//!            open() ──load ok──▶ Loaded(index)
//!              │                    │  ▲
//!         load failed               │  │ load_index() / rebuild() succeed
//!              ▼                    ▼  │
//!          Unloaded ──────────────▶ (swap in new snapshot)
//! ```
//!
//! There is no transition back to `Unloaded`: a failed reload or rebuild
//! leaves the previous index serving.
//!
//! # Thread Safety
//!
//! `SearchContext` is `Send + Sync`. Searches take a snapshot `Arc` of the
//! current index, so a concurrent reload never changes the index under an
//! in-flight query.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use snapmatch::{Catalog, Config, SearchContext, SearchFilter};
//!
//! let catalog = Catalog::from_json_file("data/products_cleaned.json")?;
//! let ctx = Arc::new(SearchContext::open(Config::default(), catalog)?);
//!
//! let worker = Arc::clone(&ctx);
//! std::thread::spawn(move || {
//!     let results = worker.search(&query, &SearchFilter::default());
//! });
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{Catalog, FilterOptions, ProductRecord};
use crate::config::Config;
use crate::embedding::ImageEmbedder;
use crate::error::{ArtifactError, Result, SnapMatchError, ValidationError};
use crate::index::{self, LoadedIndex};
use crate::search::{filter_and_page, SearchFilter};
use crate::storage::ArtifactPaths;
use crate::types::{Embedding, Handle};

/// Contents of the index slot.
#[derive(Debug)]
pub enum IndexState {
    /// No index has been loaded or built yet. Searches fail with
    /// `SnapMatchError::IndexNotReady`.
    Unloaded,
    /// An index is serving queries.
    Loaded(Arc<LoadedIndex>),
}

/// Summary of the index slot for health checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexStatus {
    /// Nothing loaded.
    Unloaded,
    /// An index is serving.
    Loaded {
        /// Query vector length.
        dimension: usize,
        /// Indexed item count.
        items: usize,
    },
}

impl IndexStatus {
    /// Returns true if an index is serving.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Outcome of a two-stage search.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Records that passed the filter, most similar first.
    pub matches: Vec<ProductRecord>,
    /// How many candidates the index returned before filtering.
    pub candidates: usize,
}

/// Owns the catalog and the index slot and answers search requests.
pub struct SearchContext {
    config: Config,
    paths: ArtifactPaths,
    catalog: Arc<Catalog>,
    state: ArcSwap<IndexState>,
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("config", &self.config)
            .field("catalog_len", &self.catalog.len())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SearchContext {
    /// Creates a context with an empty index slot.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid (see
    /// [`Config::validate`]).
    pub fn new(config: Config, catalog: Catalog) -> Result<Self> {
        config.validate().map_err(SnapMatchError::from)?;
        let paths = ArtifactPaths::in_dir(&config.index_dir);
        Ok(Self {
            config,
            paths,
            catalog: Arc::new(catalog),
            state: ArcSwap::from_pointee(IndexState::Unloaded),
        })
    }

    /// Creates a context and tries to load the index from
    /// `config.index_dir`.
    ///
    /// A missing, corrupt or stale index does not fail startup: the
    /// context stays `Unloaded` and the reason is logged, so the service
    /// can come up and be fixed by a rebuild.
    ///
    /// # Errors
    ///
    /// Only configuration errors are returned.
    #[instrument(skip(config, catalog), fields(dir = %config.index_dir.display()))]
    pub fn open(config: Config, catalog: Catalog) -> Result<Self> {
        let ctx = Self::new(config, catalog)?;

        match ctx.load_index() {
            Ok(index) => info!(
                items = index.len(),
                dimension = index.dimension(),
                "Search context ready"
            ),
            Err(e) if e.is_artifacts_not_found() => {
                warn!(error = %e, "Index not available; build the index before serving searches")
            }
            Err(e) if e.is_artifacts_corrupt() => {
                error!(error = %e, "Index artifacts are corrupt; delete them and rebuild")
            }
            Err(e) if e.is_dimension_mismatch() => {
                warn!(error = %e, "Index does not match the feature extractor; rebuild it")
            }
            Err(e) => error!(error = %e, "Failed to load index"),
        }

        Ok(ctx)
    }

    /// Loads the artifact set from disk and publishes it.
    ///
    /// On failure the current index (if any) keeps serving.
    ///
    /// # Errors
    ///
    /// - Any error from [`index::load`]
    /// - `ValidationError::StaleIndex` if `config.expected_dimension` is set
    ///   and differs from the loaded dimension
    #[instrument(skip(self))]
    pub fn load_index(&self) -> Result<Arc<LoadedIndex>> {
        let loaded = index::load(&self.paths)?;
        self.publish(loaded)
    }

    /// Rebuilds the index from fresh vectors, persists it, verifies the
    /// persisted set by loading it back, and publishes it.
    ///
    /// The previous index serves until the new one is published. When
    /// `config.expected_dimension` is set and `dimension` differs, nothing
    /// is written.
    ///
    /// # Errors
    ///
    /// - `ValidationError::StaleIndex` for a dimension the extractor does
    ///   not produce
    /// - Any error from [`index::build`] or [`index::load`]
    #[instrument(skip(self, vectors, handles), fields(items = vectors.len()))]
    pub fn rebuild(
        &self,
        vectors: &[Embedding],
        handles: &[Handle],
        dimension: usize,
    ) -> Result<Arc<LoadedIndex>> {
        self.check_extractor_dimension(dimension)?;

        let built = index::build(vectors, handles, dimension, &self.config.forest, &self.paths)?;
        let reloaded = index::load(&self.paths)?;
        if reloaded.len() != built.len() || reloaded.dimension() != built.dimension() {
            return Err(ArtifactError::corrupt(format!(
                "persisted index has {} items of dimension {}, built {} of dimension {}",
                reloaded.len(),
                reloaded.dimension(),
                built.len(),
                built.dimension()
            ))
            .into());
        }

        self.publish(reloaded)
    }

    /// Checks the index against the extractor and swaps it into the slot.
    fn publish(&self, index: LoadedIndex) -> Result<Arc<LoadedIndex>> {
        self.check_extractor_dimension(index.dimension())?;

        let index = Arc::new(index.with_search_k(self.config.search.search_k));
        self.state
            .store(Arc::new(IndexState::Loaded(Arc::clone(&index))));
        info!(
            items = index.len(),
            dimension = index.dimension(),
            "Index published"
        );
        Ok(index)
    }

    fn check_extractor_dimension(&self, dimension: usize) -> Result<()> {
        match self.config.expected_dimension {
            Some(expected) if expected != dimension => {
                warn!(index = dimension, extractor = expected, "Rejecting stale index");
                Err(ValidationError::stale_index(dimension, expected).into())
            }
            _ => Ok(()),
        }
    }

    /// Current state of the index slot.
    pub fn status(&self) -> IndexStatus {
        match &**self.state.load() {
            IndexState::Unloaded => IndexStatus::Unloaded,
            IndexState::Loaded(index) => IndexStatus::Loaded {
                dimension: index.dimension(),
                items: index.len(),
            },
        }
    }

    /// Returns true if an index is serving.
    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    /// Snapshot of the serving index.
    ///
    /// # Errors
    ///
    /// `SnapMatchError::IndexNotReady` while `Unloaded`.
    pub fn index(&self) -> Result<Arc<LoadedIndex>> {
        match &**self.state.load() {
            IndexState::Unloaded => Err(SnapMatchError::IndexNotReady),
            IndexState::Loaded(index) => Ok(Arc::clone(index)),
        }
    }

    /// Two-stage search with a precomputed query vector.
    ///
    /// Retrieves `config.search.candidate_count` candidates, then filters
    /// and truncates to `config.search.display_limit`. An empty result is
    /// a success.
    ///
    /// # Errors
    ///
    /// - `SnapMatchError::IndexNotReady` while `Unloaded`
    /// - `ValidationError::DimensionMismatch` for a wrong-length query
    pub fn search(&self, query: &[f32], filter: &SearchFilter) -> Result<SearchResults> {
        let index = self.index()?;
        self.search_in(&index, query, filter)
    }

    /// Two-stage search starting from image bytes.
    ///
    /// # Errors
    ///
    /// - `SnapMatchError::IndexNotReady` while `Unloaded`
    /// - `ValidationError::StaleIndex` if the embedder's dimension differs
    ///   from the index's; the image is not embedded in that case
    /// - `SnapMatchError::Embedding` from the embedder
    pub fn search_image(
        &self,
        embedder: &dyn ImageEmbedder,
        image: &[u8],
        filter: &SearchFilter,
    ) -> Result<SearchResults> {
        let index = self.index()?;
        if embedder.dimension() != index.dimension() {
            warn!(
                index = index.dimension(),
                extractor = embedder.dimension(),
                "Feature extractor does not match the loaded index"
            );
            return Err(ValidationError::stale_index(index.dimension(), embedder.dimension()).into());
        }

        let query = embedder.embed(image)?;
        embedder.validate_embedding(&query)?;
        self.search_in(&index, &query, filter)
    }

    fn search_in(
        &self,
        index: &LoadedIndex,
        query: &[f32],
        filter: &SearchFilter,
    ) -> Result<SearchResults> {
        let candidates = index.search(query, self.config.search.candidate_count)?;
        let matches: Vec<ProductRecord> = filter_and_page(
            &candidates,
            &self.catalog,
            filter,
            self.config.search.display_limit,
        )
        .into_iter()
        .cloned()
        .collect();

        debug!(
            candidates = candidates.len(),
            matches = matches.len(),
            "Search complete"
        );

        Ok(SearchResults {
            matches,
            candidates: candidates.len(),
        })
    }

    /// The product catalog.
    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Distinct filter values from the catalog.
    pub fn filter_options(&self) -> FilterOptions {
        self.catalog.filter_options()
    }

    /// The configuration this context was created with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where the artifact set is read from and written to.
    #[inline]
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;
    use crate::embedding::ExternalEmbedding;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            index_dir: dir.to_path_buf(),
            forest: ForestConfig {
                n_trees: 4,
                max_leaf_size: 2,
                seed: Some(9),
            },
            ..Default::default()
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            ProductRecord::new("a").with_vendor("Acme"),
            ProductRecord::new("b").with_vendor("Globex"),
            ProductRecord::new("c").with_vendor("Acme"),
        ])
    }

    fn vectors() -> (Vec<Embedding>, Vec<Handle>) {
        (
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.9, 0.1, 0.0]],
            vec![Handle::from("a"), Handle::from("b"), Handle::from("c")],
        )
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            forest: ForestConfig {
                n_trees: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(SearchContext::new(config, Catalog::default())
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_open_without_artifacts_is_unloaded() {
        let dir = tempdir().unwrap();
        let ctx = SearchContext::open(config_in(dir.path()), catalog()).unwrap();

        assert_eq!(ctx.status(), IndexStatus::Unloaded);
        let err = ctx.search(&[1.0, 0.0, 0.0], &SearchFilter::default()).unwrap_err();
        assert!(err.is_not_ready());
        assert!(err.is_service_unavailable());
    }

    #[test]
    fn test_rebuild_then_search() {
        let dir = tempdir().unwrap();
        let ctx = SearchContext::new(config_in(dir.path()), catalog()).unwrap();
        let (v, h) = vectors();

        ctx.rebuild(&v, &h, 3).unwrap();
        assert_eq!(
            ctx.status(),
            IndexStatus::Loaded {
                dimension: 3,
                items: 3
            }
        );

        let results = ctx
            .search(&[1.0, 0.05, 0.0], &SearchFilter::default().with_vendor("acme"))
            .unwrap();
        assert_eq!(results.candidates, 3);
        let handles: Vec<_> = results.matches.iter().map(|r| r.handle.as_str()).collect();
        assert_eq!(handles, vec!["a", "c"]);
    }

    #[test]
    fn test_stale_rebuild_keeps_previous_index() {
        let dir = tempdir().unwrap();
        let config = Config {
            expected_dimension: Some(3),
            ..config_in(dir.path())
        };
        let ctx = SearchContext::new(config, catalog()).unwrap();
        let (v, h) = vectors();
        ctx.rebuild(&v, &h, 3).unwrap();

        let wrong = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let err = ctx.rebuild(&wrong, &h, 2).unwrap_err();
        assert!(err.is_dimension_mismatch());
        assert_eq!(ctx.index().unwrap().dimension(), 3);

        // Nothing was written for the rejected build
        let reloaded = index::load(ctx.paths()).unwrap();
        assert_eq!(reloaded.dimension(), 3);
    }

    #[test]
    fn test_search_image_rejects_mismatched_extractor() {
        let dir = tempdir().unwrap();
        let ctx = SearchContext::new(config_in(dir.path()), catalog()).unwrap();
        let (v, h) = vectors();
        ctx.rebuild(&v, &h, 3).unwrap();

        let err = ctx
            .search_image(&ExternalEmbedding::new(5), b"img", &SearchFilter::default())
            .unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(err.to_string().contains("rebuild"));
    }

    #[test]
    fn test_search_image_uses_embedder() {
        struct Fixed;
        impl ImageEmbedder for Fixed {
            fn embed(&self, _image: &[u8]) -> Result<Embedding> {
                Ok(vec![0.0, 1.0, 0.0])
            }
            fn dimension(&self) -> usize {
                3
            }
        }

        let dir = tempdir().unwrap();
        let ctx = SearchContext::new(config_in(dir.path()), catalog()).unwrap();
        let (v, h) = vectors();
        ctx.rebuild(&v, &h, 3).unwrap();

        let results = ctx
            .search_image(&Fixed, b"img", &SearchFilter::default())
            .unwrap();
        assert_eq!(results.matches[0].handle.as_str(), "b");
    }

    #[test]
    fn test_status_serializes_with_state_tag() {
        let json = serde_json::to_value(IndexStatus::Loaded {
            dimension: 4,
            items: 2,
        })
        .unwrap();
        assert_eq!(json["state"], "loaded");
        assert_eq!(json["items"], 2);
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchContext>();
    }
}
