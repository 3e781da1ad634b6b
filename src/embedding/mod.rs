//! Image embedding abstractions.
//!
//! Feature extraction is an external collaborator: a model turns image
//! bytes into a fixed-length vector. This crate only defines the seam and
//! checks what comes back.
//!
//! # Providers
//!
//! - [`ExternalEmbedding`] - vectors are computed elsewhere and passed in
//!   directly; `embed()` always fails
//!
//! # Example
//!
//! ```rust
//! use snapmatch::embedding::{ExternalEmbedding, ImageEmbedder};
//!
//! let embedder = ExternalEmbedding::new(1280);
//! assert_eq!(embedder.dimension(), 1280);
//! assert!(embedder.embed(b"\xFF\xD8...").is_err());
//! ```

use crate::error::{Result, SnapMatchError, ValidationError};
use crate::types::Embedding;

/// Image feature extractor.
///
/// Implementations must be thread-safe (`Send + Sync`) so one extractor
/// can serve concurrent requests.
///
/// # Implementing a Custom Extractor
///
/// ```rust,ignore
/// use snapmatch::embedding::ImageEmbedder;
/// use snapmatch::{Embedding, Result};
///
/// struct MobileNet {
///     session: Session,
/// }
///
/// impl ImageEmbedder for MobileNet {
///     fn embed(&self, image: &[u8]) -> Result<Embedding> {
///         let tensor = preprocess(image)?;
///         Ok(self.session.run(tensor)?)
///     }
///
///     fn dimension(&self) -> usize {
///         1280
///     }
/// }
/// ```
pub trait ImageEmbedder: Send + Sync {
    /// Extracts a feature vector from encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns `SnapMatchError::Embedding` if the image cannot be decoded
    /// or the model fails.
    fn embed(&self, image: &[u8]) -> Result<Embedding>;

    /// Length of every vector this extractor produces.
    fn dimension(&self) -> usize;

    /// Validates that an embedding has the correct dimension.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if dimensions don't match.
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        let expected = self.dimension();
        if embedding.len() != expected {
            return Err(ValidationError::dimension_mismatch(expected, embedding.len()).into());
        }
        Ok(())
    }
}

/// Extractor stand-in for callers that compute vectors themselves.
///
/// It knows the dimension, so it can still validate vectors and take part
/// in the index staleness check, but it cannot embed images.
#[derive(Clone, Debug)]
pub struct ExternalEmbedding {
    dimension: usize,
}

impl ExternalEmbedding {
    /// Creates a provider for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl ImageEmbedder for ExternalEmbedding {
    fn embed(&self, _image: &[u8]) -> Result<Embedding> {
        Err(SnapMatchError::embedding(
            "External embedding mode: vectors must be provided by the caller",
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_embedding_dimension() {
        let embedder = ExternalEmbedding::new(1280);
        assert_eq!(embedder.dimension(), 1280);
    }

    #[test]
    fn test_external_embedding_embed_returns_error() {
        let err = ExternalEmbedding::new(4).embed(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, SnapMatchError::Embedding(_)));
    }

    #[test]
    fn test_validate_embedding() {
        let embedder = ExternalEmbedding::new(3);
        assert!(embedder.validate_embedding(&[1.0, 2.0, 3.0]).is_ok());

        let err = embedder.validate_embedding(&[1.0, 2.0]).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_embedder_is_object_safe() {
        let boxed: Box<dyn ImageEmbedder> = Box::new(ExternalEmbedding::new(8));
        assert_eq!(boxed.dimension(), 8);
    }
}
