//! Core type definitions shared by the index, catalog and filter.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Dense feature vector produced by an external embedding model.
///
/// Only the direction is meaningful; magnitude is ignored by the
/// angular distance used throughout the index.
pub type Embedding = Vec<f32>;

/// Internal item ordinal assigned during build (position in input order).
pub type ItemId = usize;

/// Opaque, catalog-unique product identifier.
///
/// The handle is the join key between the vector index and the product
/// catalog. The index never interprets it.
///
/// # Example
/// ```
/// use snapmatch::Handle;
///
/// let handle = Handle::new("red-canvas-sneaker");
/// assert_eq!(handle.as_str(), "red-canvas-sneaker");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Creates a handle from any string-like value.
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the handle as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle, returning the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Lets `HashMap<Handle, _>` be queried with a plain `&str`.
impl Borrow<str> for Handle {
    fn borrow(&self) -> &str {
        &self.0
    }
}
