//! Metadata filtering of similarity candidates.
//!
//! [`filter_and_page`] is the second stage of a query: the index returns an
//! over-fetched candidate list in similarity order, and this stage drops
//! candidates whose catalog record fails the predicates, then truncates to
//! the display limit. Order is never changed.

use crate::catalog::{Catalog, ProductRecord};
use crate::types::Handle;

/// Predicate value meaning "no constraint", as sent by filter dropdowns.
pub const ALL_SENTINEL: &str = "All";

/// Category and vendor predicates for a search request.
///
/// `None`, a blank string, or exactly [`ALL_SENTINEL`] (surrounding
/// whitespace ignored) means no constraint. Other values, including
/// `"all"`, match case-insensitively after trimming.
///
/// # Example
///
/// ```rust
/// use snapmatch::{ProductRecord, SearchFilter};
///
/// let filter = SearchFilter::default().with_vendor(" ACME ");
/// assert!(filter.matches(&ProductRecord::new("mug").with_vendor("acme")));
/// assert!(!filter.matches(&ProductRecord::new("tee")));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Required product type.
    pub category: Option<String>,
    /// Required vendor.
    pub vendor: Option<String>,
}

impl SearchFilter {
    /// Sets the category predicate.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the vendor predicate.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Returns true if neither predicate constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        active(&self.category).is_none() && active(&self.vendor).is_none()
    }

    /// Returns `true` if the record passes both predicates.
    pub fn matches(&self, record: &ProductRecord) -> bool {
        field_matches(active(&self.category), record.product_type.as_deref())
            && field_matches(active(&self.vendor), record.vendor.as_deref())
    }
}

/// The trimmed predicate, or `None` if it does not constrain.
fn active(predicate: &Option<String>) -> Option<&str> {
    let value = predicate.as_deref()?.trim();
    if value.is_empty() || value == ALL_SENTINEL {
        None
    } else {
        Some(value)
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        // Absent field never satisfies a present predicate
        (Some(_), None) => false,
        (Some(w), Some(a)) => a.trim().to_lowercase() == w.to_lowercase(),
    }
}

/// Keeps candidates whose record passes `filter`, in input order, up to
/// `display_limit` of them.
///
/// Candidates with no catalog record are dropped and do not count toward
/// the limit.
pub fn filter_and_page<'a>(
    candidates: &[Handle],
    catalog: &'a Catalog,
    filter: &SearchFilter,
    display_limit: usize,
) -> Vec<&'a ProductRecord> {
    candidates
        .iter()
        .filter_map(|handle| catalog.get(handle.as_str()))
        .filter(|record| filter.matches(record))
        .take(display_limit)
        .collect()
}
