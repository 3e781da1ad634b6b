//! In-memory product catalog: handle → display metadata.
//!
//! The catalog is loaded once before requests are served and is read-only
//! afterwards. Merging and cleaning of the upstream product export happen
//! elsewhere; this module only reads the cleaned JSON array.

mod types;

pub use types::ProductRecord;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{Result, SnapMatchError};
use crate::types::Handle;

use types::RawRecord;

/// Handle → [`ProductRecord`] mapping.
///
/// # Example
///
/// ```rust
/// use snapmatch::{Catalog, ProductRecord};
///
/// let catalog = Catalog::from_records(vec![
///     ProductRecord::new("mug-red").with_vendor("Acme"),
///     ProductRecord::new("mug-blue").with_vendor("Globex"),
/// ]);
/// assert_eq!(catalog.len(), 2);
/// assert_eq!(catalog.get("mug-red").unwrap().vendor.as_deref(), Some("Acme"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: HashMap<Handle, ProductRecord>,
}

/// Distinct values available for the category and vendor filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Sorted, distinct, non-empty product types.
    pub product_types: Vec<String>,
    /// Sorted, distinct, non-empty vendors.
    pub vendors: Vec<String>,
}

impl Catalog {
    /// Builds a catalog from records. A later record replaces an earlier
    /// one with the same handle.
    pub fn from_records(records: impl IntoIterator<Item = ProductRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            map.insert(record.handle.clone(), record);
        }
        Self { records: map }
    }

    /// Parses a JSON array of product objects.
    ///
    /// Entries with a missing or empty handle, and entries that are not
    /// objects, are skipped with a warning. Handles are used verbatim.
    ///
    /// # Errors
    ///
    /// Returns `SnapMatchError::Catalog` if the document is not a JSON array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| SnapMatchError::catalog(format!("expected a JSON array: {}", e)))?;

        let total = entries.len();
        let mut records = HashMap::with_capacity(total);
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for (position, entry) in entries.into_iter().enumerate() {
            let record = match serde_json::from_value::<RawRecord>(entry) {
                Ok(raw) => raw.into_record(),
                Err(e) => {
                    warn!(position, error = %e, "Skipping malformed catalog entry");
                    None
                }
            };
            let Some(record) = record else {
                skipped += 1;
                continue;
            };
            if records.insert(record.handle.clone(), record).is_some() {
                duplicates += 1;
            }
        }

        if skipped > 0 {
            warn!(skipped, "Catalog entries without a usable handle were skipped");
        }
        if duplicates > 0 {
            warn!(duplicates, "Duplicate handles in catalog, later entries kept");
        }

        Ok(Self { records })
    }

    /// Reads and parses a catalog file (see [`from_json_str`](Self::from_json_str)).
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SnapMatchError::catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(products = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Looks up a record by handle.
    #[inline]
    pub fn get(&self, handle: &str) -> Option<&ProductRecord> {
        self.records.get(handle)
    }

    /// Returns true if the catalog has a record for `handle`.
    #[inline]
    pub fn contains(&self, handle: &str) -> bool {
        self.records.contains_key(handle)
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the catalog has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over all records in arbitrary order.
    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.values()
    }

    /// Distinct values for populating filter dropdowns.
    pub fn filter_options(&self) -> FilterOptions {
        fn distinct<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
            values
                .flatten()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }

        FilterOptions {
            product_types: distinct(self.records.values().map(|r| r.product_type.as_ref())),
            vendors: distinct(self.records.values().map(|r| r.vendor.as_ref())),
        }
    }
}
