//! Second-stage result filtering.
//!
//! The index answers "which products look like this image"; this module
//! narrows that answer by catalog metadata and caps it for display.

mod filter;

pub use filter::{filter_and_page, SearchFilter, ALL_SENTINEL};
