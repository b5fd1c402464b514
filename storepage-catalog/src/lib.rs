//! Store catalog data model, freshness-based merge, and JSON persistence.
//!
//! This crate has no network dependencies. The scraper crate fills entries
//! from store pages; consumers merge and persist them through [`Catalog`].

pub mod merge;
pub mod store;
pub mod types;

pub use merge::MergePolicy;
pub use store::{Catalog, StoreError};
pub use types::*;
