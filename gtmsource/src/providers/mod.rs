//! The three provider variants
//!
//! Each provider adapts one gateway to the [`AudioResolver`](crate::AudioResolver)
//! contract and is the boundary where gateway errors are logged and degraded.

mod catalog;
mod local;
mod network;

pub use catalog::{CatalogProvider, CATALOG_MAX_RESULTS};
pub use local::{LocalLibraryProvider, LOCAL_MAX_RESULTS};
pub use network::NetworkSearchProvider;
