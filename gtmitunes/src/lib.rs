//! # gtmitunes - iTunes catalog client
//!
//! Implements the catalog gateway on top of the public
//! [iTunes Search API](https://performance-partners.apple.com/search-api):
//! song search (`/search`), track lookup (`/lookup`) and preview downloads
//! into the local music directory.
//!
//! ```no_run
//! use gtmitunes::ItunesClient;
//! use gtmsource::CatalogProvider;
//! use std::sync::Arc;
//!
//! # fn wire(library: Arc<dyn gtmsource::LocalLibraryGateway>) -> gtmitunes::Result<()> {
//! let client = ItunesClient::builder().music_dir("music").build()?;
//! let provider = CatalogProvider::new(Arc::new(client), library);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;

pub use client::{ClientBuilder, ItunesClient, DEFAULT_API_BASE};
pub use error::{Error, Result};
pub use models::{SearchResponse, Track};
