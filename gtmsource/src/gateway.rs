//! Call contracts of the backends behind each provider
//!
//! Providers never talk to a network, a subprocess or the filesystem
//! directly; they go through these gateways. Each trait mirrors one group of
//! verbs a backend exposes:
//!
//! | Verb | Trait method |
//! |---|---|
//! | start-search | [`NetworkSearchGateway::start_search`] |
//! | next-search-result | [`NetworkSearchGateway::next_search_result`] |
//! | resolve-single-url | [`NetworkSearchGateway::resolve_single_url`] |
//! | trigger-download | [`NetworkSearchGateway::trigger_download`] |
//! | catalog-search | [`CatalogGateway::catalog_search`] |
//! | fetch-remote-file | [`CatalogGateway::fetch_remote_file`] |
//! | local-resource-url | [`LocalLibraryGateway::local_resource_url`] |
//! | list-local-items | [`LocalLibraryGateway::list_local_items`] |

use crate::{Result, VideoPreview};
use serde::{Deserialize, Serialize};

/// Incremental search backend (one search at a time, polled result by result)
#[async_trait::async_trait]
pub trait NetworkSearchGateway: Send + Sync {
    /// Starts a new search, superseding any search in progress
    async fn start_search(&self, term: &str) -> Result<()>;

    /// Pops the next result of the current search, `None` once exhausted
    async fn next_search_result(&self) -> Result<Option<VideoPreview>>;

    /// Looks up the playable URL of a single id
    async fn resolve_single_url(&self, id: &str) -> Result<Option<String>>;

    /// Fetches the audio of `id` into the local library
    async fn trigger_download(&self, id: &str) -> Result<()>;
}

/// Bulk catalog backend
#[async_trait::async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Searches the catalog, returning at most `max_count` items
    async fn catalog_search(&self, term: &str, max_count: usize) -> Result<Vec<CatalogItem>>;

    /// Downloads `url` into the local library under `id`
    async fn fetch_remote_file(&self, url: &str, id: &str) -> Result<()>;
}

/// Local library backend
#[async_trait::async_trait]
pub trait LocalLibraryGateway: Send + Sync {
    /// Playable URL of a locally stored item, `None` when nothing is stored under `id`
    async fn local_resource_url(&self, id: &str) -> Result<Option<String>>;

    /// Lists stored items whose name contains `term`, at most `max_count`
    async fn list_local_items(&self, term: &str, max_count: usize) -> Result<Vec<LocalItem>>;
}

/// One catalog search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds
    pub duration: u64,
}

impl From<CatalogItem> for VideoPreview {
    fn from(item: CatalogItem) -> Self {
        VideoPreview::new(item.id, item.title, item.thumbnail).with_url(item.url)
    }
}

/// One file of the local library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalItem {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub url: String,
    pub filename: String,
    pub extension: String,
    /// File size in bytes
    pub size: u64,
}

impl From<LocalItem> for VideoPreview {
    fn from(item: LocalItem) -> Self {
        VideoPreview::new(item.id, item.title, item.thumbnail).with_url(item.url)
    }
}
