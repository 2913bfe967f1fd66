//! Catalog provider
//!
//! One bulk request per search; hits carry a remote preview URL that is
//! passed through as is, otherwise the local copy is looked up.

use crate::gateway::{CatalogGateway, LocalLibraryGateway};
use crate::{AudioResolver, DEFAULT_THEME_SUFFIX, PreviewStream, ProviderKind, SourceError, VideoPreview};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default cap on catalog search results
pub const CATALOG_MAX_RESULTS: usize = 10;

pub struct CatalogProvider {
    catalog: Arc<dyn CatalogGateway>,
    library: Arc<dyn LocalLibraryGateway>,
    max_results: usize,
    theme_suffix: String,
}

impl CatalogProvider {
    pub fn new(catalog: Arc<dyn CatalogGateway>, library: Arc<dyn LocalLibraryGateway>) -> Self {
        Self {
            catalog,
            library,
            max_results: CATALOG_MAX_RESULTS,
            theme_suffix: DEFAULT_THEME_SUFFIX.to_string(),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_theme_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.theme_suffix = suffix.into();
        self
    }
}

impl fmt::Debug for CatalogProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogProvider")
            .field("max_results", &self.max_results)
            .field("theme_suffix", &self.theme_suffix)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AudioResolver for CatalogProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Catalog
    }

    fn theme_suffix(&self) -> &str {
        &self.theme_suffix
    }

    fn search(&self, term: &str) -> PreviewStream {
        let catalog = self.catalog.clone();
        let term = term.to_string();
        let max_results = self.max_results;

        Box::pin(async_stream::stream! {
            info!(provider = %ProviderKind::Catalog, term = %term, "Searching catalog");
            match catalog.catalog_search(&term, max_results).await {
                Ok(items) => {
                    debug!(provider = %ProviderKind::Catalog, count = items.len(), "Catalog search done");
                    for item in items {
                        yield VideoPreview::from(item);
                    }
                }
                Err(e) => {
                    error!(provider = %ProviderKind::Catalog, error = %e, "Catalog search failed");
                }
            }
        })
    }

    async fn resolve_url(&self, preview: &VideoPreview) -> Option<String> {
        if let Some(url) = preview.url.as_ref().filter(|u| u.starts_with("http")) {
            return Some(url.clone());
        }

        match self.library.local_resource_url(&preview.id).await {
            Ok(url) => url.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!(id = %preview.id, error = %e, "Catalog local URL lookup failed");
                None
            }
        }
    }

    async fn download(&self, preview: &VideoPreview) -> bool {
        let Some(url) = preview.url.as_deref().filter(|u| !u.is_empty()) else {
            error!(id = %preview.id, error = %SourceError::MissingUrl(preview.id.clone()), "Cannot download catalog item");
            return false;
        };

        match self.catalog.fetch_remote_file(url, &preview.id).await {
            Ok(()) => true,
            Err(e) => {
                error!(id = %preview.id, error = %e, "Catalog download failed");
                false
            }
        }
    }
}
