//! Local library provider

use crate::gateway::LocalLibraryGateway;
use crate::{AudioResolver, DEFAULT_THEME_SUFFIX, PreviewStream, ProviderKind, VideoPreview};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default cap on local listing results
pub const LOCAL_MAX_RESULTS: usize = 100;

pub struct LocalLibraryProvider {
    library: Arc<dyn LocalLibraryGateway>,
    max_results: usize,
    theme_suffix: String,
}

impl LocalLibraryProvider {
    pub fn new(library: Arc<dyn LocalLibraryGateway>) -> Self {
        Self {
            library,
            max_results: LOCAL_MAX_RESULTS,
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

impl fmt::Debug for LocalLibraryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalLibraryProvider")
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AudioResolver for LocalLibraryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalFilesystem
    }

    fn theme_suffix(&self) -> &str {
        &self.theme_suffix
    }

    fn search(&self, term: &str) -> PreviewStream {
        let library = self.library.clone();
        let term = term.to_string();
        let max_results = self.max_results;

        Box::pin(async_stream::stream! {
            info!(provider = %ProviderKind::LocalFilesystem, term = %term, "Listing local library");
            match library.list_local_items(&term, max_results).await {
                Ok(items) => {
                    debug!(provider = %ProviderKind::LocalFilesystem, count = items.len(), "Local listing done");
                    for item in items {
                        yield VideoPreview::from(item);
                    }
                }
                Err(e) => {
                    error!(provider = %ProviderKind::LocalFilesystem, error = %e, "Local listing failed");
                }
            }
        })
    }

    async fn resolve_url(&self, preview: &VideoPreview) -> Option<String> {
        match self.library.local_resource_url(&preview.id).await {
            Ok(url) => url.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!(id = %preview.id, error = %e, "Local URL lookup failed");
                None
            }
        }
    }

    async fn download(&self, _preview: &VideoPreview) -> bool {
        // already resident
        true
    }
}
