//! Network search provider
//!
//! Streams results one by one: a single `start_search` followed by
//! `next_search_result` polls until the gateway reports the end.

use crate::gateway::NetworkSearchGateway;
use crate::{AudioResolver, DEFAULT_THEME_SUFFIX, PreviewStream, ProviderKind, VideoPreview};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct NetworkSearchProvider {
    gateway: Arc<dyn NetworkSearchGateway>,
    theme_suffix: String,
}

impl NetworkSearchProvider {
    pub fn new(gateway: Arc<dyn NetworkSearchGateway>) -> Self {
        Self {
            gateway,
            theme_suffix: DEFAULT_THEME_SUFFIX.to_string(),
        }
    }

    pub fn with_theme_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.theme_suffix = suffix.into();
        self
    }
}

impl fmt::Debug for NetworkSearchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSearchProvider")
            .field("theme_suffix", &self.theme_suffix)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AudioResolver for NetworkSearchProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NetworkSearch
    }

    fn theme_suffix(&self) -> &str {
        &self.theme_suffix
    }

    fn search(&self, term: &str) -> PreviewStream {
        let gateway = self.gateway.clone();
        let term = term.to_string();

        Box::pin(async_stream::stream! {
            info!(provider = %ProviderKind::NetworkSearch, term = %term, "Starting search");
            if let Err(e) = gateway.start_search(&term).await {
                error!(provider = %ProviderKind::NetworkSearch, error = %e, "Search failed to start");
                return;
            }

            let mut count = 0usize;
            loop {
                match gateway.next_search_result().await {
                    Ok(Some(preview)) => {
                        debug!(id = %preview.id, title = %preview.title, "Network search result");
                        count += 1;
                        yield preview;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(provider = %ProviderKind::NetworkSearch, error = %e, "Search interrupted");
                        break;
                    }
                }
            }
            debug!(provider = %ProviderKind::NetworkSearch, count, "Search exhausted");
        })
    }

    async fn resolve_url(&self, preview: &VideoPreview) -> Option<String> {
        if let Some(url) = preview.url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }

        match self.gateway.resolve_single_url(&preview.id).await {
            Ok(url) => url.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!(id = %preview.id, error = %e, "Failed to resolve network URL");
                None
            }
        }
    }

    async fn download(&self, preview: &VideoPreview) -> bool {
        match self.gateway.trigger_download(&preview.id).await {
            Ok(()) => true,
            Err(e) => {
                error!(id = %preview.id, error = %e, "Network download failed");
                false
            }
        }
    }
}
