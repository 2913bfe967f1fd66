//! Derived operations and id-based provider dispatch

use crate::{AudioResolver, ProviderKind, ResolvedAudio, SourceError, VideoPreview};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Operations built only from the [`AudioResolver`] primitives
///
/// Implemented for every `Arc` of a resolver so that the fire-and-forget
/// download can outlive the call.
#[async_trait::async_trait]
pub trait AudioResolverExt {
    /// Picks the first playable result for a game
    ///
    /// Searches for `context` augmented with the provider's theme suffix and
    /// walks the results in stream order. The first preview with a playable
    /// URL wins: its download is started in the background (unless it is
    /// already local) and the selection is returned without scanning the
    /// remaining results. Returns `None` when no result is playable.
    async fn get_audio(&self, context: &str) -> Option<ResolvedAudio>;
}

#[async_trait::async_trait]
impl<R> AudioResolverExt for Arc<R>
where
    R: AudioResolver + ?Sized + 'static,
{
    async fn get_audio(&self, context: &str) -> Option<ResolvedAudio> {
        let query = self.augment_query(context);
        info!(provider = %self.kind(), query = %query, "Looking up theme audio");

        let mut previews = self.search(&query);
        while let Some(preview) = previews.next().await {
            let Some(audio_url) = self.resolve_url(&preview).await.filter(|u| !u.is_empty()) else {
                debug!(id = %preview.id, "No playable URL, trying next result");
                continue;
            };

            if !preview.is_local() {
                spawn_download(self.clone(), preview.clone());
            }

            info!(id = %preview.id, "Theme audio selected");
            return Some(ResolvedAudio {
                video_id: preview.id,
                audio_url,
            });
        }

        info!(provider = %self.kind(), query = %query, "No playable theme audio found");
        None
    }
}

/// Runs a best-effort download in the background
pub fn spawn_download<R>(resolver: Arc<R>, preview: VideoPreview) -> JoinHandle<bool>
where
    R: AudioResolver + ?Sized + 'static,
{
    tokio::spawn(async move {
        let ok = resolver.download(&preview).await;
        if ok {
            debug!(id = %preview.id, "Background download finished");
        } else {
            warn!(id = %preview.id, "Background download failed");
        }
        ok
    })
}

/// Registered providers, at most one per [`ProviderKind`]
///
/// Providers are kept in display order (network search, catalog, local),
/// which is also the order the aggregator merges their results in.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AudioResolver>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any provider of the same kind
    pub fn register(&mut self, provider: Arc<dyn AudioResolver>) {
        let kind = provider.kind();
        self.providers.retain(|p| p.kind() != kind);
        let position = self
            .providers
            .iter()
            .position(|p| p.kind() > kind)
            .unwrap_or(self.providers.len());
        self.providers.insert(position, provider);
        info!(provider = %kind, "Registered audio provider");
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn AudioResolver>> {
        self.providers.iter().find(|p| p.kind() == kind).cloned()
    }

    /// Provider responsible for a preview id, by prefix
    pub fn for_id(&self, id: &str) -> Option<Arc<dyn AudioResolver>> {
        self.get(ProviderKind::from_id(id))
    }

    /// Like [`for_id`](Self::for_id), reporting a missing provider as an error
    pub fn require_for_id(&self, id: &str) -> Result<Arc<dyn AudioResolver>, SourceError> {
        let kind = ProviderKind::from_id(id);
        self.get(kind).ok_or(SourceError::ProviderUnavailable(kind))
    }

    pub fn providers(&self) -> &[Arc<dyn AudioResolver>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PreviewStream;

    #[derive(Debug)]
    struct Stub(ProviderKind);

    #[async_trait::async_trait]
    impl AudioResolver for Stub {
        fn kind(&self) -> ProviderKind {
            self.0
        }
        fn search(&self, _term: &str) -> PreviewStream {
            Box::pin(futures::stream::empty())
        }
        async fn resolve_url(&self, _preview: &VideoPreview) -> Option<String> {
            None
        }
        async fn download(&self, _preview: &VideoPreview) -> bool {
            true
        }
    }

    #[test]
    fn test_registry_orders_by_kind_and_replaces() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Stub(ProviderKind::LocalFilesystem)));
        registry.register(Arc::new(Stub(ProviderKind::NetworkSearch)));
        registry.register(Arc::new(Stub(ProviderKind::Catalog)));
        registry.register(Arc::new(Stub(ProviderKind::Catalog)));

        let kinds: Vec<_> = registry.providers().iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, ProviderKind::ALL.to_vec());
    }

    #[test]
    fn test_registry_dispatch_by_id() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Stub(ProviderKind::Catalog)));

        assert_eq!(registry.for_id("itunes_9").map(|p| p.kind()), Some(ProviderKind::Catalog));
        assert!(registry.for_id("local_9").is_none());
        assert!(matches!(
            registry.require_for_id("abc"),
            Err(SourceError::ProviderUnavailable(ProviderKind::NetworkSearch))
        ));
    }

    #[tokio::test]
    async fn test_get_audio_on_empty_stream_is_absent() {
        let resolver: Arc<dyn AudioResolver> = Arc::new(Stub(ProviderKind::Catalog));
        assert_eq!(resolver.get_audio("Halo").await, None);
    }
}
