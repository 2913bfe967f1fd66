//! # GTMSource
//!
//! Common contract and types for the audio providers used to pick a game's
//! theme music.
//!
//! This crate provides:
//!
//! - **Data model**: [`VideoPreview`], [`ResolvedAudio`] and [`ProviderKind`].
//! - **Resolver contract**: the [`AudioResolver`] trait every provider implements
//!   (search, resolve URL, download) and the derived
//!   [`get_audio`](resolver::AudioResolverExt::get_audio) operation.
//! - **Collaborator gateways**: the narrow call contracts in [`gateway`] that
//!   concrete backends (HTTP catalog, filesystem library, yt-dlp) implement.
//! - **Provider variants**: [`NetworkSearchProvider`], [`CatalogProvider`] and
//!   [`LocalLibraryProvider`].
//! - **Aggregation**: [`Aggregator`] fans one search out to every registered
//!   provider and merges the results, discarding superseded searches.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gtmsource::{Aggregator, AudioResolverExt, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register(Arc::new(LocalLibraryProvider::new(library)));
//!
//! let aggregator = Aggregator::new(&registry);
//! let outcome = aggregator.search("Halo main theme").await;
//!
//! if let Some(resolver) = registry.for_id("local_halo") {
//!     let selection = resolver.get_audio("Halo").await;
//! }
//! ```

pub mod aggregator;
pub mod gateway;
pub mod providers;
pub mod resolver;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

pub use aggregator::{Aggregator, SearchOutcome};
pub use gateway::{CatalogGateway, CatalogItem, LocalItem, LocalLibraryGateway, NetworkSearchGateway};
pub use providers::{CatalogProvider, LocalLibraryProvider, NetworkSearchProvider};
pub use resolver::{AudioResolverExt, ProviderRegistry};

/// Id prefix of previews produced by the catalog provider
pub const CATALOG_ID_PREFIX: &str = "itunes_";

/// Id prefix of previews already resident in the local library
pub const LOCAL_ID_PREFIX: &str = "local_";

/// Suffix appended to a game name by [`AudioResolverExt::get_audio`]
pub const DEFAULT_THEME_SUFFIX: &str = " Theme Music";

/// Error types for provider and gateway operations
///
/// These never cross the provider boundary: providers log them and degrade
/// to fewer results, an absent URL or a failed download.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Gateway call failed: {0}")]
    Gateway(String),

    #[error("No source URL for {0}")]
    MissingUrl(String),

    #[error("Provider not registered: {0}")]
    ProviderUnavailable(ProviderKind),
}

impl SourceError {
    /// Wraps any collaborator error message
    pub fn gateway(msg: impl fmt::Display) -> Self {
        Self::Gateway(msg.to_string())
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Lazily produced search results of one provider
///
/// The stream ends when the provider has nothing more to yield; it never
/// yields errors.
pub type PreviewStream = BoxStream<'static, VideoPreview>;

/// The backend family a preview comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    NetworkSearch,
    Catalog,
    LocalFilesystem,
}

impl ProviderKind {
    /// All kinds, in the order their results are displayed
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::NetworkSearch,
        ProviderKind::Catalog,
        ProviderKind::LocalFilesystem,
    ];

    /// Selects the provider responsible for an opaque preview id
    ///
    /// `itunes_` maps to the catalog, `local_` to the local library and
    /// anything else to network search.
    pub fn from_id(id: &str) -> Self {
        if id.starts_with(CATALOG_ID_PREFIX) {
            ProviderKind::Catalog
        } else if id.starts_with(LOCAL_ID_PREFIX) {
            ProviderKind::LocalFilesystem
        } else {
            ProviderKind::NetworkSearch
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::NetworkSearch => "network-search",
            ProviderKind::Catalog => "catalog",
            ProviderKind::LocalFilesystem => "local",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Displayable description of a candidate track before it is resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreview {
    /// Durable cross-provider identity; its prefix encodes provenance
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    /// Playable URL when the backend already knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl VideoPreview {
    pub fn new(id: impl Into<String>, title: impl Into<String>, thumbnail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            thumbnail: thumbnail.into(),
            url: None,
        }
    }

    /// Sets the embedded URL; an empty string means no URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(url.into());
        self
    }

    pub fn kind(&self) -> ProviderKind {
        ProviderKind::from_id(&self.id)
    }

    /// True when the audio is already resident and must not be downloaded
    pub fn is_local(&self) -> bool {
        self.kind() == ProviderKind::LocalFilesystem
    }
}

/// The outcome of a selection: a preview id paired with a playable URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAudio {
    pub video_id: String,
    pub audio_url: String,
}

/// Capability set every provider satisfies
///
/// None of these operations report failure to the caller: a failing backend
/// yields fewer results, an absent URL or `false`.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the aggregator drives each
/// provider from its own task.
#[async_trait::async_trait]
pub trait AudioResolver: Debug + Send + Sync {
    /// Backend family, used for id dispatch and log fields
    fn kind(&self) -> ProviderKind;

    /// Suffix appended to a game name before searching
    fn theme_suffix(&self) -> &str {
        DEFAULT_THEME_SUFFIX
    }

    /// Builds the search query used by `get_audio`
    fn augment_query(&self, context: &str) -> String {
        format!("{}{}", context, self.theme_suffix())
    }

    /// Starts a search and returns its lazily produced results
    ///
    /// Every call starts a fresh search.
    fn search(&self, term: &str) -> PreviewStream;

    /// Converts a preview into a playable URL, `None` when no audio is obtainable
    async fn resolve_url(&self, preview: &VideoPreview) -> Option<String>;

    /// Persists the audio locally, returning whether it succeeded
    async fn download(&self, preview: &VideoPreview) -> bool;
}

/// Maps empty strings to `None`
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_id_prefix() {
        assert_eq!(ProviderKind::from_id("itunes_123"), ProviderKind::Catalog);
        assert_eq!(ProviderKind::from_id("local_halo"), ProviderKind::LocalFilesystem);
        assert_eq!(ProviderKind::from_id("dQw4w9WgXcQ"), ProviderKind::NetworkSearch);
        // prefix must match at the start only
        assert_eq!(ProviderKind::from_id("x_local_"), ProviderKind::NetworkSearch);
        assert_eq!(ProviderKind::from_id(""), ProviderKind::NetworkSearch);
    }

    #[test]
    fn test_empty_url_is_absent() {
        let preview = VideoPreview::new("local_a", "A", "").with_url("");
        assert_eq!(preview.url, None);
        assert!(preview.is_local());
    }

    #[test]
    fn test_resolved_audio_wire_names() {
        let resolved = ResolvedAudio {
            video_id: "y".into(),
            audio_url: "http://a".into(),
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["videoId"], "y");
        assert_eq!(json["audioUrl"], "http://a");
    }

    #[test]
    fn test_augment_query_appends_suffix() {
        #[derive(Debug)]
        struct Dummy;

        #[async_trait::async_trait]
        impl AudioResolver for Dummy {
            fn kind(&self) -> ProviderKind {
                ProviderKind::Catalog
            }
            fn search(&self, _term: &str) -> PreviewStream {
                Box::pin(futures::stream::empty())
            }
            async fn resolve_url(&self, _preview: &VideoPreview) -> Option<String> {
                None
            }
            async fn download(&self, _preview: &VideoPreview) -> bool {
                false
            }
        }

        assert_eq!(Dummy.augment_query("Halo"), "Halo Theme Music");
    }
}
