//! Data models for the iTunes Search API

use gtmsource::{CATALOG_ID_PREFIX, CatalogItem};
use serde::{Deserialize, Serialize};

/// Envelope of `/search` and `/lookup` responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub result_count: usize,
    pub results: Vec<Track>,
}

/// One song as returned by the API
///
/// Every field may be missing from a response; missing fields read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    pub track_id: Option<u64>,
    pub track_name: String,
    pub artist_name: String,
    pub collection_name: String,
    pub preview_url: String,
    #[serde(rename = "artworkUrl100")]
    pub artwork_url_100: String,
    pub track_time_millis: u64,
}

impl Track {
    /// Catalog id, `itunes_<trackId>`
    pub fn catalog_id(&self) -> String {
        match self.track_id {
            Some(id) => format!("{CATALOG_ID_PREFIX}{id}"),
            None => CATALOG_ID_PREFIX.to_string(),
        }
    }

    /// Artwork at 600x600 instead of the 100x100 thumbnail
    pub fn large_artwork(&self) -> String {
        self.artwork_url_100.replace("100x100", "600x600")
    }
}

impl From<Track> for CatalogItem {
    fn from(track: Track) -> Self {
        CatalogItem {
            id: track.catalog_id(),
            title: format!("{} - {}", track.track_name, track.artist_name),
            thumbnail: track.large_artwork(),
            url: track.preview_url,
            artist: track.artist_name,
            album: track.collection_name,
            duration: track.track_time_millis / 1000,
        }
    }
}
