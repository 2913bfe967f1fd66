//! HTTP client for the iTunes Search API

use crate::error::{Error, Result};
use crate::models::{SearchResponse, Track};
use futures::StreamExt;
use gtmsource::{CATALOG_ID_PREFIX, CatalogGateway, CatalogItem};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Default iTunes API base URL
pub const DEFAULT_API_BASE: &str = "https://itunes.apple.com";

/// Default timeout for HTTP requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "gtmitunes/0.1.0";

/// Default directory downloads are written to
pub const DEFAULT_MUSIC_DIR: &str = "music";

/// Extension used when neither the URL nor the content type tells
pub const FALLBACK_EXTENSION: &str = "webm";

/// iTunes catalog client
///
/// Searches songs and downloads their 30 second previews into the music
/// directory, where the local library picks them up.
///
/// # Example
///
/// ```no_run
/// use gtmitunes::ItunesClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ItunesClient::builder().music_dir("music").build()?;
///     for item in client.search("Halo Theme Music", 10).await? {
///         println!("{} ({})", item.title, item.id);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ItunesClient {
    client: Client,
    api_base: String,
    music_dir: PathBuf,
}

impl ItunesClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    async fn get_json(&self, url: Url) -> Result<SearchResponse> {
        debug!(url = %url, "iTunes request");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Searches songs whose title matches `term`
    pub async fn search(&self, term: &str, limit: usize) -> Result<Vec<CatalogItem>> {
        let mut url = Url::parse(&format!("{}/search", self.api_base))?;
        url.query_pairs_mut()
            .append_pair("term", term)
            .append_pair("media", "music")
            .append_pair("entity", "song")
            .append_pair("limit", &limit.to_string())
            .append_pair("attribute", "songTerm");

        let response = self.get_json(url).await?;
        if response.results.is_empty() {
            warn!(term = %term, "No iTunes results");
        }

        let items: Vec<CatalogItem> = response.results.into_iter().map(CatalogItem::from).collect();
        info!(term = %term, count = items.len(), "iTunes search done");
        Ok(items)
    }

    /// Looks a song up by its numeric track id
    pub async fn lookup(&self, track_id: &str) -> Result<Option<Track>> {
        let mut url = Url::parse(&format!("{}/lookup", self.api_base))?;
        url.query_pairs_mut()
            .append_pair("id", track_id)
            .append_pair("entity", "song");

        let response = self.get_json(url).await?;
        Ok(response.results.into_iter().next())
    }

    /// Downloads the audio at `url` into the music directory as `<id>.<ext>`
    ///
    /// Catalog ids are re-resolved through [`lookup`](Self::lookup) and
    /// always stored as `.m4a`. Returns the path written.
    pub async fn download(&self, url: &str, id: &str) -> Result<PathBuf> {
        if let Some(track_id) = id.strip_prefix(CATALOG_ID_PREFIX) {
            return self.download_preview(track_id, url).await;
        }

        info!(id = %id, "Downloading audio");
        let response = self.fetch(url).await?;
        let extension = extension_from_url(url)
            .or_else(|| {
                response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(extension_from_content_type)
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        let path = self.music_dir.join(format!("{id}.{extension}"));
        self.save(response, &path).await?;
        Ok(path)
    }

    async fn download_preview(&self, track_id: &str, fallback_url: &str) -> Result<PathBuf> {
        info!(track_id = %track_id, "Downloading iTunes preview");

        let preview_url = match self.lookup(track_id).await? {
            Some(track) if !track.preview_url.is_empty() => track.preview_url,
            _ if !fallback_url.is_empty() => {
                warn!(track_id = %track_id, "Lookup returned no preview, using search URL");
                fallback_url.to_string()
            }
            _ => return Err(Error::NoPreview(format!("{CATALOG_ID_PREFIX}{track_id}"))),
        };

        if extension_from_url(&preview_url).as_deref() != Some("m4a") {
            warn!(url = %preview_url, "Preview is not an .m4a URL, saving as .m4a anyway");
        }

        let response = self.fetch(&preview_url).await?;
        let path = self.music_dir.join(format!("{CATALOG_ID_PREFIX}{track_id}.m4a"));
        self.save(response, &path).await?;
        Ok(path)
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }
        Ok(response)
    }

    /// Streams a response body to `path`, removing the file on failure
    async fn save(&self, response: reqwest::Response, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.music_dir).await?;

        match write_body(response, path).await {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "Download complete");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Download failed, removing partial file");
                let _ = tokio::fs::remove_file(path).await;
                Err(e)
            }
        }
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Lower-cased extension of a URL's path, if any
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let extension = Path::new(parsed.path()).extension()?.to_str()?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_lowercase())
    }
}

/// Extension guessed from a `Content-Type` header
pub fn extension_from_content_type(content_type: &str) -> String {
    let content_type = content_type.to_lowercase();
    let extension = if content_type.contains("mpegurl") {
        "m3u8"
    } else if content_type.contains("mpeg") || content_type.contains("mp3") {
        "mp3"
    } else if content_type.contains("ogg") {
        "ogg"
    } else if content_type.contains("wav") {
        "wav"
    } else {
        FALLBACK_EXTENSION
    };
    extension.to_string()
}

#[async_trait::async_trait]
impl CatalogGateway for ItunesClient {
    async fn catalog_search(&self, term: &str, max_count: usize) -> gtmsource::Result<Vec<CatalogItem>> {
        Ok(self.search(term, max_count).await?)
    }

    async fn fetch_remote_file(&self, url: &str, id: &str) -> gtmsource::Result<()> {
        self.download(url, id).await?;
        Ok(())
    }
}

/// Builder for [`ItunesClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    api_base: String,
    music_dir: PathBuf,
    request_timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            music_dir: PathBuf::from(DEFAULT_MUSIC_DIR),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the directory downloads are written to
    pub fn music_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.music_dir = dir.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ItunesClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()?,
        };

        Ok(ItunesClient {
            client,
            api_base: self.api_base,
            music_dir: self.music_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://a.example/x/preview.M4A?sig=1").as_deref(), Some("m4a"));
        assert_eq!(extension_from_url("https://a.example/stream"), None);
        assert_eq!(extension_from_url("not a url"), None);
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(extension_from_content_type("audio/mpeg"), "mp3");
        assert_eq!(extension_from_content_type("application/vnd.apple.mpegurl"), "m3u8");
        assert_eq!(extension_from_content_type("audio/ogg; codecs=opus"), "ogg");
        assert_eq!(extension_from_content_type("audio/x-wav"), "wav");
        assert_eq!(extension_from_content_type("application/octet-stream"), "webm");
    }

    #[test]
    fn test_builder_trims_base() {
        let client = ItunesClient::builder()
            .api_base("http://localhost:1234/")
            .music_dir("/tmp/gtm")
            .build()
            .unwrap();
        assert_eq!(client.api_base(), "http://localhost:1234");
        assert_eq!(client.music_dir(), Path::new("/tmp/gtm"));
    }
}
