//! # gtmytdlp - yt-dlp network search gateway
//!
//! Drives the `yt-dlp` executable to search for, resolve and download audio.
//! A search runs as one long-lived process printing one JSON object per
//! result; [`YtDlp::next_result`] reads them one line at a time so results
//! stream in as yt-dlp finds them.
//!
//! Only one search process exists at a time: starting a search terminates
//! the previous one.

mod error;

pub use error::{Error, Result};

use gtmlocal::LocalLibrary;
use gtmsource::{NetworkSearchGateway, VideoPreview};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Results requested per search
pub const DEFAULT_SEARCH_COUNT: usize = 10;

/// Longest video accepted by a search, in seconds
pub const DEFAULT_MAX_DURATION_SECS: u64 = 20 * 60;

/// One JSON line printed by `yt-dlp -j`
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Entry {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

impl From<Entry> for VideoPreview {
    fn from(entry: Entry) -> Self {
        VideoPreview::new(entry.id, entry.title, entry.thumbnail.unwrap_or_default())
            .with_url(entry.url.unwrap_or_default())
    }
}

struct SearchProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

/// yt-dlp backed implementation of [`NetworkSearchGateway`]
pub struct YtDlp {
    binary: PathBuf,
    library: LocalLibrary,
    search_count: usize,
    max_duration_secs: u64,
    search: Mutex<Option<SearchProcess>>,
}

impl YtDlp {
    /// Uses the executable at `binary`, downloading into `library`'s directory
    pub fn new(binary: impl Into<PathBuf>, library: LocalLibrary) -> Self {
        Self {
            binary: binary.into(),
            library,
            search_count: DEFAULT_SEARCH_COUNT,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            search: Mutex::new(None),
        }
    }

    pub fn with_search_count(mut self, count: usize) -> Self {
        self.search_count = count;
        self
    }

    pub fn with_max_duration_secs(mut self, secs: u64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn search_args(&self, term: &str) -> Vec<String> {
        vec![
            format!("ytsearch{}:{}", self.search_count, term),
            "-j".into(),
            "-f".into(),
            "bestaudio".into(),
            "--match-filters".into(),
            format!("duration<?{}", self.max_duration_secs),
        ]
    }

    pub fn resolve_args(id: &str) -> Vec<String> {
        vec![id.to_string(), "-j".into(), "-f".into(), "bestaudio".into()]
    }

    pub fn download_args(&self, id: &str) -> Vec<String> {
        vec![
            id.to_string(),
            "-f".into(),
            "bestaudio".into(),
            "-o".into(),
            "%(id)s.%(ext)s".into(),
            "-P".into(),
            self.library.music_dir().to_string_lossy().to_string(),
        ]
    }

    async fn command(&self, args: &[String]) -> Result<Command> {
        if !tokio::fs::try_exists(&self.binary).await.unwrap_or(false) {
            error!(path = %self.binary.display(), "yt-dlp binary not found");
            return Err(Error::BinaryNotFound(self.binary.clone()));
        }
        self.ensure_executable().await;

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.env("LD_LIBRARY_PATH", "/usr/lib:/usr/lib64:/lib:/lib64");
        Ok(command)
    }

    #[cfg(unix)]
    async fn ensure_executable(&self) {
        use std::os::unix::fs::PermissionsExt;

        if let Err(e) = tokio::fs::set_permissions(&self.binary, std::fs::Permissions::from_mode(0o755)).await {
            debug!(path = %self.binary.display(), error = %e, "Could not mark yt-dlp executable");
        }
    }

    #[cfg(not(unix))]
    async fn ensure_executable(&self) {}

    /// Starts a search, terminating any search still running
    pub async fn start_search(&self, term: &str) -> Result<()> {
        let mut search = self.search.lock().await;
        if let Some(mut previous) = search.take() {
            debug!("Terminating previous yt-dlp search");
            let _ = previous.child.start_kill();
            let _ = previous.child.wait().await;
        }

        let mut command = self.command(&self.search_args(term)).await?;
        // stderr is never read during a search
        command.stderr(Stdio::null());
        let mut child = command.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("yt-dlp stdout not captured")))?;

        *search = Some(SearchProcess {
            child,
            lines: BufReader::new(stdout).lines(),
        });
        info!(term = %term, "yt-dlp search started");
        Ok(())
    }

    /// Next search result, `None` once the search is exhausted or none is running
    pub async fn next_result(&self) -> Result<Option<VideoPreview>> {
        let mut search = self.search.lock().await;
        let Some(process) = search.as_mut() else {
            return Ok(None);
        };

        let line = match process.lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => line,
            _ => {
                debug!("No more yt-dlp results");
                if let Some(mut finished) = search.take() {
                    let _ = finished.child.start_kill();
                    let status = finished.child.wait().await?;
                    debug!(status = %status, "yt-dlp search exited");
                }
                return Ok(None);
            }
        };

        let preview = VideoPreview::from(Entry::parse(line.trim())?);
        debug!(id = %preview.id, title = %preview.title, "yt-dlp result");
        Ok(Some(preview))
    }

    /// Playable URL for a video: the local copy when downloaded, else a stream URL
    pub async fn resolve(&self, id: &str) -> Result<Option<String>> {
        match self.library.data_url_for(id).await {
            Ok(Some(url)) => {
                info!(id = %id, "Using downloaded audio");
                return Ok(Some(url));
            }
            Ok(None) => {}
            Err(e) => warn!(id = %id, error = %e, "Could not read local copy, asking yt-dlp"),
        }

        let output = self.command(&Self::resolve_args(id)).await?.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            warn!(id = %id, "No output from yt-dlp");
            return Ok(None);
        }

        let url = Entry::parse(stdout)?.url.filter(|u| !u.is_empty());
        if url.is_some() {
            info!(id = %id, "Resolved audio URL");
        }
        Ok(url)
    }

    /// Downloads a video's audio into the music directory
    ///
    /// Does nothing when a copy already exists.
    pub async fn download(&self, id: &str) -> Result<()> {
        if self.library.find_match(id).await?.is_some() {
            info!(id = %id, "Audio already downloaded");
            return Ok(());
        }

        tokio::fs::create_dir_all(self.library.music_dir()).await?;
        info!(id = %id, "Downloading audio");
        let output = self.command(&self.download_args(id)).await?.output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!(
            id = %id,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %stderr,
            "yt-dlp finished"
        );

        if !output.status.success() {
            error!(id = %id, status = %output.status, "yt-dlp download failed");
            return Err(Error::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        info!(id = %id, "Download complete");
        Ok(())
    }

    /// True while a search process is held, i.e. until its results are exhausted
    pub async fn search_running(&self) -> bool {
        self.search.lock().await.is_some()
    }

    /// Terminates a running search process
    pub async fn shutdown(&self) {
        if let Some(mut process) = self.search.lock().await.take() {
            info!("Stopping yt-dlp search");
            let _ = process.child.start_kill();
            let _ = process.child.wait().await;
        }
    }
}

impl std::fmt::Debug for YtDlp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtDlp")
            .field("binary", &self.binary)
            .field("music_dir", &self.library.music_dir())
            .field("search_count", &self.search_count)
            .field("max_duration_secs", &self.max_duration_secs)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl NetworkSearchGateway for YtDlp {
    async fn start_search(&self, term: &str) -> gtmsource::Result<()> {
        Ok(YtDlp::start_search(self, term).await?)
    }

    async fn next_search_result(&self) -> gtmsource::Result<Option<VideoPreview>> {
        Ok(self.next_result().await?)
    }

    async fn resolve_single_url(&self, id: &str) -> gtmsource::Result<Option<String>> {
        Ok(self.resolve(id).await?)
    }

    async fn trigger_download(&self, id: &str) -> gtmsource::Result<()> {
        Ok(self.download(id).await?)
    }
}
