//! # gtmlocal - Local music library
//!
//! The local library is a flat directory of audio files: downloads land in
//! it as `<id>.<ext>` and users may drop their own files there. This crate
//! lists those files, serves them as `data:` URLs and implements
//! [`LocalLibraryGateway`] for the local and catalog providers.
//!
//! ```no_run
//! use gtmlocal::LocalLibrary;
//!
//! # #[tokio::main]
//! # async fn main() -> gtmlocal::Result<()> {
//! let library = LocalLibrary::new("music");
//! for item in library.list_items("halo", 10).await? {
//!     println!("{} ({} bytes)", item.title, item.size);
//! }
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::{Error, Result};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gtmsource::{LOCAL_ID_PREFIX, LocalItem, LocalLibraryGateway};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// File extensions recognized as audio
pub const AUDIO_EXTENSIONS: [&str; 8] = ["mp3", "m4a", "webm", "ogg", "wav", "flac", "aac", "opus"];

/// MIME type announced for an audio file extension
pub fn mime_type(extension: &str) -> String {
    let extension = extension.to_lowercase();
    match extension.as_str() {
        "mp3" => "audio/mpeg".to_string(),
        "m4a" => "audio/mp4".to_string(),
        // webm, ogg, wav, flac, aac and opus use their own name
        _ => format!("audio/{extension}"),
    }
}

/// Encodes audio bytes as a `data:` URL
pub fn data_url(bytes: &[u8], extension: &str) -> String {
    format!("data:{};base64,{}", mime_type(extension), STANDARD.encode(bytes))
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Directory of locally available audio
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    music_dir: PathBuf,
}

impl LocalLibrary {
    pub fn new(music_dir: impl Into<PathBuf>) -> Self {
        Self {
            music_dir: music_dir.into(),
        }
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// File name stem addressed by a preview id
    ///
    /// `local_` ids map to their stem; other ids (downloaded network or
    /// catalog previews) are stored under the id itself.
    pub fn file_stem_for(id: &str) -> &str {
        id.strip_prefix(LOCAL_ID_PREFIX).unwrap_or(id)
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(Error::InvalidId(name.to_string()));
        }
        Ok(())
    }

    /// Sorted regular files of the music directory, empty when it does not exist
    async fn files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.music_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.music_dir.display(), "Music directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Finds the file stored as `<name>.<ext>`
    pub async fn find_match(&self, name: &str) -> Result<Option<PathBuf>> {
        Self::check_name(name)?;

        let matches: Vec<PathBuf> = self
            .files()
            .await?
            .into_iter()
            .filter(|p| p.extension().is_some() && stem_of(p) == name)
            .collect();

        if matches.len() > 1 {
            warn!(name = %name, count = matches.len(), "Several local files match, using the first");
        }
        Ok(matches.into_iter().next())
    }

    /// Reads the file stored as `<name>.<ext>` into a `data:` URL
    pub async fn data_url_for(&self, name: &str) -> Result<Option<String>> {
        let Some(path) = self.find_match(name).await? else {
            debug!(name = %name, "No local file");
            return Ok(None);
        };

        let bytes = fs::read(&path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read local file");
        Ok(Some(data_url(&bytes, &extension_of(&path))))
    }

    /// Playable URL of a stored preview, `None` when nothing is stored for it
    pub async fn resource_url(&self, id: &str) -> Result<Option<String>> {
        let url = self.data_url_for(Self::file_stem_for(id)).await?;
        if url.is_some() {
            info!(id = %id, "Serving local file");
        }
        Ok(url)
    }

    /// Lists audio files whose stem contains `term`, case-insensitively
    ///
    /// An empty term lists everything. At most `max_count` items are returned.
    pub async fn list_items(&self, term: &str, max_count: usize) -> Result<Vec<LocalItem>> {
        let needle = term.to_lowercase();
        let mut items = Vec::new();

        for path in self.files().await? {
            if items.len() >= max_count {
                break;
            }
            if !is_audio_file(&path) {
                continue;
            }
            let stem = stem_of(&path);
            if !needle.is_empty() && !stem.to_lowercase().contains(&needle) {
                continue;
            }

            let size = fs::metadata(&path).await?.len();
            debug!(file = %path.display(), size, "Found local file");
            items.push(LocalItem {
                id: format!("{LOCAL_ID_PREFIX}{stem}"),
                title: stem.replace(['_', '-'], " "),
                thumbnail: String::new(),
                url: String::new(),
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                extension: extension_of(&path),
                size,
            });
        }

        info!(term = %term, count = items.len(), "Listed local music");
        Ok(items)
    }

    /// Deletes the file stored for `id`, returning whether one existed
    pub async fn delete_item(&self, id: &str) -> Result<bool> {
        let Some(path) = self.find_match(Self::file_stem_for(id)).await? else {
            warn!(id = %id, "No local file to delete");
            return Ok(false);
        };

        fs::remove_file(&path).await?;
        info!(id = %id, path = %path.display(), "Deleted local file");
        Ok(true)
    }

    /// Removes every file from the music directory
    ///
    /// Files that cannot be removed are logged and skipped. Returns the
    /// number of files removed.
    pub async fn clear_downloads(&self) -> Result<usize> {
        let mut count = 0;
        for path in self.files().await? {
            match fs::remove_file(&path).await {
                Ok(()) => count += 1,
                Err(e) => error!(path = %path.display(), error = %e, "Could not delete file"),
            }
        }
        info!(count, "Cleared downloads");
        Ok(count)
    }
}

#[async_trait::async_trait]
impl LocalLibraryGateway for LocalLibrary {
    async fn local_resource_url(&self, id: &str) -> gtmsource::Result<Option<String>> {
        Ok(self.resource_url(id).await?)
    }

    async fn list_local_items(&self, term: &str, max_count: usize) -> gtmsource::Result<Vec<LocalItem>> {
        Ok(self.list_items(term, max_count).await?)
    }
}
