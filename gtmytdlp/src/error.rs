//! Error types for the yt-dlp gateway

use gtmsource::SourceError;
use std::path::PathBuf;

/// Result type alias for yt-dlp operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("yt-dlp binary not found at {0}")]
    BinaryNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yt-dlp exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Local library error: {0}")]
    Local(#[from] gtmlocal::Error),
}

impl From<Error> for SourceError {
    fn from(err: Error) -> Self {
        SourceError::gateway(err)
    }
}
