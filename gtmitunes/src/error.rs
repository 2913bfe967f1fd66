//! Error types for the iTunes client

use gtmsource::SourceError;

/// Result type alias for iTunes operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the iTunes client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success HTTP status
    #[error("API returned error status: {0}")]
    Status(reqwest::StatusCode),

    /// The track has no preview to download
    #[error("No preview available for {0}")]
    NoPreview(String),
}

impl From<Error> for SourceError {
    fn from(err: Error) -> Self {
        SourceError::gateway(err)
    }
}
