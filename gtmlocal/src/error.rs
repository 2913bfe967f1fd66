//! Error types for the local library

use gtmsource::SourceError;

/// Result type alias for local library operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The id would address a file outside the music directory
    #[error("Invalid local id: {0}")]
    InvalidId(String),
}

impl From<Error> for SourceError {
    fn from(err: Error) -> Self {
        SourceError::gateway(err)
    }
}
