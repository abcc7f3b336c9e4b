//! Error types for Rekor operations

use thiserror::Error;

/// Errors that can occur while talking to Rekor
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rekor rejected the request or returned something unusable
    #[error("API error: {0}")]
    Api(String),

    /// Invalid Rekor URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for Rekor operations
pub type Result<T> = std::result::Result<T, Error>;
