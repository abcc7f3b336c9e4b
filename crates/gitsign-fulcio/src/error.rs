//! Error types for Fulcio operations

use thiserror::Error;

/// Errors that can occur while obtaining a signing certificate
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Fulcio rejected the request or returned something unusable
    #[error("Fulcio error: {0}")]
    Fulcio(String),

    /// Key encoding or signature failure
    #[error("key error: {0}")]
    Key(String),

    /// Certificate could not be decoded
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Invalid Fulcio URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for Fulcio operations
pub type Result<T> = std::result::Result<T, Error>;
