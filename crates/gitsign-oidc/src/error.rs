//! Error types for identity token acquisition

use thiserror::Error;

/// Errors that can occur while obtaining an identity token
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The OAuth provider rejected or could not complete a request
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The token is malformed or unusable
    #[error("token error: {0}")]
    Token(String),

    /// Invalid endpoint URL in the OAuth configuration
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for OIDC operations
pub type Result<T> = std::result::Result<T, Error>;
