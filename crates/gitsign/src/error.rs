//! Error types for gitsign

use std::io;
use thiserror::Error;

/// Errors crossing the signing backend boundary
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can end an invocation
///
/// Each variant names the stage that failed; the message is what the
/// operator sees on the terminal.
#[derive(Error, Debug)]
pub enum Error {
    /// The signing backend could not be started
    #[error("failed to start signing backend: {0}")]
    Backend(BoxError),

    /// The identity provider could not produce a signer identity
    #[error("failed to get identity: {0}")]
    Identity(BoxError),

    /// The message file named on the command line could not be opened
    #[error("failed to open message file ({path}): {source}")]
    OpenMessage {
        /// Path given on the command line
        path: String,
        /// Underlying failure
        source: io::Error,
    },

    /// The message could not be read
    #[error("failed to read message from {origin}: {source}")]
    ReadMessage {
        /// File path, or `stdin`
        origin: String,
        /// Underlying failure
        source: io::Error,
    },

    /// The transparency log client could not be created
    #[error("failed to create rekor client: {0}")]
    RekorClient(BoxError),

    /// The signer failed
    #[error("failed to sign message: {0}")]
    Sign(BoxError),

    /// A `[GNUPG:]` status line could not be written
    #[error("failed to write status line: {0}")]
    Status(io::Error),

    /// The signature could not be written to the output stream
    #[error("failed to write signature: {0}")]
    WriteSignature(io::Error),

    /// A certificate could not be parsed or lacks required data
    #[error("invalid certificate: {0}")]
    Certificate(String),

    /// The signature document is malformed
    #[error("invalid signature: {0}")]
    Signature(String),

    /// The signature does not verify
    #[error("failed to verify signature: {0}")]
    Verify(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// A mode flag selected a command nobody registered
    #[error("no command registered for --{0}")]
    UnregisteredCommand(&'static str),

    /// The unit of work panicked
    #[error("panic: {0}")]
    Panicked(String),
}

/// Result type for gitsign operations
pub type Result<T> = std::result::Result<T, Error>;
