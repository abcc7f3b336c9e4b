//! Keyless git signing with Sigstore
//!
//! Git hands commit and tag signing to an external program that speaks the
//! GnuPG command-line and status-line interface. This crate implements that
//! interface on top of Sigstore: the signer proves an OIDC identity, Fulcio
//! issues a short-lived certificate for an ephemeral key, and the signature
//! is recorded in the Rekor transparency log.
//!
//! # Example
//!
//! ```no_run
//! use gitsign::commands::{execute, Options};
//! use gitsign::{Cli, Config, SigstoreBackend, Streams};
//! use clap::Parser;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let cli = Cli::parse();
//! let config = Config::load();
//!
//! let mut streams = Streams::new(config.log_path.clone());
//! streams.wrap(|streams| {
//!     config.log_load_errors();
//!     let mut options = Options { cli: &cli, config: &config, streams };
//!     execute(&mut options, &cli.args, SigstoreBackend::new)
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod certificate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod io;
pub mod signature;
pub mod status;
pub mod tsa;

pub use backend::{KeylessBackend, SignedArtifact, SigstoreBackend};
pub use cli::Cli;
pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use io::Streams;
pub use signature::{IncludeCerts, SignOptions, SignatureBundle};
