//! Fulcio certificate issuance
//!
//! Keyless signing binds a freshly generated key pair to an OIDC identity
//! through a short-lived certificate issued by Fulcio. This crate provides
//! the ephemeral key pair and the client for Fulcio's v2 `signingCert` API.

pub mod client;
pub mod error;
pub mod key;

pub use client::{CertificateChain, FulcioClient, DEFAULT_FULCIO_URL};
pub use error::{Error, Result};
pub use key::{verify_signature, KeyPair};
