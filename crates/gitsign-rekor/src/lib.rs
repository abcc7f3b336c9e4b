//! Rekor transparency log client
//!
//! Every keyless signature is recorded in Rekor so that anyone can audit
//! which certificates were used to sign what. This crate covers the
//! `hashedrekord` and `dsse` entry kinds of the v1 API, which is all the
//! signer needs.

pub mod client;
pub mod entry;
pub mod error;

pub use client::{RekorClient, DEFAULT_REKOR_URL};
pub use entry::{DsseRekord, HashedRekord, LogEntry, LogEntryResponse, ProposedEntry, Verification};
pub use error::{Error, Result};
