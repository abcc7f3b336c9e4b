//! The verify operation
//!
//! Checks the signature against the certificate it carries and reports the
//! result to git as status lines. Trust in the certificate itself (chain to
//! the Fulcio root, transparency log inclusion) is out of scope here.

use super::{Command, Options};
use crate::certificate::CertificateInfo;
use crate::error::{Error, Result};
use crate::io::Streams;
use crate::signature::SignatureBundle;
use crate::status::{self, StatusLine};
use std::io::{Read, Write};

/// Argument naming stdin
const STDIN_ARG: &str = "-";

/// Verifies attached or detached signatures
#[derive(Debug, Default)]
pub struct VerifyCommand;

impl VerifyCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for VerifyCommand {
    fn run(&self, options: &mut Options<'_>, args: &[String]) -> Result<()> {
        let streams = &mut *options.streams;

        let (signature, data) = match args {
            [] => (read_source(streams, STDIN_ARG)?, None),
            [signature] => (read_source(streams, signature)?, None),
            [signature, data] => (
                read_source(streams, signature)?,
                Some(read_source(streams, data)?),
            ),
            _ => {
                return Err(Error::Verify(
                    "expected <signature> or <signature> <data>".to_string(),
                ))
            }
        };

        let bundle = SignatureBundle::from_bytes(&signature)?;
        let payload = match (bundle.content_bytes()?, data) {
            (Some(content), None) => content,
            (None, Some(data)) => data,
            (None, None) => {
                return Err(Error::Verify(
                    "detached signature given without the signed data".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Verify(
                    "attached signature given with separate data".to_string(),
                ))
            }
        };

        let certificate = CertificateInfo::from_der(&bundle.leaf_certificate()?)?;
        let signed_at = bundle.signed_at()?;

        let mut status_out = streams.status_output(options.cli.status_fd);
        status::emit(&mut status_out, &StatusLine::NewSig).map_err(Error::Status)?;

        writeln!(
            streams.err,
            "gitsign: Signature made using certificate ID 0x{}",
            certificate.key_id()
        )
        .map_err(Error::Status)?;

        if let Err(err) = check(&bundle, &certificate, &payload, signed_at) {
            status::emit(
                &mut status_out,
                &StatusLine::BadSig {
                    key_id: certificate.key_id().to_string(),
                    user_id: certificate.identity.clone(),
                },
            )
            .map_err(Error::Status)?;
            writeln!(streams.err, "gitsign: Bad signature from [{}]", certificate.identity)
                .map_err(Error::Status)?;
            return Err(err);
        }

        for line in [
            StatusLine::GoodSig {
                key_id: certificate.key_id().to_string(),
                user_id: certificate.identity.clone(),
            },
            StatusLine::ValidSig {
                fingerprint: certificate.fingerprint.clone(),
                created: signed_at,
                algorithm: certificate.algorithm,
            },
            StatusLine::TrustFully,
        ] {
            status::emit(&mut status_out, &line).map_err(Error::Status)?;
        }

        write_summary(streams, &certificate, &bundle).map_err(Error::Status)
    }
}

/// Check the signature over `payload` and the certificate's validity window
fn check(
    bundle: &SignatureBundle,
    certificate: &CertificateInfo,
    payload: &[u8],
    signed_at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    bundle.check_digest(payload)?;
    let signature = bundle.signature_bytes()?;
    gitsign_fulcio::verify_signature(
        certificate.public_key_der(),
        &bundle.signing_input(payload),
        &signature,
    )
    .map_err(|e| Error::Verify(e.to_string()))?;

    if !certificate.is_valid_at(signed_at) {
        return Err(Error::Verify(format!(
            "certificate was not valid at signing time {}",
            signed_at
        )));
    }
    Ok(())
}

fn write_summary(
    streams: &mut Streams,
    certificate: &CertificateInfo,
    bundle: &SignatureBundle,
) -> std::io::Result<()> {
    match &certificate.issuer {
        Some(issuer) => writeln!(
            streams.err,
            "gitsign: Good signature from [{}]({})",
            certificate.identity, issuer
        )?,
        None => writeln!(
            streams.err,
            "gitsign: Good signature from [{}]",
            certificate.identity
        )?,
    }
    if let Some(entry) = bundle.tlog_entry() {
        writeln!(
            streams.err,
            "gitsign: Transparency log entry at index {}",
            entry.log_index
        )?;
    }
    Ok(())
}

/// Read a whole file, or stdin for `-`
fn read_source(streams: &mut Streams, path: &str) -> Result<Vec<u8>> {
    if path == STDIN_ARG {
        let mut bytes = Vec::new();
        streams
            .input
            .read_to_end(&mut bytes)
            .map_err(|source| Error::ReadMessage {
                origin: "stdin".to_string(),
                source,
            })?;
        return Ok(bytes);
    }

    std::fs::read(path).map_err(|source| Error::ReadMessage {
        origin: path.to_string(),
        source,
    })
}
