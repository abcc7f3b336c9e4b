//! The sign operation
//!
//! Git expects `[GNUPG:] BEGIN_SIGNING` before any work that may prompt the
//! operator and `[GNUPG:] SIG_CREATED` once the signature exists, followed
//! by the signature itself on stdout. Protocol lines that were already
//! written are not taken back if a later step fails.

use super::{Command, Options};
use crate::backend::KeylessBackend;
use crate::certificate::CertificateInfo;
use crate::error::{Error, Result};
use crate::io::Streams;
use crate::signature::SignOptions;
use crate::status::{self, SignatureKind, StatusLine};
use std::fs::File;
use std::io::{Read, Write};

/// Signs the message with a keyless backend
pub struct SignCommand<B> {
    backend: B,
}

impl<B: KeylessBackend> SignCommand<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: KeylessBackend> Command for SignCommand<B> {
    fn run(&self, options: &mut Options<'_>, args: &[String]) -> Result<()> {
        let cli = options.cli;
        let config = options.config;
        let streams = &mut *options.streams;
        let mut tty_out = streams.terminal_output();

        let identity = self
            .backend
            .identity(config, streams.terminal_input(), &mut tty_out)
            .map_err(Error::Identity)?;

        status::emit(&mut tty_out, &StatusLine::BeginSigning).map_err(Error::Status)?;

        let message = read_message(streams, args)?;
        tracing::debug!("read {} byte message", message.len());

        let log = self
            .backend
            .transparency_log(config)
            .map_err(Error::RekorClient)?;

        let sign_options = SignOptions {
            detached: cli.detached,
            armor: cli.armor,
            include_certs: cli.include_certs(),
            timestamp_authority: cli
                .timestamp_authority
                .clone()
                .or_else(|| config.timestamp_url.clone()),
        };
        let artifact = self
            .backend
            .sign(&log, &identity, &message, &sign_options)
            .map_err(Error::Sign)?;

        let certificate = CertificateInfo::from_der(&artifact.certificate)?;
        status::emit(
            &mut tty_out,
            &StatusLine::SigCreated {
                kind: SignatureKind::from_detached(cli.detached),
                algorithm: certificate.algorithm,
                created: artifact.signed_at,
                fingerprint: certificate.fingerprint,
            },
        )
        .map_err(Error::Status)?;

        streams
            .out
            .write_all(&artifact.signature)
            .and_then(|_| streams.out.flush())
            .map_err(Error::WriteSignature)
    }
}

/// Read the message from the single file argument, or from stdin
fn read_message(streams: &mut Streams, args: &[String]) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    if let [path] = args {
        let mut file = File::open(path).map_err(|source| Error::OpenMessage {
            path: path.clone(),
            source,
        })?;
        file.read_to_end(&mut message)
            .map_err(|source| Error::ReadMessage {
                origin: path.clone(),
                source,
            })?;
    } else {
        streams
            .input
            .read_to_end(&mut message)
            .map_err(|source| Error::ReadMessage {
                origin: "stdin".to_string(),
                source,
            })?;
    }
    Ok(message)
}
