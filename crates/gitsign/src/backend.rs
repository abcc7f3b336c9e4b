//! Keyless signing backends
//!
//! The command layer only sequences protocol output; obtaining an identity,
//! talking to the transparency log and producing the signature bytes are
//! delegated to a [`KeylessBackend`]. [`SigstoreBackend`] drives the public
//! Sigstore services.

use crate::config::Config;
use crate::error::BoxError;
use crate::signature::{pae, SignOptions, SignatureBundle, TlogEntry, PAYLOAD_TYPE};
use crate::tsa::TimestampClient;
use chrono::{DateTime, Utc};
use gitsign_fulcio::{CertificateChain, FulcioClient, KeyPair};
use gitsign_oidc::{
    get_ambient_token, DeviceCodeResponse, IdentityToken, OAuthClient, OAuthConfig,
    SIGSTORE_AUDIENCE,
};
use gitsign_rekor::{DsseRekord, HashedRekord, ProposedEntry, RekorClient};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

/// The result of a successful sign operation
#[derive(Debug, Clone)]
pub struct SignedArtifact {
    /// Encoded signature, written to the output verbatim
    pub signature: Vec<u8>,
    /// Signing certificate, DER encoded
    pub certificate: Vec<u8>,
    /// When the signature was made
    pub signed_at: DateTime<Utc>,
}

/// Identity provider, transparency log and signer
pub trait KeylessBackend {
    /// A signer identity, valid for one sign operation
    type Identity;
    /// A transparency log client
    type Log;

    /// Resolve the signer identity
    ///
    /// Interactive flows talk to the operator through `tty_in`/`tty_out`;
    /// `tty_in` is `None` when no terminal is attached.
    fn identity(
        &self,
        config: &Config,
        tty_in: Option<&mut (dyn Read + Send)>,
        tty_out: &mut dyn Write,
    ) -> Result<Self::Identity, BoxError>;

    /// Create a transparency log client
    fn transparency_log(&self, config: &Config) -> Result<Self::Log, BoxError>;

    /// Sign `message` and record the signature in `log`
    fn sign(
        &self,
        log: &Self::Log,
        identity: &Self::Identity,
        message: &[u8],
        options: &SignOptions,
    ) -> Result<SignedArtifact, BoxError>;
}

/// An ephemeral key bound to an OIDC identity by a Fulcio certificate
pub struct SigstoreIdentity {
    token: IdentityToken,
    key_pair: KeyPair,
    chain: CertificateChain,
}

impl SigstoreIdentity {
    /// The identity the certificate was issued to
    pub fn principal(&self) -> &str {
        self.token.principal()
    }

    /// The issued certificate chain, leaf first
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }
}

/// Backend for the Sigstore public-good (or a private) deployment
///
/// Network calls run on a current-thread runtime owned by the backend.
pub struct SigstoreBackend {
    runtime: tokio::runtime::Runtime,
}

impl SigstoreBackend {
    pub fn new() -> Result<Self, BoxError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    async fn identity_token(
        &self,
        config: &Config,
        tty_out: &mut dyn Write,
    ) -> Result<IdentityToken, BoxError> {
        if let Some(raw) = &config.identity_token {
            tracing::debug!("using identity token from the environment");
            let token = IdentityToken::from_jwt(raw)?;
            if token.is_expired_at(Utc::now().timestamp()) {
                return Err("identity token has expired".into());
            }
            return Ok(token);
        }

        if let Some(token) = get_ambient_token(SIGSTORE_AUDIENCE).await? {
            return Ok(token);
        }

        let oauth = OAuthClient::new(OAuthConfig::from_issuer(&config.issuer, &config.client_id)?);
        let token = oauth
            .device_flow(|device| {
                if let Err(e) = show_device_code(tty_out, device) {
                    tracing::warn!("failed to show device code: {}", e);
                }
            })
            .await?;
        Ok(token)
    }
}

fn show_device_code(out: &mut dyn Write, device: &DeviceCodeResponse) -> std::io::Result<()> {
    let url = device
        .verification_uri_complete
        .as_deref()
        .unwrap_or(&device.verification_uri);
    writeln!(out, "Go to the following link in a browser:\n\n\t{}\n", url)?;
    writeln!(out, "Enter verification code: {}", device.user_code)?;
    out.flush()
}

impl KeylessBackend for SigstoreBackend {
    type Identity = SigstoreIdentity;
    type Log = RekorClient;

    fn identity(
        &self,
        config: &Config,
        _tty_in: Option<&mut (dyn Read + Send)>,
        tty_out: &mut dyn Write,
    ) -> Result<SigstoreIdentity, BoxError> {
        self.runtime.block_on(async {
            let token = self.identity_token(config, tty_out).await?;
            tracing::debug!("requesting certificate for {}", token.principal());

            let key_pair = KeyPair::generate_ecdsa_p256();
            let chain = FulcioClient::new(&config.fulcio_url)
                .create_signing_certificate(&token, &key_pair)
                .await?;

            Ok(SigstoreIdentity {
                token,
                key_pair,
                chain,
            })
        })
    }

    fn transparency_log(&self, config: &Config) -> Result<RekorClient, BoxError> {
        Ok(RekorClient::new(&config.rekor_url)?)
    }

    fn sign(
        &self,
        log: &RekorClient,
        identity: &SigstoreIdentity,
        message: &[u8],
        options: &SignOptions,
    ) -> Result<SignedArtifact, BoxError> {
        let chain = identity.chain.certificates();
        let bundle = sign_bundle(&identity.key_pair, message, chain, options);

        let proposed = proposed_entry(&bundle, message, &identity.chain.leaf_pem()?)?;
        let (kind, version) = (proposed.kind(), proposed.version());
        let entry = self.runtime.block_on(log.create_entry(proposed))?;
        tracing::debug!("transparency log entry {} at index {}", entry.uuid, entry.log_index);
        let mut bundle = bundle.with_tlog_entry(TlogEntry::from_log_entry(&entry, kind, version)?);

        if let Some(url) = &options.timestamp_authority {
            let signature = bundle.signature_bytes()?;
            let token = self
                .runtime
                .block_on(TimestampClient::new(url).timestamp(&signature))?;
            bundle = bundle.with_timestamp(&token);
        }

        Ok(SignedArtifact {
            signature: bundle.to_bytes(options.armor)?,
            certificate: identity.chain.leaf().to_vec(),
            signed_at: bundle.signed_at()?,
        })
    }
}

/// Sign `message`, detached or embedded in a DSSE envelope
fn sign_bundle(
    key_pair: &KeyPair,
    message: &[u8],
    chain: &[Vec<u8>],
    options: &SignOptions,
) -> SignatureBundle {
    if options.detached {
        let signature = key_pair.sign(message);
        SignatureBundle::detached(&signature, message, chain, options.include_certs)
    } else {
        let signature = key_pair.sign(&pae(PAYLOAD_TYPE, message));
        SignatureBundle::attached(&signature, message, chain, options.include_certs)
    }
}

/// The log entry recording `bundle`: `dsse` for an envelope, `hashedrekord`
/// otherwise
fn proposed_entry(
    bundle: &SignatureBundle,
    message: &[u8],
    leaf_pem: &str,
) -> Result<ProposedEntry, BoxError> {
    let entry = match &bundle.dsse_envelope {
        Some(envelope) => DsseRekord::new(&envelope.to_json()?, leaf_pem).into(),
        None => {
            let digest: [u8; 32] = Sha256::digest(message).into();
            HashedRekord::new(&digest, &bundle.signature_bytes()?, leaf_pem).into()
        }
    };
    Ok(entry)
}
