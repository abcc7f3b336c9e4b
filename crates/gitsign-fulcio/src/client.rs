//! Fulcio v2 signing certificate client

use crate::error::{Error, Result};
use crate::key::KeyPair;
use base64::{engine::general_purpose::STANDARD, Engine};
use gitsign_oidc::IdentityToken;
use serde::{Deserialize, Serialize};
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Decode, DecodePem, Encode, EncodePem};
use x509_cert::Certificate;

/// Public-good Fulcio instance
pub const DEFAULT_FULCIO_URL: &str = "https://fulcio.sigstore.dev";

/// Request body for `POST /api/v2/signingCert`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningCertificateRequest {
    credentials: Credentials,
    public_key_request: PublicKeyRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    oidc_identity_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyRequest {
    public_key: PublicKey,
    /// Base64 signature over the token's principal
    proof_of_possession: String,
}

#[derive(Debug, Serialize)]
struct PublicKey {
    algorithm: String,
    content: String,
}

/// Response body; exactly one of the two variants is populated
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SigningCertificateResponse {
    #[serde(default)]
    signed_certificate_embedded_sct: Option<SignedCertificate>,
    #[serde(default)]
    signed_certificate_detached_sct: Option<SignedCertificate>,
}

#[derive(Debug, Deserialize)]
struct SignedCertificate {
    chain: Chain,
}

#[derive(Debug, Deserialize)]
struct Chain {
    certificates: Vec<String>,
}

/// A certificate chain, leaf first, DER encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Vec<u8>>,
}

impl CertificateChain {
    /// Build a chain from DER certificates, leaf first
    pub fn new(certificates: Vec<Vec<u8>>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(Error::Certificate("empty certificate chain".to_string()));
        }
        Ok(Self { certificates })
    }

    /// Decode a chain of PEM certificates, leaf first
    pub fn from_pem<S: AsRef<str>>(pems: &[S]) -> Result<Self> {
        let certificates = pems
            .iter()
            .map(|pem| {
                let cert = Certificate::from_pem(pem.as_ref().as_bytes())
                    .map_err(|e| Error::Certificate(format!("invalid PEM certificate: {}", e)))?;
                cert.to_der()
                    .map_err(|e| Error::Certificate(format!("failed to encode certificate: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(certificates)
    }

    /// The signing (leaf) certificate
    pub fn leaf(&self) -> &[u8] {
        &self.certificates[0]
    }

    /// All certificates, leaf first
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// The leaf certificate as a PEM block
    pub fn leaf_pem(&self) -> Result<String> {
        Certificate::from_der(self.leaf())
            .and_then(|cert| cert.to_pem(LineEnding::LF))
            .map_err(|e| Error::Certificate(format!("failed to encode leaf certificate: {}", e)))
    }
}

/// Client for a Fulcio certificate authority
pub struct FulcioClient {
    url: String,
    client: reqwest::Client,
}

impl FulcioClient {
    /// Create a client for the Fulcio instance at `url`
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// The base URL of the instance
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request a signing certificate binding `key_pair` to `token`
    ///
    /// The proof of possession is a signature over the token's principal
    /// (email, or subject for workload identities).
    pub async fn create_signing_certificate(
        &self,
        token: &IdentityToken,
        key_pair: &KeyPair,
    ) -> Result<CertificateChain> {
        let endpoint = url::Url::parse(&format!("{}/api/v2/signingCert", self.url))?;
        let proof = key_pair.sign(token.principal().as_bytes());

        let request = SigningCertificateRequest {
            credentials: Credentials {
                oidc_identity_token: token.raw().to_string(),
            },
            public_key_request: PublicKeyRequest {
                public_key: PublicKey {
                    algorithm: "ECDSA".to_string(),
                    content: key_pair.public_key_pem()?,
                },
                proof_of_possession: STANDARD.encode(proof),
            },
        };

        tracing::debug!("requesting signing certificate from {}", endpoint);
        let response = self
            .client
            .post(endpoint)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fulcio(format!(
                "certificate request failed: {} - {}",
                status, body
            )));
        }

        let body: SigningCertificateResponse = response
            .json()
            .await
            .map_err(|e| Error::Fulcio(format!("failed to parse certificate response: {}", e)))?;

        chain_from_response(body)
    }
}

fn chain_from_response(response: SigningCertificateResponse) -> Result<CertificateChain> {
    let signed = response
        .signed_certificate_embedded_sct
        .or(response.signed_certificate_detached_sct)
        .ok_or_else(|| Error::Fulcio("response contains no certificate chain".to_string()))?;
    CertificateChain::from_pem(&signed.chain.certificates)
}
