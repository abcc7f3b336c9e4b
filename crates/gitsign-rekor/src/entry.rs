//! Rekor log entry types

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An entry as returned by the log after it was integrated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Entry UUID; the log returns it as the key of the response map
    #[serde(skip)]
    pub uuid: String,
    /// Canonicalized entry body, base64
    pub body: String,
    /// Unix seconds at which the entry was integrated
    pub integrated_time: i64,
    /// Hex SHA-256 of the log's public key
    #[serde(rename = "logID")]
    pub log_id: String,
    pub log_index: i64,
    #[serde(default)]
    pub verification: Option<Verification>,
}

/// The log's promise to include the entry
///
/// Only the signed entry timestamp is kept; inclusion proofs are not
/// checked by the signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    #[serde(default)]
    pub signed_entry_timestamp: Option<String>,
}

/// Body of a successful `POST /api/v1/log/entries`: UUID to entry
pub type LogEntryResponse = HashMap<String, LogEntry>;

/// Take the single entry out of a creation response, keeping its UUID
pub(crate) fn single_entry(response: LogEntryResponse) -> Option<LogEntry> {
    let mut entries = response.into_iter();
    let (uuid, mut entry) = entries.next()?;
    if entries.next().is_some() {
        return None;
    }
    entry.uuid = uuid;
    Some(entry)
}

/// A `hashedrekord` v0.0.1 proposed entry
///
/// Records the payload digest and the signature, together with the
/// certificate that verifies it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedRekord {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub spec: RekordSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct RekordSpec {
    pub data: RekordData,
    pub signature: RekordSignature,
}

#[derive(Debug, Clone, Serialize)]
pub struct RekordData {
    pub hash: RekordHash,
}

#[derive(Debug, Clone, Serialize)]
pub struct RekordHash {
    pub algorithm: &'static str,
    /// Hex digest
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RekordSignature {
    /// Base64 DER signature
    pub content: String,
    pub public_key: RekordVerifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct RekordVerifier {
    /// Base64 of the PEM certificate
    pub content: String,
}

impl HashedRekord {
    /// Describe a signature over a payload with the given SHA-256 digest
    pub fn new(payload_sha256: &[u8; 32], signature: &[u8], certificate_pem: &str) -> Self {
        let hash = RekordHash {
            algorithm: "sha256",
            value: hex::encode(payload_sha256),
        };
        let signature = RekordSignature {
            content: STANDARD.encode(signature),
            public_key: RekordVerifier {
                content: STANDARD.encode(certificate_pem),
            },
        };
        Self {
            api_version: "0.0.1",
            kind: "hashedrekord",
            spec: RekordSpec {
                data: RekordData { hash },
                signature,
            },
        }
    }
}

/// A `dsse` v0.0.1 proposed entry
///
/// The log canonicalizes the envelope itself, so it is submitted as its JSON
/// text rather than base64.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsseRekord {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub spec: DsseSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsseSpec {
    pub proposed_content: DsseProposedContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct DsseProposedContent {
    /// The envelope, JSON encoded
    pub envelope: String,
    /// Base64 PEM certificates able to verify the envelope signatures
    pub verifiers: Vec<String>,
}

impl DsseRekord {
    pub fn new(envelope_json: &str, certificate_pem: &str) -> Self {
        Self {
            api_version: "0.0.1",
            kind: "dsse",
            spec: DsseSpec {
                proposed_content: DsseProposedContent {
                    envelope: envelope_json.to_string(),
                    verifiers: vec![STANDARD.encode(certificate_pem)],
                },
            },
        }
    }
}

/// Any entry the client can submit
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProposedEntry {
    HashedRekord(HashedRekord),
    Dsse(DsseRekord),
}

impl ProposedEntry {
    /// Entry kind as recorded by the log
    pub fn kind(&self) -> &'static str {
        match self {
            ProposedEntry::HashedRekord(entry) => entry.kind,
            ProposedEntry::Dsse(entry) => entry.kind,
        }
    }

    /// Entry kind version
    pub fn version(&self) -> &'static str {
        match self {
            ProposedEntry::HashedRekord(entry) => entry.api_version,
            ProposedEntry::Dsse(entry) => entry.api_version,
        }
    }
}

impl From<HashedRekord> for ProposedEntry {
    fn from(entry: HashedRekord) -> Self {
        ProposedEntry::HashedRekord(entry)
    }
}

impl From<DsseRekord> for ProposedEntry {
    fn from(entry: DsseRekord) -> Self {
        ProposedEntry::Dsse(entry)
    }
}
