//! The signature bundle
//!
//! Signatures are Sigstore bundles in their protobuf JSON form: the signing
//! certificate, the transparency log entry and any RFC 3161 timestamp travel
//! with the signature itself. Detached signatures carry a message signature
//! over the payload. Attached signatures carry the payload in a DSSE
//! envelope. With `--armor` the JSON is wrapped in a PEM block labelled
//! `SIGSTORE BUNDLE` so git can store it in a commit header.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use der::pem::{self, LineEnding};
use gitsign_rekor::LogEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bundle v0.1, which still allows a certificate chain
pub const MEDIA_TYPE_V01: &str = "application/vnd.dev.sigstore.bundle+json;version=0.1";

/// Bundle v0.3, carrying the leaf certificate only
pub const MEDIA_TYPE_V03: &str = "application/vnd.dev.sigstore.bundle.v0.3+json";

/// Media types accepted when reading a bundle
const KNOWN_MEDIA_TYPES: [&str; 4] = [
    MEDIA_TYPE_V01,
    "application/vnd.dev.sigstore.bundle+json;version=0.2",
    "application/vnd.dev.sigstore.bundle+json;version=0.3",
    MEDIA_TYPE_V03,
];

/// PEM label of an armored bundle
pub const ARMOR_LABEL: &str = "SIGSTORE BUNDLE";

/// DSSE payload type of attached signatures
pub const PAYLOAD_TYPE: &str = "text/plain";

/// Digest algorithm of every message signature
pub const DIGEST_SHA2_256: &str = "SHA2_256";

/// Which certificates of the chain to embed (GnuPG `--include-certs`)
///
/// `-2` embeds all but the root, `-1` all, `0` none and `n` the first `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeCerts(i32);

impl IncludeCerts {
    /// All certificates except the root
    pub const ALL_BUT_ROOT: IncludeCerts = IncludeCerts(-2);
    /// The whole chain
    pub const ALL: IncludeCerts = IncludeCerts(-1);

    /// Select from a chain ordered leaf first
    pub fn select<'a>(&self, chain: &'a [Vec<u8>]) -> &'a [Vec<u8>] {
        match self.0 {
            -1 => chain,
            n if n < 0 => {
                // A lone leaf is not a root; keep it so the signature
                // stays verifiable.
                if chain.len() > 1 {
                    &chain[..chain.len() - 1]
                } else {
                    chain
                }
            }
            n => &chain[..chain.len().min(n as usize)],
        }
    }
}

impl Default for IncludeCerts {
    fn default() -> Self {
        IncludeCerts::ALL_BUT_ROOT
    }
}

impl From<i32> for IncludeCerts {
    /// Values below `-2` behave like `-2`
    fn from(n: i32) -> Self {
        IncludeCerts(n.max(-2))
    }
}

/// How the caller wants the signature produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Leave the payload out of the signature
    pub detached: bool,
    /// PEM-armor the output
    pub armor: bool,
    /// Certificate inclusion policy
    pub include_certs: IncludeCerts,
    /// RFC 3161 timestamp authority to countersign with
    pub timestamp_authority: Option<String>,
}

/// protobuf JSON renders 64-bit integers as strings
mod int64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(D::Error::custom),
            Repr::Number(n) => Ok(n),
        }
    }
}

/// A DER certificate, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCertificate {
    pub raw_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct X509CertificateChain {
    pub certificates: Vec<RawCertificate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogId {
    /// Base64 of the log's key id
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindVersion {
    pub kind: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionPromise {
    pub signed_entry_timestamp: String,
}

/// A transparency log entry backing the signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlogEntry {
    #[serde(with = "int64")]
    pub log_index: i64,
    pub log_id: LogId,
    pub kind_version: KindVersion,
    /// Unix seconds at which the log integrated the entry
    #[serde(with = "int64")]
    pub integrated_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_promise: Option<InclusionPromise>,
    /// Base64 canonical entry body
    pub canonicalized_body: String,
}

impl TlogEntry {
    /// Record an entry as returned by Rekor
    ///
    /// Rekor reports the log id in hex; bundles carry the raw bytes.
    pub fn from_log_entry(entry: &LogEntry, kind: &str, version: &str) -> Result<Self> {
        let key_id = hex::decode(&entry.log_id)
            .map_err(|e| Error::Signature(format!("invalid log id {}: {}", entry.log_id, e)))?;
        Ok(Self {
            log_index: entry.log_index,
            log_id: LogId {
                key_id: STANDARD.encode(key_id),
            },
            kind_version: KindVersion {
                kind: kind.to_string(),
                version: version.to_string(),
            },
            integrated_time: entry.integrated_time,
            inclusion_promise: entry
                .verification
                .as_ref()
                .and_then(|verification| verification.signed_entry_timestamp.clone())
                .map(|set| InclusionPromise {
                    signed_entry_timestamp: set,
                }),
            canonicalized_body: entry.body.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rfc3161Timestamp {
    /// Base64 DER `TimeStampToken`
    pub signed_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampVerificationData {
    pub rfc3161_timestamps: Vec<Rfc3161Timestamp>,
}

/// Everything needed to check the signature besides the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMaterial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<RawCertificate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509_certificate_chain: Option<X509CertificateChain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tlog_entries: Vec<TlogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_verification_data: Option<TimestampVerificationData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDigest {
    pub algorithm: String,
    /// Base64 digest of the payload
    pub digest: String,
}

/// A signature over a payload that travels separately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSignature {
    pub message_digest: MessageDigest,
    /// Base64 DER ECDSA signature
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsseSignature {
    /// Base64 DER ECDSA signature over the PAE
    pub sig: String,
    #[serde(default)]
    pub keyid: String,
}

/// A payload together with signatures over its pre-authentication encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsseEnvelope {
    /// Base64 payload
    pub payload: String,
    pub payload_type: String,
    pub signatures: Vec<DsseSignature>,
}

impl DsseEnvelope {
    /// JSON text, as submitted to the transparency log
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Signature(format!("failed to encode envelope: {}", e)))
    }
}

/// DSSE pre-authentication encoding: `DSSEv1 <len> <type> <len> <payload>`
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut encoded = format!(
        "DSSEv1 {} {} {} ",
        payload_type.len(),
        payload_type,
        payload.len()
    )
    .into_bytes();
    encoded.extend_from_slice(payload);
    encoded
}

/// A Sigstore bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBundle {
    pub media_type: String,
    pub verification_material: VerificationMaterial,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_signature: Option<MessageSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsse_envelope: Option<DsseEnvelope>,
}

impl SignatureBundle {
    /// Bundle a signature over `message`, which is not embedded
    pub fn detached(
        signature: &[u8],
        message: &[u8],
        chain: &[Vec<u8>],
        include: IncludeCerts,
    ) -> Self {
        let mut bundle = Self::with_certificates(include.select(chain));
        bundle.message_signature = Some(MessageSignature {
            message_digest: MessageDigest {
                algorithm: DIGEST_SHA2_256.to_string(),
                digest: STANDARD.encode(Sha256::digest(message)),
            },
            signature: STANDARD.encode(signature),
        });
        bundle
    }

    /// Bundle `payload` with a signature over its [`pae`]
    pub fn attached(
        signature: &[u8],
        payload: &[u8],
        chain: &[Vec<u8>],
        include: IncludeCerts,
    ) -> Self {
        let mut bundle = Self::with_certificates(include.select(chain));
        bundle.dsse_envelope = Some(DsseEnvelope {
            payload: STANDARD.encode(payload),
            payload_type: PAYLOAD_TYPE.to_string(),
            signatures: vec![DsseSignature {
                sig: STANDARD.encode(signature),
                keyid: String::new(),
            }],
        });
        bundle
    }

    /// A lone leaf goes in the v0.3 `certificate` field; anything else
    /// needs the v0.1 chain.
    fn with_certificates(certificates: &[Vec<u8>]) -> Self {
        let raw = |der: &Vec<u8>| RawCertificate {
            raw_bytes: STANDARD.encode(der),
        };
        let (media_type, certificate, chain) = match certificates {
            [leaf] => (MEDIA_TYPE_V03, Some(raw(leaf)), None),
            _ => (
                MEDIA_TYPE_V01,
                None,
                Some(X509CertificateChain {
                    certificates: certificates.iter().map(raw).collect(),
                }),
            ),
        };
        Self {
            media_type: media_type.to_string(),
            verification_material: VerificationMaterial {
                certificate,
                x509_certificate_chain: chain,
                tlog_entries: Vec::new(),
                timestamp_verification_data: None,
            },
            message_signature: None,
            dsse_envelope: None,
        }
    }

    pub fn with_tlog_entry(mut self, entry: TlogEntry) -> Self {
        self.verification_material.tlog_entries.push(entry);
        self
    }

    pub fn with_timestamp(mut self, token: &[u8]) -> Self {
        let timestamp = Rfc3161Timestamp {
            signed_timestamp: STANDARD.encode(token),
        };
        self.verification_material
            .timestamp_verification_data
            .get_or_insert_with(|| TimestampVerificationData {
                rfc3161_timestamps: Vec::new(),
            })
            .rfc3161_timestamps
            .push(timestamp);
        self
    }

    /// Whether the payload travels separately
    pub fn is_detached(&self) -> bool {
        self.dsse_envelope.is_none()
    }

    /// The raw signature
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        let encoded = match (&self.message_signature, &self.dsse_envelope) {
            (Some(signature), _) => &signature.signature,
            (None, Some(envelope)) => envelope
                .signatures
                .first()
                .map(|signature| &signature.sig)
                .ok_or_else(|| Error::Signature("envelope carries no signature".to_string()))?,
            (None, None) => return Err(Error::Signature("bundle carries no signature".to_string())),
        };
        decode_field("signature", encoded)
    }

    /// The embedded payload, if any
    pub fn content_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.dsse_envelope
            .as_ref()
            .map(|envelope| decode_field("payload", &envelope.payload))
            .transpose()
    }

    /// The bytes the signature was computed over, given the payload
    pub fn signing_input(&self, payload: &[u8]) -> Vec<u8> {
        match &self.dsse_envelope {
            Some(envelope) => pae(&envelope.payload_type, payload),
            None => payload.to_vec(),
        }
    }

    /// Check a detached payload against the recorded digest
    pub fn check_digest(&self, payload: &[u8]) -> Result<()> {
        let Some(signature) = &self.message_signature else {
            return Ok(());
        };
        let recorded = decode_field("digest", &signature.message_digest.digest)?;
        if recorded != Sha256::digest(payload).as_slice() {
            return Err(Error::Verify("payload does not match the signed digest".to_string()));
        }
        Ok(())
    }

    /// The signing certificate, DER encoded
    pub fn leaf_certificate(&self) -> Result<Vec<u8>> {
        let material = &self.verification_material;
        let leaf = material
            .certificate
            .as_ref()
            .or_else(|| {
                material
                    .x509_certificate_chain
                    .as_ref()
                    .and_then(|chain| chain.certificates.first())
            })
            .ok_or_else(|| Error::Signature("signature carries no certificate".to_string()))?;
        decode_field("certificate", &leaf.raw_bytes)
    }

    /// The transparency log entry, if the signature was logged
    pub fn tlog_entry(&self) -> Option<&TlogEntry> {
        self.verification_material.tlog_entries.first()
    }

    /// When the signature was made: the log's integration time
    pub fn signed_at(&self) -> Result<DateTime<Utc>> {
        let entry = self.tlog_entry().ok_or_else(|| {
            Error::Signature("signature carries no transparency log entry".to_string())
        })?;
        DateTime::from_timestamp(entry.integrated_time, 0).ok_or_else(|| {
            Error::Signature(format!("invalid integrated time {}", entry.integrated_time))
        })
    }

    /// Serialize, optionally PEM-armored
    pub fn to_bytes(&self, armored: bool) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)
            .map_err(|e| Error::Signature(format!("failed to encode bundle: {}", e)))?;
        if armored {
            Ok(armor(ARMOR_LABEL, &json)?.into_bytes())
        } else {
            Ok(json)
        }
    }

    /// Parse a bundle, armored or not
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let trimmed = bytes.trim_ascii_start();
        let json = if trimmed.starts_with(b"-----BEGIN") {
            dearmor(ARMOR_LABEL, trimmed)?
        } else {
            bytes.to_vec()
        };

        let bundle: SignatureBundle = serde_json::from_slice(&json)
            .map_err(|e| Error::Signature(format!("failed to parse bundle: {}", e)))?;
        if !KNOWN_MEDIA_TYPES.contains(&bundle.media_type.as_str()) {
            return Err(Error::Signature(format!(
                "unsupported media type {}",
                bundle.media_type
            )));
        }
        match (&bundle.message_signature, &bundle.dsse_envelope) {
            (Some(signature), None) => {
                if signature.message_digest.algorithm != DIGEST_SHA2_256 {
                    return Err(Error::Signature(format!(
                        "unsupported digest algorithm {}",
                        signature.message_digest.algorithm
                    )));
                }
            }
            (None, Some(_)) => {}
            _ => {
                return Err(Error::Signature(
                    "bundle must carry exactly one of messageSignature and dsseEnvelope"
                        .to_string(),
                ))
            }
        }
        Ok(bundle)
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| Error::Signature(format!("invalid base64 in {}: {}", name, e)))
}

/// Wrap bytes in a PEM block
pub fn armor(label: &str, bytes: &[u8]) -> Result<String> {
    pem::encode_string(label, LineEnding::LF, bytes)
        .map_err(|e| Error::Signature(format!("failed to armor signature: {}", e)))
}

/// Unwrap a PEM block, which must carry `label`
pub fn dearmor(label: &str, text: &[u8]) -> Result<Vec<u8>> {
    let (found, bytes) =
        pem::decode_vec(text).map_err(|e| Error::Signature(format!("invalid armor: {}", e)))?;
    if found != label {
        return Err(Error::Signature(format!(
            "expected {} armor, found {}",
            label, found
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsign_rekor::Verification;

    fn chain() -> Vec<Vec<u8>> {
        vec![b"leaf".to_vec(), b"intermediate".to_vec(), b"root".to_vec()]
    }

    fn log_entry() -> LogEntry {
        LogEntry {
            uuid: "24296fb24b8ad77a".to_string(),
            body: "e30=".to_string(),
            integrated_time: 1709294400,
            log_id: "c0d23d6a".to_string(),
            log_index: 42,
            verification: Some(Verification {
                signed_entry_timestamp: Some("MEUC".to_string()),
            }),
        }
    }

    #[test]
    fn test_include_certs_policy() {
        let chain = chain();
        assert_eq!(IncludeCerts::default().select(&chain).len(), 2);
        assert_eq!(IncludeCerts::ALL.select(&chain).len(), 3);
        assert_eq!(IncludeCerts::from(0).select(&chain).len(), 0);
        assert_eq!(IncludeCerts::from(1).select(&chain), &chain[..1]);
        assert_eq!(IncludeCerts::from(10).select(&chain).len(), 3);
        assert_eq!(IncludeCerts::from(-7), IncludeCerts::ALL_BUT_ROOT);

        let leaf_only = vec![b"leaf".to_vec()];
        assert_eq!(IncludeCerts::default().select(&leaf_only).len(), 1);
    }

    #[test]
    fn test_tlog_entry_from_rekor() {
        let entry = TlogEntry::from_log_entry(&log_entry(), "hashedrekord", "0.0.1").unwrap();
        assert_eq!(entry.log_id.key_id, STANDARD.encode([0xc0, 0xd2, 0x3d, 0x6a]));
        assert_eq!(entry.kind_version.kind, "hashedrekord");
        assert_eq!(
            entry.inclusion_promise.unwrap().signed_entry_timestamp,
            "MEUC"
        );

        let json = serde_json::to_value(
            TlogEntry::from_log_entry(&log_entry(), "dsse", "0.0.1").unwrap(),
        )
        .unwrap();
        assert_eq!(json["logIndex"], "42");
        assert_eq!(json["integratedTime"], "1709294400");
        assert_eq!(json["canonicalizedBody"], "e30=");

        let mut bad = log_entry();
        bad.log_id = "not hex".to_string();
        assert!(TlogEntry::from_log_entry(&bad, "dsse", "0.0.1").is_err());
    }

    #[test]
    fn test_attached_bundle_parses_back() {
        let tlog = TlogEntry::from_log_entry(&log_entry(), "dsse", "0.0.1").unwrap();
        let bundle = SignatureBundle::attached(b"sig", b"tree 4b825dc6\n", &chain(), IncludeCerts::default())
            .with_tlog_entry(tlog)
            .with_timestamp(b"token");

        let armored = bundle.to_bytes(true).unwrap();
        let text = String::from_utf8(armored.clone()).unwrap();
        assert!(text.starts_with("-----BEGIN SIGSTORE BUNDLE-----\n"));
        assert!(text.trim_end().ends_with("-----END SIGSTORE BUNDLE-----"));
        assert!(text.lines().all(|line| line.len() <= 64));

        let parsed = SignatureBundle::from_bytes(&armored).unwrap();
        assert_eq!(parsed, bundle);
        assert_eq!(parsed.media_type, MEDIA_TYPE_V01);
        assert!(!parsed.is_detached());
        assert_eq!(parsed.content_bytes().unwrap().unwrap(), b"tree 4b825dc6\n");
        assert_eq!(parsed.signature_bytes().unwrap(), b"sig");
        assert_eq!(parsed.leaf_certificate().unwrap(), b"leaf");
        assert_eq!(parsed.signed_at().unwrap().timestamp(), 1709294400);
        assert_eq!(
            parsed.signing_input(b"hi"),
            b"DSSEv1 10 text/plain 2 hi".to_vec()
        );
    }

    #[test]
    fn test_detached_bundle_protobuf_json() {
        let bundle = SignatureBundle::detached(b"sig", b"payload", &chain(), IncludeCerts::from(1));
        let json: serde_json::Value =
            serde_json::from_slice(&bundle.to_bytes(false).unwrap()).unwrap();

        assert_eq!(json["mediaType"], MEDIA_TYPE_V03);
        assert_eq!(
            json["verificationMaterial"]["certificate"]["rawBytes"],
            STANDARD.encode("leaf")
        );
        assert!(json["verificationMaterial"].get("x509CertificateChain").is_none());
        assert_eq!(json["messageSignature"]["messageDigest"]["algorithm"], "SHA2_256");
        assert_eq!(
            json["messageSignature"]["messageDigest"]["digest"],
            STANDARD.encode(Sha256::digest(b"payload"))
        );
        assert!(json.get("dsseEnvelope").is_none());

        let parsed = SignatureBundle::from_bytes(&bundle.to_bytes(false).unwrap()).unwrap();
        assert!(parsed.is_detached());
        assert_eq!(parsed.signing_input(b"payload"), b"payload");
        parsed.check_digest(b"payload").unwrap();
        assert!(matches!(parsed.check_digest(b"other"), Err(Error::Verify(_))));
        // no log entry recorded
        assert!(parsed.signed_at().is_err());
    }

    #[test]
    fn test_armor_label_must_match() {
        let armored = String::from_utf8(
            SignatureBundle::detached(b"sig", b"payload", &chain(), IncludeCerts::ALL)
                .to_bytes(true)
                .unwrap(),
        )
        .unwrap();

        let mismatched_end = armored.replace("-----END SIGSTORE BUNDLE-----", "-----END CERTIFICATE-----");
        assert!(SignatureBundle::from_bytes(mismatched_end.as_bytes()).is_err());

        let other_label = armored.replace("SIGSTORE BUNDLE", "SIGNED MESSAGE");
        assert!(matches!(
            SignatureBundle::from_bytes(other_label.as_bytes()),
            Err(Error::Signature(_))
        ));
    }

    #[test]
    fn test_rejects_foreign_documents() {
        assert!(SignatureBundle::from_bytes(b"-----BEGIN PGP SIGNATURE-----\nabc\n").is_err());
        assert!(SignatureBundle::from_bytes(b"{}").is_err());

        let mut bundle = SignatureBundle::detached(b"sig", b"payload", &chain(), IncludeCerts::ALL);
        bundle.media_type = "application/pkcs7-signature".to_string();
        let bytes = serde_json::to_vec(&bundle).unwrap();
        assert!(SignatureBundle::from_bytes(&bytes).is_err());

        let mut both = SignatureBundle::detached(b"sig", b"payload", &chain(), IncludeCerts::ALL);
        both.dsse_envelope =
            SignatureBundle::attached(b"sig", b"payload", &chain(), IncludeCerts::ALL).dsse_envelope;
        assert!(SignatureBundle::from_bytes(&serde_json::to_vec(&both).unwrap()).is_err());
    }

    #[test]
    fn test_no_certificates() {
        let bundle = SignatureBundle::detached(b"sig", b"payload", &chain(), IncludeCerts::from(0));
        assert!(matches!(bundle.leaf_certificate(), Err(Error::Signature(_))));
    }
}
