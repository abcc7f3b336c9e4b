//! RFC 3161 timestamping
//!
//! Countersigning the signature with a trusted timestamp proves it existed
//! while the short-lived certificate was valid. Only the response status is
//! inspected; the token is stored in the signature bundle as is.

use crate::error::BoxError;
use der::asn1::{BitString, OctetString};
use der::oid::ObjectIdentifier;
use der::{Any, Decode, Encode, Sequence};
use sha2::{Digest, Sha256};
use x509_cert::spki::AlgorithmIdentifierOwned;

/// Content type of a timestamp request
pub const TIMESTAMP_QUERY: &str = "application/timestamp-query";

/// Content type of a timestamp response
pub const TIMESTAMP_REPLY: &str = "application/timestamp-reply";

/// id-sha256
const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// ```text
/// MessageImprint ::= SEQUENCE {
///     hashAlgorithm AlgorithmIdentifier,
///     hashedMessage OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    pub hash_algorithm: AlgorithmIdentifierOwned,
    pub hashed_message: OctetString,
}

/// A v1 `TimeStampReq` without policy, nonce or extensions
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    pub version: u8,
    pub message_imprint: MessageImprint,
    /// Ask the authority to put its certificate in the token
    pub cert_req: bool,
}

impl TimeStampReq {
    /// Request a timestamp over SHA-256 of `data`
    pub fn sha256(data: &[u8]) -> der::Result<Self> {
        Ok(Self {
            version: 1,
            message_imprint: MessageImprint {
                hash_algorithm: AlgorithmIdentifierOwned {
                    oid: ID_SHA256,
                    parameters: Some(Any::null()),
                },
                hashed_message: OctetString::new(Sha256::digest(data).to_vec())?,
            },
            cert_req: true,
        })
    }
}

/// ```text
/// PKIStatusInfo ::= SEQUENCE {
///     status       PKIStatus,
///     statusString PKIFreeText     OPTIONAL,
///     failInfo     PKIFailureInfo  OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    pub status: u32,
    pub status_string: Option<Vec<String>>,
    pub fail_info: Option<BitString>,
}

/// `TimeStampResp ::= SEQUENCE { status PKIStatusInfo, timeStampToken OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampResp {
    pub status: PkiStatusInfo,
    /// CMS `ContentInfo` carrying the signed TSTInfo
    pub time_stamp_token: Option<Any>,
}

impl TimeStampResp {
    /// granted (0) or grantedWithMods (1)
    pub fn is_granted(&self) -> bool {
        matches!(self.status.status, 0 | 1)
    }

    /// The DER `TimeStampToken` of a granted response
    pub fn into_token(self) -> Result<Vec<u8>, BoxError> {
        if !self.is_granted() {
            let reason = self
                .status
                .status_string
                .map(|text| format!(" ({})", text.join("; ")))
                .unwrap_or_default();
            return Err(format!(
                "timestamp request rejected with status {}{}",
                self.status.status, reason
            )
            .into());
        }
        let token = self
            .time_stamp_token
            .ok_or("timestamp response carries no token")?;
        Ok(token.to_der()?)
    }
}

/// Client for an RFC 3161 timestamp authority
#[derive(Debug, Clone)]
pub struct TimestampClient {
    url: String,
    client: reqwest::Client,
}

impl TimestampClient {
    /// Create a client for the authority at `url`
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Timestamp `signature`, returning the DER `TimeStampToken`
    pub async fn timestamp(&self, signature: &[u8]) -> Result<Vec<u8>, BoxError> {
        let request = TimeStampReq::sha256(signature)?.to_der()?;

        tracing::debug!("requesting timestamp from {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", TIMESTAMP_QUERY)
            .header("Accept", TIMESTAMP_REPLY)
            .body(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("timestamp authority returned {}", response.status()).into());
        }

        let body = response.bytes().await?;
        TimeStampResp::from_der(&body)
            .map_err(|e| format!("malformed timestamp response: {}", e))?
            .into_token()
    }
}
