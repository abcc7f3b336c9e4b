//! Signing certificate metadata
//!
//! Fulcio certificates carry the signer's identity in the subject
//! alternative name and the OIDC issuer in a Sigstore-specific extension.
//! GnuPG status lines need a fingerprint and key id, which are derived from
//! the certificate's DER encoding.

use crate::error::{Error, Result};
use crate::status::PublicKeyAlgorithm;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::time::Time;
use x509_cert::Certificate;

/// Fulcio issuer extension, raw string value (deprecated form)
pub const OID_FULCIO_ISSUER: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.1");

/// Fulcio issuer extension, DER UTF8String value
pub const OID_FULCIO_ISSUER_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.8");

const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Length of a GnuPG long key id, in hex digits
const KEY_ID_LEN: usize = 16;

/// What the status protocol and the operator need to know about a certificate
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    der: Vec<u8>,
    public_key_der: Vec<u8>,
    /// Uppercase hex SHA-1 of the DER encoding
    pub fingerprint: String,
    /// Public-key algorithm of the subject key
    pub algorithm: PublicKeyAlgorithm,
    /// Email or URI from the SAN, or the subject DN
    pub identity: String,
    /// OIDC issuer that vouched for the identity
    pub issuer: Option<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl CertificateInfo {
    /// Parse a DER-encoded X.509 certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse certificate: {}", e)))?;
        let tbs = &cert.tbs_certificate;

        let spki = &tbs.subject_public_key_info;
        let algorithm = public_key_algorithm(&spki.algorithm.oid)?;
        let public_key_der = spki
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode public key: {}", e)))?;

        Ok(Self {
            der: der.to_vec(),
            public_key_der,
            fingerprint: fingerprint(der),
            algorithm,
            identity: identity(&cert)?,
            issuer: issuer(&cert),
            not_before: to_datetime(&tbs.validity.not_before)?,
            not_after: to_datetime(&tbs.validity.not_after)?,
        })
    }

    /// The GnuPG long key id: the last 16 hex digits of the fingerprint
    pub fn key_id(&self) -> &str {
        let start = self.fingerprint.len().saturating_sub(KEY_ID_LEN);
        &self.fingerprint[start..]
    }

    /// DER `SubjectPublicKeyInfo` of the subject key
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// The certificate as given
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Whether `at` falls inside the validity window
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Uppercase hex SHA-1 over a certificate's DER encoding
pub fn fingerprint(der: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(der))
}

fn public_key_algorithm(oid: &ObjectIdentifier) -> Result<PublicKeyAlgorithm> {
    let known = [
        (OID_EC_PUBLIC_KEY, PublicKeyAlgorithm::Ecdsa),
        (OID_RSA_ENCRYPTION, PublicKeyAlgorithm::Rsa),
        (OID_DSA, PublicKeyAlgorithm::Dsa),
        (OID_ED25519, PublicKeyAlgorithm::Ed25519),
    ];
    known
        .iter()
        .find(|(known_oid, _)| known_oid == oid)
        .map(|(_, algorithm)| *algorithm)
        .ok_or_else(|| {
            Error::Certificate(format!("unsupported public key algorithm {}", oid))
        })
}

fn identity(cert: &Certificate) -> Result<String> {
    let san = cert
        .tbs_certificate
        .get::<SubjectAltName>()
        .map_err(|e| Error::Certificate(format!("malformed subject alternative name: {}", e)))?;

    if let Some((_, SubjectAltName(names))) = san {
        let email = names.iter().find_map(|name| match name {
            GeneralName::Rfc822Name(email) => Some(email.to_string()),
            _ => None,
        });
        let uri = names.iter().find_map(|name| match name {
            GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
            _ => None,
        });
        if let Some(identity) = email.or(uri) {
            return Ok(identity);
        }
    }

    Ok(cert.tbs_certificate.subject.to_string())
}

fn issuer(cert: &Certificate) -> Option<String> {
    let extensions = cert.tbs_certificate.extensions.as_ref()?;

    let v2 = extensions
        .iter()
        .find(|ext| ext.extn_id == OID_FULCIO_ISSUER_V2)
        .and_then(|ext| String::from_der(ext.extn_value.as_bytes()).ok());

    v2.or_else(|| {
        extensions
            .iter()
            .find(|ext| ext.extn_id == OID_FULCIO_ISSUER)
            .and_then(|ext| String::from_utf8(ext.extn_value.as_bytes().to_vec()).ok())
    })
}

fn to_datetime(time: &Time) -> Result<DateTime<Utc>> {
    let secs = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|_| Error::Certificate("validity time out of range".to_string()))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Certificate("validity time out of range".to_string()))
}

/// Throwaway certificates for tests
#[cfg(test)]
pub(crate) mod testing {
    /// A self-signed P-256 certificate for `email`, with a Fulcio issuer
    /// extension. Returns the certificate DER and the PKCS#8 private key.
    pub(crate) fn certificate(email: &str) -> (Vec<u8>, Vec<u8>) {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.subject_alt_names = vec![rcgen::SanType::Rfc822Name(email.try_into().unwrap())];
        params
            .custom_extensions
            .push(rcgen::CustomExtension::from_oid_content(
                &[1, 3, 6, 1, 4, 1, 57264, 1, 1],
                b"https://github.com/login/oauth".to_vec(),
            ));
        let cert = params.self_signed(&key).unwrap();
        (cert.der().to_vec(), key.serialize_der())
    }
}
