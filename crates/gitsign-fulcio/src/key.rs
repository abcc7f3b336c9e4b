//! Ephemeral ECDSA P-256 key pairs

use crate::error::{Error, Result};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{DerSignature, Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rand_core::OsRng;

/// An in-memory signing key that lives for a single signature
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new ECDSA P-256 key pair
    pub fn generate_ecdsa_p256() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Load a P-256 private key from PKCS#8 DER
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_der(der)
            .map_err(|e| Error::Key(format!("invalid PKCS#8 key: {}", e)))?;
        Ok(Self { signing_key })
    }

    /// Sign a message with ECDSA/SHA-256, returning a DER-encoded signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.signing_key.sign(message);
        signature.as_bytes().to_vec()
    }

    /// The public half
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public key as a PEM `PUBLIC KEY` block
    pub fn public_key_pem(&self) -> Result<String> {
        self.verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::Key(format!("failed to encode public key: {}", e)))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

/// Verify a DER-encoded ECDSA P-256/SHA-256 signature
///
/// `public_key_der` is a DER `SubjectPublicKeyInfo`, as found in an X.509
/// certificate.
pub fn verify_signature(public_key_der: &[u8], message: &[u8], signature_der: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::from_public_key_der(public_key_der)
        .map_err(|e| Error::Key(format!("unsupported public key: {}", e)))?;
    let signature = Signature::from_der(signature_der)
        .map_err(|e| Error::Key(format!("malformed signature: {}", e)))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| Error::Key("signature does not match".to_string()))
}
