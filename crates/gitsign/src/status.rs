//! GnuPG status-line protocol
//!
//! Git reads machine-readable progress from the signing program as lines of
//! the form `[GNUPG:] <KEYWORD> <args>`. Only the keywords git looks at are
//! modelled here.

use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{self, Write};

/// Prefix of every status line
pub const STATUS_PREFIX: &str = "[GNUPG:]";

/// OpenPGP hash algorithm id for SHA-256
pub const HASH_ALGORITHM_SHA256: u8 = 8;

/// Signature class reported for binary document signatures
pub const SIGNATURE_CLASS_BINARY: &str = "00";

/// Whether a signature travels separately from its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Payload not embedded (`D`)
    Detached,
    /// Payload embedded (`S`)
    Attached,
}

impl SignatureKind {
    /// Pick the kind from the detach flag
    pub fn from_detached(detached: bool) -> Self {
        if detached {
            SignatureKind::Detached
        } else {
            SignatureKind::Attached
        }
    }

    fn code(self) -> char {
        match self {
            SignatureKind::Detached => 'D',
            SignatureKind::Attached => 'S',
        }
    }
}

/// OpenPGP public-key algorithm ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyAlgorithm {
    Rsa,
    Dsa,
    Ecdsa,
    Ed25519,
}

impl PublicKeyAlgorithm {
    /// Numeric id as used in `SIG_CREATED` and `VALIDSIG`
    pub fn id(self) -> u8 {
        match self {
            PublicKeyAlgorithm::Rsa => 1,
            PublicKeyAlgorithm::Dsa => 17,
            PublicKeyAlgorithm::Ecdsa => 19,
            PublicKeyAlgorithm::Ed25519 => 22,
        }
    }
}

/// A single status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    /// Signing is about to start
    BeginSigning,
    /// A signature was made
    SigCreated {
        kind: SignatureKind,
        algorithm: PublicKeyAlgorithm,
        created: DateTime<Utc>,
        fingerprint: String,
    },
    /// Verification of a new signature starts
    NewSig,
    /// The signature is good
    GoodSig { key_id: String, user_id: String },
    /// The signature is bad
    BadSig { key_id: String, user_id: String },
    /// Details of a good signature
    ValidSig {
        fingerprint: String,
        created: DateTime<Utc>,
        algorithm: PublicKeyAlgorithm,
    },
    /// The signing key is fully trusted
    TrustFully,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", STATUS_PREFIX)?;
        match self {
            StatusLine::BeginSigning => write!(f, "BEGIN_SIGNING"),
            StatusLine::SigCreated {
                kind,
                algorithm,
                created,
                fingerprint,
            } => write!(
                f,
                "SIG_CREATED {} {} {} {} {} {}",
                kind.code(),
                algorithm.id(),
                HASH_ALGORITHM_SHA256,
                SIGNATURE_CLASS_BINARY,
                created.timestamp(),
                fingerprint
            ),
            StatusLine::NewSig => write!(f, "NEWSIG"),
            StatusLine::GoodSig { key_id, user_id } => write!(f, "GOODSIG {} {}", key_id, user_id),
            StatusLine::BadSig { key_id, user_id } => write!(f, "BADSIG {} {}", key_id, user_id),
            StatusLine::ValidSig {
                fingerprint,
                created,
                algorithm,
            } => write!(
                f,
                "VALIDSIG {} {} {} 0 4 0 {} {} {} {}",
                fingerprint,
                created.format("%Y-%m-%d"),
                created.timestamp(),
                algorithm.id(),
                HASH_ALGORITHM_SHA256,
                SIGNATURE_CLASS_BINARY,
                fingerprint
            ),
            StatusLine::TrustFully => write!(f, "TRUST_FULLY 0 shell"),
        }
    }
}

/// Write one status line followed by a newline
pub fn emit(writer: &mut impl Write, line: &StatusLine) -> io::Result<()> {
    writeln!(writer, "{}", line)?;
    writer.flush()
}
