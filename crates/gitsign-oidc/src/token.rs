//! Identity token parsing
//!
//! Tokens are passed through to Fulcio untouched; the claims are only decoded
//! locally to pick the proof-of-possession subject and to show the operator
//! who they are signing as. The JWT signature is checked by Fulcio, not here.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// The `aud` claim, which may be a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience
    Single(String),
    /// Several audiences
    Multiple(Vec<String>),
}

impl Audience {
    /// Check whether the given audience is present
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Multiple(auds) => auds.iter().any(|a| a == audience),
        }
    }
}

/// Claims of an OIDC identity token that the signer cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer URL
    pub iss: String,
    /// Subject
    pub sub: String,
    /// Audience
    #[serde(default)]
    pub aud: Option<Audience>,
    /// Expiration (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    /// Email address, for email-based identity providers
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the provider verified the email address
    #[serde(default)]
    pub email_verified: Option<bool>,
}

/// An OIDC identity token
#[derive(Clone)]
pub struct IdentityToken {
    raw: String,
    claims: TokenClaims,
}

impl IdentityToken {
    /// Parse a token from its compact JWT serialization
    pub fn from_jwt(jwt: &str) -> Result<Self> {
        let jwt = jwt.trim();
        let mut parts = jwt.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Token(
                "expected a JWT with three dot-separated parts".to_string(),
            ));
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::Token(format!("invalid JWT payload encoding: {}", e)))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| Error::Token(format!("invalid JWT claims: {}", e)))?;

        Ok(Self {
            raw: jwt.to_string(),
            claims,
        })
    }

    /// The raw JWT, as sent to Fulcio
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All decoded claims
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// The `sub` claim
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// The `iss` claim
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    /// The `email` claim, if any
    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    /// The identity Fulcio will bind into the certificate
    ///
    /// Email-based providers certify the email address; everything else
    /// certifies the subject.
    pub fn principal(&self) -> &str {
        self.email().unwrap_or_else(|| self.subject())
    }

    /// Whether the token is expired at the given Unix time
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.claims.exp.is_some_and(|exp| exp <= now)
    }
}

impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToken")
            .field("issuer", &self.claims.iss)
            .field("subject", &self.claims.sub)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}
