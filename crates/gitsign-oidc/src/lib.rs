//! OpenID Connect identity provider for keyless git signing
//!
//! This crate handles identity token acquisition for the signer:
//! explicit tokens, ambient CI/CD credentials and the OAuth 2.0 device
//! authorization flow, which only needs a terminal to show the operator a
//! verification URL and code.

pub mod ambient;
pub mod error;
pub mod oauth;
pub mod token;

pub use ambient::{detect_environment, get_ambient_token, CiEnvironment, SIGSTORE_AUDIENCE};
pub use error::{Error, Result};
pub use oauth::{DeviceCodeResponse, OAuthClient, OAuthConfig};
pub use token::{Audience, IdentityToken, TokenClaims};

/// Parse an identity token from a JWT string
pub fn parse_identity_token(token: &str) -> Result<IdentityToken> {
    IdentityToken::from_jwt(token)
}
