//! OAuth device authorization flow
//!
//! Git runs the signer without a usable stdin, so the only interactive flow
//! that works reliably is the device authorization grant (RFC 8628): the
//! operator is shown a URL and a code on the terminal, completes the login in
//! any browser, and the signer polls the token endpoint until the provider
//! hands out an ID token. PKCE (S256) protects the code exchange.

use crate::error::{Error, Result};
use crate::token::IdentityToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Sigstore's public OAuth issuer
pub const SIGSTORE_ISSUER: &str = "https://oauth2.sigstore.dev/auth";

/// Client id registered with the Sigstore issuer
pub const SIGSTORE_CLIENT_ID: &str = "sigstore";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra wait added to the polling interval on `slow_down`
const SLOW_DOWN_BACKOFF: Duration = Duration::from_secs(5);

/// Endpoints and client registration of an OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub token_url: String,
    pub device_auth_url: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Derive the endpoints of a Dex-style issuer
    ///
    /// The issuer must be an absolute http(s) URL; a trailing slash is ignored.
    pub fn from_issuer(issuer: &str, client_id: &str) -> Result<Self> {
        let parsed = Url::parse(issuer)?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(Error::OAuth(format!(
                "issuer must be an http(s) URL, got {}",
                issuer
            )));
        }
        let base = issuer.trim_end_matches('/');

        Ok(Self {
            token_url: format!("{}/token", base),
            device_auth_url: format!("{}/device/code", base),
            client_id: client_id.to_string(),
            scopes: vec!["openid".to_string(), "email".to_string()],
        })
    }
}

impl Default for OAuthConfig {
    /// The Sigstore public-good issuer
    fn default() -> Self {
        Self {
            token_url: format!("{}/token", SIGSTORE_ISSUER),
            device_auth_url: format!("{}/device/code", SIGSTORE_ISSUER),
            client_id: SIGSTORE_CLIENT_ID.to_string(),
            scopes: vec!["openid".to_string(), "email".to_string()],
        }
    }
}

/// What the operator needs to authorize this device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    /// Code the operator types in at `verification_uri`
    pub user_code: String,
    pub verification_uri: String,
    /// `verification_uri` with the code already filled in, if offered
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until `device_code` expires
    pub expires_in: u64,
    /// Seconds to wait between polls
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// The part of a token response the signer cares about
#[derive(Debug, Deserialize)]
struct TokenGrant {
    #[serde(default)]
    id_token: Option<String>,
}

/// Error body returned by the token endpoint while polling
#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
}

/// What the token endpoint told us during a single poll
#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Pending,
    SlowDown,
}

/// Map a polling error code onto the next step of the flow
fn classify_poll_error(code: &str) -> Result<PollOutcome> {
    match code {
        "authorization_pending" => Ok(PollOutcome::Pending),
        "slow_down" => Ok(PollOutcome::SlowDown),
        "expired_token" => Err(Error::OAuth("device code expired".to_string())),
        "access_denied" => Err(Error::OAuth("user denied authorization".to_string())),
        other => Err(Error::OAuth(format!("token error: {}", other))),
    }
}

/// A PKCE code verifier and its S256 challenge
struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill(&mut seed);
        let verifier = URL_SAFE_NO_PAD.encode(seed);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Client for an OAuth provider's device authorization endpoints
pub struct OAuthClient {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }

    /// Request a device code
    ///
    /// Returns the authorization to show to the operator and the PKCE
    /// verifier needed to redeem it.
    pub async fn start_device_flow(&self) -> Result<(DeviceCodeResponse, String)> {
        let pkce = Pkce::generate();
        let scope = self.config.scopes.join(" ");
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", scope.as_str()),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
        ];

        tracing::debug!("requesting device code from {}", self.config.device_auth_url);
        let response = self.post_form(&self.config.device_auth_url, &form).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth(format!(
                "device authorization failed: {} - {}",
                status, body
            )));
        }

        let authorization = response
            .json()
            .await
            .map_err(|e| Error::OAuth(format!("invalid device code response: {}", e)))?;
        Ok((authorization, pkce.verifier))
    }

    /// Poll the token endpoint until the operator has authorized the device
    ///
    /// Gives up when the provider refuses or `expires_in` seconds have passed.
    pub async fn poll_for_token(
        &self,
        device_code: &str,
        verifier: &str,
        interval: u64,
        expires_in: u64,
    ) -> Result<IdentityToken> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_CODE_GRANT),
            ("code_verifier", verifier),
        ];

        let deadline = tokio::time::Instant::now() + Duration::from_secs(expires_in);
        let mut interval = Duration::from_secs(interval.max(1));

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::OAuth("device code expired".to_string()));
            }

            let response = self.post_form(&self.config.token_url, &form).await?;
            if response.status().is_success() {
                let grant: TokenGrant = response
                    .json()
                    .await
                    .map_err(|e| Error::OAuth(format!("invalid token response: {}", e)))?;
                let id_token = grant
                    .id_token
                    .ok_or_else(|| Error::OAuth("token response has no id_token".to_string()))?;
                return IdentityToken::from_jwt(&id_token);
            }

            let refusal: TokenError = response
                .json()
                .await
                .map_err(|e| Error::OAuth(format!("invalid token error response: {}", e)))?;
            if classify_poll_error(&refusal.error)? == PollOutcome::SlowDown {
                interval += SLOW_DOWN_BACKOFF;
                tracing::debug!("token endpoint asked to slow down, polling every {:?}", interval);
            }
        }
    }

    /// Run the whole device flow
    ///
    /// `display` is called once with the device authorization so the caller
    /// can show the verification URL and user code to the operator.
    pub async fn device_flow<F>(&self, display: F) -> Result<IdentityToken>
    where
        F: FnOnce(&DeviceCodeResponse),
    {
        let (authorization, verifier) = self.start_device_flow().await?;
        display(&authorization);
        self.poll_for_token(
            &authorization.device_code,
            &verifier,
            authorization.interval,
            authorization.expires_in,
        )
        .await
    }
}
