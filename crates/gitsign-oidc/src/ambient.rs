//! Ambient credential detection for CI/CD environments
//!
//! When git signs inside CI there is nobody to complete a device flow, so
//! the signer first asks the environment for a token:
//! - GitHub Actions: the Actions OIDC endpoint (requires `id-token: write`)
//! - GitLab CI: the `SIGSTORE_ID_TOKEN` variable declared via `id_tokens`

use crate::error::{Error, Result};
use crate::token::IdentityToken;
use serde::Deserialize;

/// Default audience for Sigstore OIDC tokens
pub const SIGSTORE_AUDIENCE: &str = "sigstore";

/// Environment variable GitLab (and manual setups) use for a ready-made token
pub const SIGSTORE_ID_TOKEN_VAR: &str = "SIGSTORE_ID_TOKEN";

/// Detected CI/CD environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiEnvironment {
    /// GitHub Actions
    GitHubActions,
    /// GitLab CI
    GitLabCi,
}

impl std::fmt::Display for CiEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CiEnvironment::GitHubActions => write!(f, "GitHub Actions"),
            CiEnvironment::GitLabCi => write!(f, "GitLab CI"),
        }
    }
}

/// Detect the current CI/CD environment from a variable lookup
///
/// GitHub Actions only counts when the OIDC request variables are present,
/// since without `id-token: write` no token can be requested anyway.
pub fn detect_environment_with<F>(var: F) -> Option<CiEnvironment>
where
    F: Fn(&str) -> Option<String>,
{
    if var("ACTIONS_ID_TOKEN_REQUEST_URL").is_some()
        && var("ACTIONS_ID_TOKEN_REQUEST_TOKEN").is_some()
    {
        Some(CiEnvironment::GitHubActions)
    } else if var("GITLAB_CI").is_some() && var(SIGSTORE_ID_TOKEN_VAR).is_some() {
        Some(CiEnvironment::GitLabCi)
    } else {
        None
    }
}

/// Detect the current CI/CD environment
pub fn detect_environment() -> Option<CiEnvironment> {
    detect_environment_with(|name| std::env::var(name).ok())
}

/// Body of the GitHub Actions token endpoint response
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    value: String,
}

/// Get an ambient identity token, if the environment offers one
///
/// Returns `Ok(None)` outside a supported CI environment.
pub async fn get_ambient_token(audience: &str) -> Result<Option<IdentityToken>> {
    let Some(environment) = detect_environment() else {
        return Ok(None);
    };
    tracing::debug!("detected {}, requesting ambient credentials", environment);

    let token = match environment {
        CiEnvironment::GitHubActions => github_actions_token(audience).await?,
        CiEnvironment::GitLabCi => std::env::var(SIGSTORE_ID_TOKEN_VAR)
            .map_err(|_| Error::Token(format!("{} is not set", SIGSTORE_ID_TOKEN_VAR)))?,
    };

    IdentityToken::from_jwt(&token).map(Some)
}

/// Request a token from the GitHub Actions OIDC provider
async fn github_actions_token(audience: &str) -> Result<String> {
    let request_url = std::env::var("ACTIONS_ID_TOKEN_REQUEST_URL")
        .map_err(|_| Error::Token("ACTIONS_ID_TOKEN_REQUEST_URL is not set".to_string()))?;
    let bearer = std::env::var("ACTIONS_ID_TOKEN_REQUEST_TOKEN")
        .map_err(|_| Error::Token("ACTIONS_ID_TOKEN_REQUEST_TOKEN is not set".to_string()))?;

    let mut url = url::Url::parse(&request_url)?;
    url.query_pairs_mut().append_pair("audience", audience);

    let response = reqwest::Client::new()
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Token(format!(
            "GitHub Actions token request failed: {} - {}",
            status, body
        )));
    }

    let body: GitHubTokenResponse = response
        .json()
        .await
        .map_err(|e| Error::Token(format!("failed to parse GitHub Actions token: {}", e)))?;
    Ok(body.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_detect_github_actions() {
        let env = lookup(&[
            ("GITHUB_ACTIONS", "true"),
            ("ACTIONS_ID_TOKEN_REQUEST_URL", "https://token.example"),
            ("ACTIONS_ID_TOKEN_REQUEST_TOKEN", "secret"),
        ]);
        assert_eq!(
            detect_environment_with(env),
            Some(CiEnvironment::GitHubActions)
        );
    }

    #[test]
    fn test_github_without_id_token_permission_is_not_ambient() {
        let env = lookup(&[("GITHUB_ACTIONS", "true")]);
        assert_eq!(detect_environment_with(env), None);
    }

    #[test]
    fn test_detect_gitlab() {
        let env = lookup(&[("GITLAB_CI", "true"), (SIGSTORE_ID_TOKEN_VAR, "a.b.c")]);
        assert_eq!(detect_environment_with(env), Some(CiEnvironment::GitLabCi));
        assert_eq!(detect_environment_with(lookup(&[("GITLAB_CI", "true")])), None);
    }

    #[test]
    fn test_ci_environment_display() {
        assert_eq!(CiEnvironment::GitHubActions.to_string(), "GitHub Actions");
        assert_eq!(CiEnvironment::GitLabCi.to_string(), "GitLab CI");
    }
}
