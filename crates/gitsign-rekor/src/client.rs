//! Rekor v1 API client

use crate::entry::{single_entry, LogEntry, LogEntryResponse, ProposedEntry};
use crate::error::{Error, Result};
use url::Url;

/// Public-good Rekor instance
pub const DEFAULT_REKOR_URL: &str = "https://rekor.sigstore.dev";

/// Client for a Rekor transparency log
#[derive(Debug, Clone)]
pub struct RekorClient {
    base: Url,
    client: reqwest::Client,
}

impl RekorClient {
    /// Create a client for the log at `url`
    ///
    /// Fails if the URL is not an absolute http(s) URL.
    pub fn new(url: &str) -> Result<Self> {
        let base = Url::parse(url.trim_end_matches('/'))?;
        if !matches!(base.scheme(), "https" | "http") {
            return Err(Error::Api(format!(
                "Rekor URL must be http(s), got {}",
                url
            )));
        }
        Ok(Self {
            base,
            client: reqwest::Client::new(),
        })
    }

    /// The base URL of the log
    pub fn url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Submit an entry and return it as integrated by the log
    pub async fn create_entry(&self, entry: impl Into<ProposedEntry>) -> Result<LogEntry> {
        let entry = entry.into();
        let endpoint = self.endpoint("/api/v1/log/entries")?;
        tracing::debug!("submitting {} entry to {}", entry.kind(), endpoint);

        let response = self
            .client
            .post(endpoint)
            .header("Accept", "application/json")
            .json(&entry)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "failed to create entry: {} - {}",
                status, body
            )));
        }

        let entries: LogEntryResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("failed to parse log entry: {}", e)))?;

        single_entry(entries)
            .ok_or_else(|| Error::Api("expected exactly one log entry in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_accepts_http_urls() {
        let client = RekorClient::new("https://rekor.sigstore.dev/").unwrap();
        assert_eq!(
            client.endpoint("/api/v1/log/entries").unwrap().as_str(),
            "https://rekor.sigstore.dev/api/v1/log/entries"
        );
        assert!(RekorClient::new("http://localhost:3000").is_ok());
    }

    #[test]
    fn test_client_rejects_invalid_urls() {
        assert!(RekorClient::new("").is_err());
        assert!(RekorClient::new("rekor.sigstore.dev").is_err());
        assert!(RekorClient::new("file:///tmp/rekor").is_err());
    }
}
