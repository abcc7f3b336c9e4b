//! Configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! `gitsign.*` keys from git config, and `GITSIGN_*` environment variables.

use gitsign_fulcio::DEFAULT_FULCIO_URL;
use gitsign_oidc::ambient::SIGSTORE_ID_TOKEN_VAR;
use gitsign_oidc::oauth::{SIGSTORE_CLIENT_ID, SIGSTORE_ISSUER};
use gitsign_rekor::DEFAULT_REKOR_URL;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Runtime configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fulcio certificate authority
    pub fulcio_url: String,
    /// Rekor transparency log
    pub rekor_url: String,
    /// OIDC issuer for the device flow
    pub issuer: String,
    /// OAuth client id for the device flow
    pub client_id: String,
    /// RFC 3161 timestamp authority, if any
    pub timestamp_url: Option<String>,
    /// File receiving a copy of stderr
    pub log_path: Option<PathBuf>,
    /// `tracing` filter directive
    pub log_level: String,
    /// Pre-issued identity token, skipping the interactive flow
    pub identity_token: Option<String>,
    /// Why git config could not be read, if it could not
    pub git_config_error: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fulcio_url: DEFAULT_FULCIO_URL.to_string(),
            rekor_url: DEFAULT_REKOR_URL.to_string(),
            issuer: SIGSTORE_ISSUER.to_string(),
            client_id: SIGSTORE_CLIENT_ID.to_string(),
            timestamp_url: None,
            log_path: None,
            log_level: "warn".to_string(),
            identity_token: None,
            git_config_error: None,
        }
    }
}

/// Config keys: (git config key, environment variable)
const FULCIO: (&str, &str) = ("gitsign.fulcio", "GITSIGN_FULCIO_URL");
const REKOR: (&str, &str) = ("gitsign.rekor", "GITSIGN_REKOR_URL");
const ISSUER: (&str, &str) = ("gitsign.issuer", "GITSIGN_OIDC_ISSUER");
const CLIENT_ID: (&str, &str) = ("gitsign.clientid", "GITSIGN_OIDC_CLIENT_ID");
const TIMESTAMP: (&str, &str) = ("gitsign.timestampserverurl", "GITSIGN_TIMESTAMP_SERVER_URL");
const LOG: (&str, &str) = ("gitsign.log", "GITSIGN_LOG");
const LOG_LEVEL: (&str, &str) = ("gitsign.loglevel", "GITSIGN_LOG_LEVEL");

impl Config {
    /// Load from git config and the process environment
    ///
    /// A missing `git` binary leaves the git layer empty; the failure is
    /// kept for [`Config::log_load_errors`].
    pub fn load() -> Self {
        let env = |name: &str| std::env::var(name).ok();
        match read_git_config() {
            Ok(git) => Self::from_sources(&git, env),
            Err(e) => Self {
                git_config_error: Some(e.to_string()),
                ..Self::from_sources(&HashMap::new(), env)
            },
        }
    }

    /// Emit what went wrong while loading
    ///
    /// Loading happens before any subscriber is installed, so callers run
    /// this once logging is up.
    pub fn log_load_errors(&self) {
        if let Some(e) = &self.git_config_error {
            tracing::debug!("cannot run git config: {}", e);
        }
    }

    /// Build from a git config map (lowercase keys) and an environment lookup
    pub fn from_sources<F>(git: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |(key, var): (&str, &str)| {
            env(var)
                .filter(|value| !value.is_empty())
                .or_else(|| git.get(key).filter(|value| !value.is_empty()).cloned())
        };

        let defaults = Config::default();
        Self {
            fulcio_url: lookup(FULCIO).unwrap_or(defaults.fulcio_url),
            rekor_url: lookup(REKOR).unwrap_or(defaults.rekor_url),
            issuer: lookup(ISSUER).unwrap_or(defaults.issuer),
            client_id: lookup(CLIENT_ID).unwrap_or(defaults.client_id),
            timestamp_url: lookup(TIMESTAMP),
            log_path: lookup(LOG).map(PathBuf::from),
            log_level: lookup(LOG_LEVEL).unwrap_or(defaults.log_level),
            identity_token: env(SIGSTORE_ID_TOKEN_VAR).filter(|value| !value.is_empty()),
            git_config_error: None,
        }
    }
}

/// Parse `git config --get-regexp` output into a map
///
/// Each line is `<key> <value>`; git prints section and key names in lower
/// case. Later lines win, matching git's own precedence.
pub fn parse_git_config(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(' ') {
            Some((key, value)) => (key.to_lowercase(), value.to_string()),
            None => (line.to_lowercase(), String::new()),
        })
        .collect()
}

fn read_git_config() -> io::Result<HashMap<String, String>> {
    let output = Command::new("git")
        .args(["config", "--get-regexp", r"^gitsign\."])
        .output()?;

    // Exit status 1 just means no gitsign keys are set.
    if !output.status.success() {
        return Ok(HashMap::new());
    }
    Ok(parse_git_config(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::writer::MemorySink;
    use crate::io::{Streams, TerminalDevice};

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(&HashMap::new(), |_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.fulcio_url, "https://fulcio.sigstore.dev");
        assert_eq!(config.rekor_url, "https://rekor.sigstore.dev");
        assert_eq!(config.client_id, "sigstore");
        assert_eq!(config.log_level, "warn");
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_git_config_layer() {
        let git = parse_git_config(
            "gitsign.fulcio https://fulcio.example.com\n\
             gitsign.clientid my-client\n\
             gitsign.log /tmp/gitsign.log\n",
        );
        let config = Config::from_sources(&git, |_| None);

        assert_eq!(config.fulcio_url, "https://fulcio.example.com");
        assert_eq!(config.client_id, "my-client");
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/gitsign.log")));
        assert_eq!(config.rekor_url, DEFAULT_REKOR_URL);
    }

    #[test]
    fn test_environment_overrides_git_config() {
        let git = parse_git_config("gitsign.rekor https://rekor.git.example\ngitsign.loglevel info\n");
        let env = env_from(&[
            ("GITSIGN_REKOR_URL", "https://rekor.env.example"),
            ("GITSIGN_LOG_LEVEL", ""),
            ("SIGSTORE_ID_TOKEN", "eyJ.token"),
        ]);
        let config = Config::from_sources(&git, env);

        assert_eq!(config.rekor_url, "https://rekor.env.example");
        // empty variables do not mask git config
        assert_eq!(config.log_level, "info");
        assert_eq!(config.identity_token.as_deref(), Some("eyJ.token"));
    }

    #[test]
    fn test_parse_git_config() {
        let map = parse_git_config("gitsign.timestampServerURL https://tsa.example\ngitsign.empty\n\n");
        assert_eq!(
            map.get("gitsign.timestampserverurl").map(String::as_str),
            Some("https://tsa.example")
        );
        assert_eq!(map.get("gitsign.empty").map(String::as_str), Some(""));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_load_errors_reach_the_log() {
        let config = Config {
            git_config_error: Some("No such file or directory (os error 2)".to_string()),
            ..Config::default()
        };
        let err = MemorySink::default();
        let mut streams = Streams::with_io(io::empty(), MemorySink::default(), err.clone(), None)
            .with_terminal(TerminalDevice::Disabled)
            .with_log_filter("debug");

        streams
            .wrap(|_| {
                config.log_load_errors();
                Ok(())
            })
            .unwrap();

        assert!(err
            .contents()
            .contains("cannot run git config: No such file or directory (os error 2)"));
    }
}
