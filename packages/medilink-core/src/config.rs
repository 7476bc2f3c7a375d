//! Client configuration loaded from `~/.medilink/config.toml`.

use crate::types::Role;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the message store
    pub server_url: String,
    /// Path prefix for every store route, e.g. `/api`
    pub api_prefix: String,
    /// Full-refresh cadence
    pub poll_interval_ms: u64,
    /// Role a fresh session starts as
    pub default_role: Role,
    pub languages: LanguageSettings,
    pub request: RequestSettings,
}

/// Initial language for each role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    pub doctor: String,
    pub patient: String,
}

/// Timeout and retry knobs for store requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    pub timeout_ms: u64,
    /// Extra attempts for the message list read. Writes are never retried.
    pub read_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_prefix: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_role: Role::Doctor,
            languages: LanguageSettings::default(),
            request: RequestSettings::default(),
        }
    }
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            doctor: "English".to_string(),
            patient: "Spanish".to_string(),
        }
    }
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            read_retries: 2,
            retry_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default path with environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load `path` with environment overrides applied on top.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(path, None)
    }

    /// Load `path`, apply environment overrides, then a command-line
    /// `server_url`, and validate the result once.
    ///
    /// Overrides may replace values the file gets wrong.
    pub fn load_with(path: &Path, server_url: Option<&str>) -> Result<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        if let Some(url) = server_url.map(str::trim).filter(|url| !url.is_empty()) {
            config.server_url = url.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Default path: `~/.medilink/config.toml`
    /// Can be overridden with the `MEDILINK_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("MEDILINK_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".medilink/config.toml"))
            .unwrap_or_else(|| PathBuf::from("medilink.toml"))
    }

    /// Parse a config file as written. Not validated; see [`ClientConfig::load_with`].
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MEDILINK_SERVER_URL") {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
        if let Some(value) = lookup("MEDILINK_POLL_INTERVAL_MS") {
            self.poll_interval_ms = value.trim().parse().map_err(|_| {
                Error::Config(format!("MEDILINK_POLL_INTERVAL_MS is not a number: {}", value))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server_url must start with http:// or https://, got '{}'",
                self.server_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be greater than zero".into()));
        }
        if self.request.timeout_ms == 0 {
            return Err(Error::Config("request.timeout_ms must be greater than zero".into()));
        }
        if self.languages.doctor.trim().is_empty() || self.languages.patient.trim().is_empty() {
            return Err(Error::Config("languages.doctor and languages.patient must be set".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            timeout: Duration::from_millis(self.request.timeout_ms),
            read_retries: self.request.read_retries,
            backoff: Duration::from_millis(self.request.retry_backoff_ms),
            max_backoff: Duration::from_millis(self.request.max_backoff_ms),
        }
    }
}

/// Resolved timeout and retry policy handed to the store client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub read_retries: u32,
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl RequestPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to the cap.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RequestPolicy {
    fn default() -> Self {
        ClientConfig::default().request_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ClientConfig::from_path(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.languages.doctor, "English");
        assert_eq!(config.languages.patient, "Spanish");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
server_url = "https://consult.example.org"
default_role = "patient"

[languages]
patient = "French"

[request]
timeout_ms = 5000
"#,
        )
        .unwrap();

        let config = ClientConfig::from_path(&path).unwrap();
        assert_eq!(config.server_url, "https://consult.example.org");
        assert_eq!(config.default_role, Role::Patient);
        assert_eq!(config.languages.doctor, "English");
        assert_eq!(config.languages.patient, "French");
        assert_eq!(config.request.timeout_ms, 5000);
        assert_eq!(config.request.read_retries, 2);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "poll_interval_ms = 0\n").unwrap();
        assert!(matches!(ClientConfig::load_from(&path), Err(Error::Config(_))));

        fs::write(&path, "server_url = \"ftp://nope\"\n").unwrap();
        assert!(matches!(ClientConfig::load_from(&path), Err(Error::Config(_))));

        fs::write(&path, "poll_interval_ms = \"fast\"\n").unwrap();
        assert!(matches!(ClientConfig::from_path(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn test_env_override_replaces_bad_file_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = \"localhost:5000\"\n").unwrap();

        let mut config = ClientConfig::from_path(&path).unwrap();
        assert!(config.validate().is_err());

        config
            .apply_overrides(|key| match key {
                "MEDILINK_SERVER_URL" => Some("http://127.0.0.1:5000".to_string()),
                "MEDILINK_POLL_INTERVAL_MS" => Some(" 1500 ".to_string()),
                _ => None,
            })
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.server_url, "http://127.0.0.1:5000");
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn test_bad_env_number_is_rejected() {
        let mut config = ClientConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "MEDILINK_POLL_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_command_line_server_replaces_bad_file_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = \"localhost:5000\"\n").unwrap();

        let config = ClientConfig::load_with(&path, Some("https://consult.example.org")).unwrap();
        assert_eq!(config.server_url, "https://consult.example.org");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RequestPolicy {
            timeout: Duration::from_secs(1),
            read_retries: 5,
            backoff: Duration::from_millis(250),
            max_backoff: Duration::from_millis(1000),
        };

        assert_eq!(policy.backoff_for(1), Duration::from_millis(250));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(1000));
    }
}
