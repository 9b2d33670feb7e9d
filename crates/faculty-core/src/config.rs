//! API configuration for the capability and embedding endpoints.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Env var holding the API key.
const ENV_API_KEY: &str = "FACULTY_API_KEY";
/// Env var overriding the API base URL.
const ENV_API_URL: &str = "FACULTY_API_URL";
/// Default API base URL.
const DEFAULT_API_URL: &str = "https://api.faculty.dev";

/// Connection settings for the remote capability API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
    /// API key sent in the `api-key` header. Optional so offline use of
    /// the search subsystem needs no credentials.
    pub api_key: Option<String>,
    /// Timeout in seconds for HTTP requests.
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

impl ApiConfig {
    /// Builds a configuration from `FACULTY_API_KEY` and `FACULTY_API_URL`.
    ///
    /// A missing key is allowed here; capabilities that need one fail at
    /// construction instead.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var(ENV_API_URL) {
            config.base_url = url.trim_end_matches('/').to_owned();
        }
        config.api_key = env::var(ENV_API_KEY).ok();
        config
    }

    /// Loads a configuration from a TOML file, with env vars as fallback
    /// for fields the file omits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        if config.api_key.is_none() {
            config.api_key = env::var(ENV_API_KEY).ok();
        }
        Ok(config)
    }

    /// Returns the API key, or a configuration error naming the env var.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Config(format!("API key not set ({ENV_API_KEY})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "https://api.faculty.dev");
        assert_eq!(config.timeout_seconds, 60);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_require_api_key_missing() {
        let config = ApiConfig::default();
        let error = config.require_api_key().unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faculty.toml");
        fs::write(
            &path,
            "base_url = \"https://example.test\"\napi_key = \"k\"\ntimeout_seconds = 5\n",
        )
        .unwrap();

        let config = ApiConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.timeout_seconds, 5);
    }
}
