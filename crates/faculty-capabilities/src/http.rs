//! Shared HTTP glue for the capability endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use faculty_core::{ApiConfig, Error, Result};

/// HTTP client shared by all capability wrappers.
///
/// Holds one connection pool; requests carry the `api-key` header and the
/// configured timeout. Transport failures map to retryable errors, non-2xx
/// responses to [`Error::Remote`] carrying status and body.
#[derive(Debug)]
pub struct ApiClient {
    /// Underlying HTTP client.
    client: Client,
    /// Base URL of the capability API, without a trailing slash.
    base_url: String,
    /// API key sent with every request.
    api_key: String,
}

impl ApiClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no API key is configured, or a request
    /// error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_owned();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    /// Posts a JSON payload to `{base_url}/{path}` and decodes the JSON
    /// response.
    pub async fn post<Req, Resp>(&self, path: &str, payload: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "{path} request failed with status {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let config = ApiConfig::default();
        let error = ApiClient::new(&config).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://example.test/".to_owned(),
            api_key: Some("k".to_owned()),
            timeout_seconds: 5,
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://example.test");
    }
}
