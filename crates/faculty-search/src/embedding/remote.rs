//! OpenAI-style `/embeddings` endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use faculty_core::{BackoffPolicy, Error, Result, retry};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingModel, check_dimensions};

/// Configuration for a remote embedding endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingConfig {
    /// Base URL of the embedding API, without trailing slash.
    pub api_base: String,
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Model name sent with every request.
    pub model: String,
    /// Output vector dimension the model is configured for.
    pub dimension: usize,
    /// Largest input length in chars; longer inputs are rejected upstream.
    pub max_input_chars: usize,
    /// Texts per request; inputs are split into batches of this size.
    pub batch_size: usize,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for RemoteEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_owned(),
            api_key: String::default(),
            model: "text-embedding-3-small".to_owned(),
            dimension: 1536,
            max_input_chars: 8000,
            batch_size: 64,
            timeout_seconds: 60,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Embedding model backed by an OpenAI-style HTTP endpoint.
///
/// Inputs are split into batches, each batch is retried on transient
/// failures, and responses are reordered by their returned index so output
/// order always matches input order.
#[derive(Debug)]
pub struct RemoteEmbeddingModel {
    config: RemoteEmbeddingConfig,
    client: Client,
    policy: BackoffPolicy,
}

impl RemoteEmbeddingModel {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the API key is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(config: RemoteEmbeddingConfig, policy: BackoffPolicy) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "remote embedding model requires an API key".to_owned(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            client,
            policy,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.api_base);
        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "embedding request failed with status {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(Error::Remote(format!(
                "embedding count mismatch: sent {} texts, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API may return entries out of order; restore input order.
        let mut data = parsed.data;
        data.sort_by_key(|entry| entry.index);
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddingModel {
    fn identity(&self) -> String {
        format!("remote:{}@{}", self.config.model, self.config.dimension)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn max_input_chars(&self) -> usize {
        self.config.max_input_chars
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::default());
        }

        debug!(
            "Embedding {} texts via {} in batches of {}",
            texts.len(),
            self.config.model,
            self.config.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch_vectors = retry("remote_embed", self.policy, || self.embed_batch(batch))
                .await?;
            vectors.extend(batch_vectors);
        }

        check_dimensions(&vectors, self.config.dimension)?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let config = RemoteEmbeddingConfig::default();
        let error = RemoteEmbeddingModel::new(config, BackoffPolicy::default()).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn test_identity_includes_model_and_dimension() {
        let config = RemoteEmbeddingConfig {
            api_key: "k".to_owned(),
            ..RemoteEmbeddingConfig::default()
        };
        let model = RemoteEmbeddingModel::new(config, BackoffPolicy::default()).unwrap();
        assert_eq!(model.identity(), "remote:text-embedding-3-small@1536");
        assert_eq!(model.dimension(), 1536);
    }
}
