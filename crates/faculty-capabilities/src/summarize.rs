//! Document summarization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use faculty_core::{BackoffPolicy, Result, retry};

use crate::http::ApiClient;

/// Request payload for the summarization endpoint.
#[derive(Serialize)]
struct SummarizeRequest<'a> {
    /// Full text of the document to summarize.
    document: &'a str,
}

/// Response payload from the summarization endpoint.
#[derive(Deserialize)]
struct SummarizeResponse {
    /// The generated summary.
    summary: String,
}

/// Produces a summary of a single document.
#[derive(Debug)]
pub struct Summarize {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl Summarize {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Summarizes `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response cannot be decoded.
    pub async fn call(&self, document: &str) -> Result<String> {
        info!(
            "summarize: running against document with {} characters",
            document.len()
        );
        let payload = SummarizeRequest { document };
        let response: SummarizeResponse = retry("summarize", self.policy, || {
            self.client.post("summarization", &payload)
        })
        .await?;
        Ok(response.summary)
    }
}
