//! Question answering over a caller-supplied document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use faculty_core::{BackoffPolicy, Result, retry};

use crate::http::ApiClient;

/// Request payload for the document QA endpoint.
#[derive(Serialize)]
struct QaRequest<'a> {
    /// Full text of the document to answer against.
    document: &'a str,
    /// The question to answer.
    query: &'a str,
}

/// Response payload from the document QA endpoint.
#[derive(Deserialize)]
struct QaResponse {
    /// The extracted answer.
    answer: String,
}

/// Answers questions against a single document.
#[derive(Debug)]
pub struct DocumentQa {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl DocumentQa {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Answers `query` using `document` as the sole context.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response cannot be decoded.
    pub async fn call(&self, document: &str, query: &str) -> Result<String> {
        info!(
            "document_qa: running query against document with {} characters",
            document.len()
        );
        let payload = QaRequest { document, query };
        let response: QaResponse = retry("document_qa", self.policy, || {
            self.client.post("documentqa", &payload)
        })
        .await?;
        Ok(response.answer)
    }
}
