//! Freeform question answering without a document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use faculty_core::{BackoffPolicy, Result, retry};

use crate::http::ApiClient;

/// Request payload for the ask endpoint.
#[derive(Serialize)]
struct AskRequest<'a> {
    /// The question to answer.
    query: &'a str,
}

/// Response payload from the ask endpoint.
#[derive(Deserialize)]
struct AskResponse {
    /// The generated answer.
    answer: String,
}

/// Answers a freeform question.
#[derive(Debug)]
pub struct Ask {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl Ask {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Answers `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response cannot be decoded.
    pub async fn call(&self, query: &str) -> Result<String> {
        let payload = AskRequest { query };
        let response: AskResponse =
            retry("ask", self.policy, || self.client.post("ask", &payload)).await?;
        Ok(response.answer)
    }
}
