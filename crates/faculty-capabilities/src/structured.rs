//! Structured extraction against an explicit schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use faculty_core::{BackoffPolicy, Result, retry};

use crate::http::ApiClient;
use crate::schema::Schema;

/// Request payload for the structured extraction endpoint.
#[derive(Serialize)]
struct ExtractRequest<'a> {
    /// Full text of the document to extract from.
    document: &'a str,
    /// Shape the extracted value must follow.
    schema: &'a Schema,
}

/// Response payload from the structured extraction endpoint.
#[derive(Deserialize)]
struct ExtractResponse {
    /// The extracted value, shaped per the request schema.
    value: Value,
}

/// Extracts structured data from a document according to a [`Schema`].
#[derive(Debug)]
pub struct Extract {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl Extract {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Extracts a value shaped by `schema` from `document`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response cannot be decoded.
    pub async fn call(&self, document: &str, schema: &Schema) -> Result<Value> {
        info!(
            "extract: running against document with {} characters",
            document.len()
        );
        let payload = ExtractRequest { document, schema };
        let response: ExtractResponse = retry("extract", self.policy, || {
            self.client.post("structured", &payload)
        })
        .await?;
        Ok(response.value)
    }
}
