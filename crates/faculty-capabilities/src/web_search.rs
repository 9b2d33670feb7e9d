//! Web search with a summarized answer and source list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use faculty_core::{BackoffPolicy, Error, Result, retry};

use crate::http::ApiClient;

/// Marker framing the answer section of the raw result blob.
const ANSWER_MARKER: &str = "--- answer:";
/// Marker framing the source list of the raw result blob.
const SOURCES_MARKER: &str = "--- sources:";

/// Request payload for the search endpoint.
#[derive(Serialize)]
struct SearchRequest<'a> {
    /// The search query.
    query: &'a str,
}

/// Response payload from the search endpoint.
#[derive(Deserialize)]
struct SearchResponse {
    /// Framed blob holding the answer followed by a source list.
    result: String,
}

/// A parsed web search answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAnswer {
    /// Summarized answer over the top results.
    pub answer: String,
    /// URLs of the sources backing the answer.
    pub sources: Vec<String>,
}

/// Runs a web search, summarizing the top results.
#[derive(Debug)]
pub struct WebSearch {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl WebSearch {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Searches the web for `query` and returns the summarized answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response blob is not in the expected frame format.
    pub async fn call(&self, query: &str) -> Result<WebAnswer> {
        let payload = SearchRequest { query };
        let response: SearchResponse = retry("web_search", self.policy, || {
            self.client.post("search", &payload)
        })
        .await?;
        parse_result(&response.result)
    }
}

/// Splits the `--- answer: ... --- sources: ...` frame into its parts.
fn parse_result(raw: &str) -> Result<WebAnswer> {
    let after_answer = raw
        .split_once(ANSWER_MARKER)
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::Remote(format!("search result missing '{ANSWER_MARKER}' frame")))?;
    let (answer, sources) = after_answer
        .split_once(SOURCES_MARKER)
        .ok_or_else(|| Error::Remote(format!("search result missing '{SOURCES_MARKER}' frame")))?;

    Ok(WebAnswer {
        answer: answer.trim().to_owned(),
        sources: sources
            .trim()
            .lines()
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty())
            .collect(),
    })
}
