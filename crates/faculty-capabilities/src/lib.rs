//! Capability wrappers for the remote faculty API.
//!
//! Each capability is a thin typed client over one endpoint, sharing one
//! HTTP connection pool and one retry policy. The set of capabilities is
//! closed: [`Capability::resolve`] maps a URI onto a tagged variant at
//! construction time, and an unknown URI is a configuration error there,
//! not a deferred runtime surprise.

/// Freeform question answering.
pub mod ask;
/// Question answering over a supplied document.
pub mod document_qa;
/// Shared HTTP client for the capability endpoints.
pub mod http;
/// Schema descriptions for structured extraction.
pub mod schema;
/// Natural-language to SQL generation.
pub mod sql;
/// Structured extraction against an explicit schema.
pub mod structured;
/// Document summarization.
pub mod summarize;
/// Web search with summarized answers.
pub mod web_search;

use std::sync::Arc;

use faculty_core::{ApiConfig, BackoffPolicy, Error, Result};

pub use ask::Ask;
pub use document_qa::DocumentQa;
pub use http::ApiClient;
pub use schema::{Field, PrimitiveKind, Schema};
pub use sql::{Sql, SqlVariant};
pub use structured::Extract;
pub use summarize::Summarize;
pub use web_search::{WebAnswer, WebSearch};

/// URIs of the supported capabilities, in resolution order.
pub const CAPABILITY_URIS: [&str; 6] = [
    "faculty/document_qa",
    "faculty/summarize",
    "faculty/ask",
    "faculty/sql",
    "faculty/search",
    "faculty/extract",
];

/// One remote capability, resolved from its URI at construction time.
#[derive(Debug)]
pub enum Capability {
    /// `faculty/document_qa`
    DocumentQa(DocumentQa),
    /// `faculty/summarize`
    Summarize(Summarize),
    /// `faculty/ask`
    Ask(Ask),
    /// `faculty/sql`
    Sql(Sql),
    /// `faculty/search`
    WebSearch(WebSearch),
    /// `faculty/extract`
    Extract(Extract),
}

impl Capability {
    /// Resolves a capability URI against the closed capability set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing the valid URIs if `uri` is
    /// unknown, or if the API client cannot be constructed.
    pub fn resolve(uri: &str, config: &ApiConfig) -> Result<Self> {
        let client = Arc::new(ApiClient::new(config)?);
        Self::resolve_with(uri, client, BackoffPolicy::default())
    }

    /// Resolves a capability URI using an already-built client and policy,
    /// so several capabilities can share one connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing the valid URIs if `uri` is
    /// unknown.
    pub fn resolve_with(
        uri: &str,
        client: Arc<ApiClient>,
        policy: BackoffPolicy,
    ) -> Result<Self> {
        match uri {
            "faculty/document_qa" => Ok(Self::DocumentQa(DocumentQa::new(client, policy))),
            "faculty/summarize" => Ok(Self::Summarize(Summarize::new(client, policy))),
            "faculty/ask" => Ok(Self::Ask(Ask::new(client, policy))),
            "faculty/sql" => Ok(Self::Sql(Sql::new(client, policy))),
            "faculty/search" => Ok(Self::WebSearch(WebSearch::new(client, policy))),
            "faculty/extract" => Ok(Self::Extract(Extract::new(client, policy))),
            unknown => Err(Error::Config(format!(
                "unknown capability URI '{unknown}'; valid URIs are: {}",
                CAPABILITY_URIS.join(", ")
            ))),
        }
    }

    /// Returns the URI this capability was resolved from.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::DocumentQa(_) => "faculty/document_qa",
            Self::Summarize(_) => "faculty/summarize",
            Self::Ask(_) => "faculty/ask",
            Self::Sql(_) => "faculty/sql",
            Self::WebSearch(_) => "faculty/search",
            Self::Extract(_) => "faculty/extract",
        }
    }
}
