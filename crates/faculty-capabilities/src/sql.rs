//! Natural-language to SQL generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use faculty_core::{BackoffPolicy, Result, retry};

use crate::http::ApiClient;

/// SQL dialect requested from the generator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SqlVariant {
    /// Generic ANSI-flavored SQL.
    #[default]
    Vanilla,
    /// PostgreSQL dialect.
    Postgres,
    /// SQLite dialect.
    Sqlite,
    /// MySQL dialect.
    Mysql,
}

/// Request payload for the SQL endpoint.
#[derive(Serialize)]
struct SqlRequest<'a> {
    /// Natural-language description of the query.
    query: &'a str,
    /// Textual schema of the target database.
    sql_schema: &'a str,
    /// Requested dialect.
    sql_type: SqlVariant,
}

/// Response payload from the SQL endpoint.
#[derive(Deserialize)]
struct SqlResponse {
    /// The generated SQL statement.
    sql_query: String,
}

/// Generates SQL from a natural-language request and a schema.
#[derive(Debug)]
pub struct Sql {
    /// Shared HTTP client.
    client: Arc<ApiClient>,
    /// Retry policy for transient failures.
    policy: BackoffPolicy,
}

impl Sql {
    /// Creates the wrapper around a shared client.
    pub fn new(client: Arc<ApiClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Generates a SQL statement answering `query` over `sql_schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after exhausting retries or
    /// the response cannot be decoded.
    pub async fn call(
        &self,
        query: &str,
        sql_schema: &str,
        variant: SqlVariant,
    ) -> Result<String> {
        let payload = SqlRequest {
            query,
            sql_schema,
            sql_type: variant,
        };
        let response: SqlResponse =
            retry("sql", self.policy, || self.client.post("sql", &payload)).await?;
        Ok(response.sql_query)
    }
}
