//! Wire contract for the project-scoped remote vector service.

use std::time::Duration;

use async_trait::async_trait;
use faculty_core::{BackoffPolicy, Error, Result, retry};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Modality;

/// Handle to a remote project, the unit of storage scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectHandle {
    /// Stable project id, valid across process restarts.
    pub project_id: String,
}

/// Handle to a query index built over a project's records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHandle {
    /// Id of the projection to query against.
    pub index_id: String,
}

/// One record pushed to the service alongside its vector or text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id, echoed back by searches.
    pub id: String,
    /// Opaque payload stored with the record.
    pub payload: serde_json::Value,
}

/// Nearest-neighbor results as parallel arrays, one row per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbors {
    /// Record ids per query, best first.
    pub ids: Vec<Vec<String>>,
    /// Scores aligned with `ids`; higher is better.
    pub scores: Vec<Vec<f32>>,
}

/// Project-scoped vector storage and nearest-neighbor search.
///
/// Object-safe so indexes hold `Arc<dyn VectorService>` and tests swap in
/// an in-memory implementation.
#[async_trait]
pub trait VectorService: Send + Sync {
    /// Creates a fresh project for the given modality.
    async fn create_project(&self, name: &str, modality: Modality) -> Result<ProjectHandle>;

    /// Uploads records with their embeddings.
    ///
    /// `records` and `embeddings` must have equal length.
    async fn add_vectors(
        &self,
        project_id: &str,
        records: Vec<VectorRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()>;

    /// Uploads text-only records (no vectors).
    async fn add_texts(&self, project_id: &str, records: Vec<VectorRecord>) -> Result<()>;

    /// Creates, or fetches if one already exists, the project's query index.
    async fn ensure_index(&self, project_id: &str) -> Result<IndexHandle>;

    /// Nearest-neighbor query against an index, `k` results per query.
    async fn vector_search(
        &self,
        index_id: &str,
        queries: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<Neighbors>;

    /// Removes records (and their vectors) by id.
    ///
    /// Ids the project does not hold are ignored.
    async fn delete_records(&self, project_id: &str, ids: Vec<String>) -> Result<()>;

    /// Blocks until no other client holds the project's write lock.
    async fn wait_until_unlocked(&self, project_id: &str) -> Result<()>;

    /// Deletes the project and everything stored under it.
    async fn delete_project(&self, project_id: &str) -> Result<()>;
}

#[derive(Serialize)]
struct CreateProjectRequest<'name> {
    name: &'name str,
    modality: Modality,
}

#[derive(Serialize)]
struct AddVectorsRequest {
    records: Vec<VectorRecord>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct AddTextsRequest {
    records: Vec<VectorRecord>,
}

#[derive(Serialize)]
struct SearchRequest {
    queries: Vec<Vec<f32>>,
    k: usize,
}

#[derive(Serialize)]
struct DeleteRecordsRequest {
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct ProjectStatus {
    locked: bool,
}

/// [`VectorService`] over HTTP with retry on transient failures.
#[derive(Debug)]
pub struct HttpVectorService {
    client: Client,
    base_url: String,
    api_key: String,
    policy: BackoffPolicy,
}

impl HttpVectorService {
    /// Builds a service client for the given endpoint.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the API key is empty, or an error if
    /// the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        policy: BackoffPolicy,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "vector service requires an API key".to_owned(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            policy,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{path}", self.base_url))
            .header("api-key", &self.api_key)
    }

    async fn send<Resp: DeserializeOwned>(
        &self,
        operation: &str,
        build: impl Fn() -> RequestBuilder + Send + Sync,
    ) -> Result<Resp> {
        retry(operation, self.policy, || async {
            let response = build().send().await?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::NotFound(format!("{operation}: {body}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Remote(format!(
                    "{operation} failed with status {status}: {body}"
                )));
            }
            Ok(response.json().await?)
        })
        .await
    }
}

#[async_trait]
impl VectorService for HttpVectorService {
    async fn create_project(&self, name: &str, modality: Modality) -> Result<ProjectHandle> {
        debug!("Creating remote project '{name}'");
        self.send("create_project", || {
            self.request(Method::POST, "projects")
                .json(&CreateProjectRequest { name, modality })
        })
        .await
    }

    async fn add_vectors(
        &self,
        project_id: &str,
        records: Vec<VectorRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        if records.len() != embeddings.len() {
            return Err(Error::Config(format!(
                "record count {} does not match embedding count {}",
                records.len(),
                embeddings.len()
            )));
        }

        let payload = AddVectorsRequest {
            records,
            embeddings,
        };
        let path = format!("projects/{project_id}/vectors");
        self.send::<serde_json::Value>("add_vectors", || {
            self.request(Method::POST, &path).json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn add_texts(&self, project_id: &str, records: Vec<VectorRecord>) -> Result<()> {
        let payload = AddTextsRequest { records };
        let path = format!("projects/{project_id}/texts");
        self.send::<serde_json::Value>("add_texts", || {
            self.request(Method::POST, &path).json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn ensure_index(&self, project_id: &str) -> Result<IndexHandle> {
        let path = format!("projects/{project_id}/index");
        self.send("ensure_index", || self.request(Method::POST, &path))
            .await
    }

    async fn vector_search(
        &self,
        index_id: &str,
        queries: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<Neighbors> {
        let payload = SearchRequest { queries, k };
        let path = format!("indexes/{index_id}/query");
        self.send("vector_search", || {
            self.request(Method::POST, &path).json(&payload)
        })
        .await
    }

    async fn delete_records(&self, project_id: &str, ids: Vec<String>) -> Result<()> {
        let payload = DeleteRecordsRequest { ids };
        let path = format!("projects/{project_id}/records/delete");
        self.send::<serde_json::Value>("delete_records", || {
            self.request(Method::POST, &path).json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn wait_until_unlocked(&self, project_id: &str) -> Result<()> {
        let path = format!("projects/{project_id}");
        for attempt in 0..self.policy.max_attempts {
            let status: ProjectStatus = self
                .send("project_status", || self.request(Method::GET, &path))
                .await?;
            if !status.locked {
                return Ok(());
            }
            let delay = self.policy.delay_for(attempt);
            warn!(
                "Project {project_id} is locked by another writer, waiting {:.2}s",
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
        Err(Error::Exhausted {
            operation: "wait_until_unlocked".to_owned(),
            attempts: self.policy.max_attempts,
        })
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let path = format!("projects/{project_id}");
        self.send::<serde_json::Value>("delete_project", || {
            self.request(Method::DELETE, &path)
        })
        .await?;
        Ok(())
    }
}
