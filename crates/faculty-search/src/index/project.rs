//! Index backed by a project-scoped remote vector service.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use faculty_core::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::info;

use crate::chunker::Chunker;
use crate::embedding::{EmbeddingModel, check_dimensions};
use crate::index::SearchIndex;
use crate::service::{VectorRecord, VectorService};
use crate::snapshot::{IndexSnapshot, verify_model_identity};
use crate::types::{Chunk, Modality, SearchResult, TextItem};

#[derive(Debug, Clone)]
struct StoredChunk {
    chunk: Chunk,
    sequence: u64,
}

/// Search index whose vectors live in a remote project.
///
/// The service only ever returns ids and scores, so the process keeps the
/// authoritative item and chunk stores locally and resolves every hit
/// against them. The remote query index is created lazily on first search
/// and its id cached for the lifetime of this value.
pub struct ProjectIndex<T> {
    service: Arc<dyn VectorService>,
    model: Option<Arc<dyn EmbeddingModel>>,
    chunker: Chunker,
    items: HashMap<String, T>,
    chunks: HashMap<String, StoredChunk>,
    project_id: String,
    project_name: String,
    modality: Modality,
    index_handle: OnceCell<String>,
    next_sequence: u64,
}

impl<T> std::fmt::Debug for ProjectIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectIndex")
            .field("has_model", &self.model.is_some())
            .field("chunker", &self.chunker)
            .field("items", &self.items.len())
            .field("chunks", &self.chunks.len())
            .field("project_id", &self.project_id)
            .field("project_name", &self.project_name)
            .field("modality", &self.modality)
            .field("index_handle", &self.index_handle)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl<T: TextItem> ProjectIndex<T> {
    /// Creates a fresh remote project and an empty index over it.
    ///
    /// # Errors
    /// Returns an error if the service rejects the project creation.
    pub async fn create(
        service: Arc<dyn VectorService>,
        model: Option<Arc<dyn EmbeddingModel>>,
        project_name: &str,
    ) -> Result<Self> {
        let modality = if model.is_some() {
            Modality::Embedding
        } else {
            Modality::Text
        };
        let handle = service.create_project(project_name, modality).await?;
        info!(
            "Created remote project '{project_name}' ({})",
            handle.project_id
        );

        Ok(Self::assemble(
            service,
            model,
            handle.project_id,
            project_name.to_owned(),
            modality,
        ))
    }

    /// Reattaches to an existing remote project from a snapshot.
    ///
    /// Never recreates or resets the remote project; the restored index
    /// answers queries exactly as the captured one did.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the supplied model's identity differs
    /// from the snapshot's, and [`Error::Snapshot`] if the snapshot belongs
    /// to the local backend.
    pub fn attach(
        service: Arc<dyn VectorService>,
        model: Option<Arc<dyn EmbeddingModel>>,
        snapshot: IndexSnapshot<T>,
    ) -> Result<Self>
    where
        T: Serialize + DeserializeOwned,
    {
        let IndexSnapshot::Project {
            items,
            chunks,
            project_id,
            project_name,
            modality,
            model_identity,
        } = snapshot
        else {
            return Err(Error::Snapshot(
                "snapshot belongs to a local memory index".to_owned(),
            ));
        };

        let supplied = model.as_ref().map(|model| model.identity());
        verify_model_identity(model_identity.as_deref(), supplied.as_deref())?;

        let mut index = Self::assemble(service, model, project_id, project_name, modality);
        index.items = items
            .into_iter()
            .map(|item| (item.id().to_owned(), item))
            .collect();
        for (sequence, chunk) in chunks.into_iter().enumerate() {
            index.chunks.insert(
                chunk.chunk_id.clone(),
                StoredChunk {
                    chunk,
                    sequence: sequence as u64,
                },
            );
        }
        index.next_sequence = index.chunks.len() as u64;
        Ok(index)
    }

    fn assemble(
        service: Arc<dyn VectorService>,
        model: Option<Arc<dyn EmbeddingModel>>,
        project_id: String,
        project_name: String,
        modality: Modality,
    ) -> Self {
        let chunker = model
            .as_deref()
            .map_or_else(Chunker::default, Chunker::for_model);
        Self {
            service,
            model,
            chunker,
            items: HashMap::default(),
            chunks: HashMap::default(),
            project_id,
            project_name,
            modality,
            index_handle: OnceCell::new(),
            next_sequence: 0,
        }
    }

    /// Stable id of the backing remote project.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn record_for(chunk: &Chunk) -> VectorRecord {
        VectorRecord {
            id: chunk.chunk_id.clone(),
            payload: json!({
                "item_id": chunk.item_id,
                "start": chunk.substring_range.start,
                "end": chunk.substring_range.end,
            }),
        }
    }

    fn upsert_chunk(&mut self, chunk: Chunk) {
        let sequence = match self.chunks.get(&chunk.chunk_id) {
            Some(stored) => stored.sequence,
            None => {
                let next = self.next_sequence;
                self.next_sequence += 1;
                next
            }
        };
        self.chunks
            .insert(chunk.chunk_id.clone(), StoredChunk { chunk, sequence });
    }

    /// Ids of stored chunks the incoming batch no longer produces.
    ///
    /// Chunk ids encode their byte range, so when an item's text changes
    /// its old chunks get different ids than the new ones and would
    /// otherwise linger both here and in the remote project.
    fn stale_chunk_ids(&self, item_ids: &HashSet<&str>, fresh: &HashSet<&str>) -> Vec<String> {
        self.chunks
            .values()
            .filter(|stored| {
                item_ids.contains(stored.chunk.item_id.as_str())
                    && !fresh.contains(stored.chunk.chunk_id.as_str())
            })
            .map(|stored| stored.chunk.chunk_id.clone())
            .collect()
    }

    async fn purge_stale_chunks(&mut self, items: &[T], chunks: &[Chunk]) -> Result<()> {
        let item_ids: HashSet<&str> = items.iter().map(TextItem::id).collect();
        let fresh: HashSet<&str> = chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
        let stale = self.stale_chunk_ids(&item_ids, &fresh);
        if stale.is_empty() {
            return Ok(());
        }

        self.service
            .delete_records(&self.project_id, stale.clone())
            .await?;
        for chunk_id in stale {
            self.chunks.remove(&chunk_id);
        }
        Ok(())
    }

    async fn index_id(&self) -> Result<&str> {
        let id = self
            .index_handle
            .get_or_try_init(|| async {
                let handle = self.service.ensure_index(&self.project_id).await?;
                Ok::<_, Error>(handle.index_id)
            })
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl<T: TextItem> SearchIndex<T> for ProjectIndex<T> {
    async fn update(&mut self, items: Vec<T>) -> Result<()> {
        let Some(model) = self.model.clone() else {
            let chunks: Vec<Chunk> = items.iter().map(Chunk::total).collect();
            self.purge_stale_chunks(&items, &chunks).await?;

            let records = chunks.iter().map(Self::record_for).collect();
            self.service.add_texts(&self.project_id, records).await?;

            for item in items {
                self.items.insert(item.id().to_owned(), item);
            }
            for chunk in chunks {
                self.upsert_chunk(chunk);
            }
            return Ok(());
        };

        let chunks: Vec<Chunk> = self.chunker.get_chunks(&items).collect();
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = model.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::Config(format!(
                "model returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        check_dimensions(&vectors, model.dimension())?;

        info!(
            "Pushing {} chunks from {} items to project {}",
            chunks.len(),
            items.len(),
            self.project_id
        );

        self.purge_stale_chunks(&items, &chunks).await?;

        let records = chunks.iter().map(Self::record_for).collect();
        self.service
            .add_vectors(&self.project_id, records, vectors)
            .await?;

        for item in items {
            self.items.insert(item.id().to_owned(), item);
        }
        for chunk in chunks {
            self.upsert_chunk(chunk);
        }
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult<'_, T>>> {
        let Some(model) = &self.model else {
            return Err(Error::Unsupported(
                "text-modality project has no text search capability".to_owned(),
            ));
        };

        let query_vectors = model.embed(&[query.to_owned()]).await?;
        check_dimensions(&query_vectors, model.dimension())?;
        let query_vector = query_vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote("model returned no query embedding".to_owned()))?;

        // Wait out other writers so the query sees a stable snapshot.
        self.service.wait_until_unlocked(&self.project_id).await?;

        let index_id = self.index_id().await?.to_owned();
        let neighbors = self
            .service
            .vector_search(&index_id, vec![query_vector], limit)
            .await?;
        info!(
            "Project {} returned {} neighbor rows",
            self.project_id,
            neighbors.ids.len()
        );

        let ids = neighbors.ids.into_iter().next().unwrap_or_default();
        let scores = neighbors.scores.into_iter().next().unwrap_or_default();

        let mut hits: Vec<(&StoredChunk, f32)> = Vec::with_capacity(ids.len());
        for (chunk_id, score) in ids.iter().zip(scores) {
            let stored = self.chunks.get(chunk_id).ok_or_else(|| {
                Error::NotFound(format!("service returned unknown chunk id {chunk_id}"))
            })?;
            hits.push((stored, score));
        }

        hits.sort_by(|(chunk_a, score_a), (chunk_b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then(chunk_a.sequence.cmp(&chunk_b.sequence))
        });

        hits.into_iter()
            .take(limit)
            .map(|(stored, score)| {
                let item = self.items.get(&stored.chunk.item_id).ok_or_else(|| {
                    Error::NotFound(format!(
                        "chunk {} references missing item {}",
                        stored.chunk.chunk_id, stored.chunk.item_id
                    ))
                })?;
                Ok(SearchResult {
                    item,
                    score,
                    chunk_id: stored.chunk.chunk_id.clone(),
                    substring_range: stored.chunk.substring_range.clone(),
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn snapshot(&self) -> IndexSnapshot<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut ordered: Vec<&StoredChunk> = self.chunks.values().collect();
        ordered.sort_by_key(|stored| stored.sequence);

        IndexSnapshot::Project {
            items: self.items.values().cloned().collect(),
            chunks: ordered.iter().map(|stored| stored.chunk.clone()).collect(),
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            modality: self.modality,
            model_identity: self.model.as_ref().map(|model| model.identity()),
        }
    }

    async fn reset(&mut self) -> Result<()> {
        self.service.delete_project(&self.project_id).await?;

        let handle = self
            .service
            .create_project(&self.project_name, self.modality)
            .await?;
        info!(
            "Reset project '{}': {} replaced by {}",
            self.project_name, self.project_id, handle.project_id
        );

        self.project_id = handle.project_id;
        self.items.clear();
        self.chunks.clear();
        self.index_handle = OnceCell::new();
        self.next_sequence = 0;
        Ok(())
    }
}
