//! In-process index backed by exhaustive cosine similarity.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use faculty_core::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::chunker::Chunker;
use crate::embedding::{EmbeddingModel, check_dimensions};
use crate::index::SearchIndex;
use crate::snapshot::{IndexSnapshot, verify_model_identity};
use crate::types::{Chunk, SearchResult, TextItem};

/// A stored chunk plus its insertion sequence, used for stable tie-breaks.
#[derive(Debug, Clone)]
struct StoredChunk {
    chunk: Chunk,
    sequence: u64,
}

/// Local search index holding items, chunks, and vectors in process memory.
///
/// Queries score every stored vector with cosine similarity, which is exact
/// and fine at the scale this backend targets.
pub struct MemoryIndex<T> {
    model: Option<Arc<dyn EmbeddingModel>>,
    chunker: Chunker,
    items: HashMap<String, T>,
    chunks: HashMap<String, StoredChunk>,
    vectors: HashMap<String, Vec<f32>>,
    /// Fixed by the first write; later writes must match.
    dimension: Option<usize>,
    next_sequence: u64,
}

impl<T> std::fmt::Debug for MemoryIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("has_model", &self.model.is_some())
            .field("chunker", &self.chunker)
            .field("items", &self.items.len())
            .field("chunks", &self.chunks.len())
            .field("vectors", &self.vectors.len())
            .field("dimension", &self.dimension)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl<T: TextItem> MemoryIndex<T> {
    /// An empty index.
    ///
    /// With a model, items are chunked and embedded on update; without one,
    /// each item is stored whole with no vector and search is unsupported.
    pub fn new(model: Option<Arc<dyn EmbeddingModel>>) -> Self {
        let chunker = model
            .as_deref()
            .map_or_else(Chunker::default, Chunker::for_model);
        Self {
            model,
            chunker,
            items: HashMap::default(),
            chunks: HashMap::default(),
            vectors: HashMap::default(),
            dimension: None,
            next_sequence: 0,
        }
    }

    /// Restores an index from a snapshot.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the supplied model's identity differs
    /// from the one the snapshot was built with, and [`Error::Snapshot`]
    /// if the snapshot belongs to a different backend.
    pub fn restore(
        snapshot: IndexSnapshot<T>,
        model: Option<Arc<dyn EmbeddingModel>>,
    ) -> Result<Self>
    where
        T: Serialize + DeserializeOwned,
    {
        let IndexSnapshot::Memory {
            items,
            chunks,
            vectors,
            dimension,
            model_identity,
        } = snapshot
        else {
            return Err(Error::Snapshot(
                "snapshot belongs to a remote project index".to_owned(),
            ));
        };

        let supplied = model.as_ref().map(|model| model.identity());
        verify_model_identity(model_identity.as_deref(), supplied.as_deref())?;

        let mut index = Self::new(model);
        index.items = items.into_iter().map(|item| (item.id().to_owned(), item)).collect();
        for (sequence, chunk) in chunks.into_iter().enumerate() {
            if let Some(vector) = vectors.get(sequence) {
                index.vectors.insert(chunk.chunk_id.clone(), vector.clone());
            }
            index.chunks.insert(
                chunk.chunk_id.clone(),
                StoredChunk {
                    chunk,
                    sequence: sequence as u64,
                },
            );
        }
        index.next_sequence = index.chunks.len() as u64;
        index.dimension = dimension;
        Ok(index)
    }

    /// Drops chunks of the given items that the incoming batch no longer
    /// produces.
    ///
    /// Chunk ids encode their byte range, so when an item's text changes
    /// its old chunks get different ids than the new ones and would
    /// otherwise linger with ranges into text that no longer exists.
    fn purge_stale_chunks(&mut self, item_ids: &HashSet<&str>, fresh: &HashSet<&str>) {
        let stale: Vec<String> = self
            .chunks
            .values()
            .filter(|stored| {
                item_ids.contains(stored.chunk.item_id.as_str())
                    && !fresh.contains(stored.chunk.chunk_id.as_str())
            })
            .map(|stored| stored.chunk.chunk_id.clone())
            .collect();
        for chunk_id in stale {
            self.chunks.remove(&chunk_id);
            self.vectors.remove(&chunk_id);
        }
    }

    fn upsert_chunk(&mut self, chunk: Chunk, vector: Option<Vec<f32>>) {
        if let Some(vector) = vector {
            self.vectors.insert(chunk.chunk_id.clone(), vector);
        }
        // Re-upserting an existing chunk keeps its original sequence so
        // search tie-breaks stay stable across repeated updates.
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
}

#[async_trait]
impl<T: TextItem> SearchIndex<T> for MemoryIndex<T> {
    async fn update(&mut self, items: Vec<T>) -> Result<()> {
        let Some(model) = self.model.clone() else {
            let chunks: Vec<Chunk> = items.iter().map(Chunk::total).collect();
            let item_ids: HashSet<&str> = items.iter().map(TextItem::id).collect();
            let fresh: HashSet<&str> =
                chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
            self.purge_stale_chunks(&item_ids, &fresh);

            for item in items {
                self.items.insert(item.id().to_owned(), item);
            }
            for chunk in chunks {
                self.upsert_chunk(chunk, None);
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

        // Validate against the stored dimension before touching any state,
        // so a bad batch never leaves the index partially written.
        let dimension = self.dimension.unwrap_or_else(|| model.dimension());
        check_dimensions(&vectors, dimension)?;

        info!("Indexing {} chunks from {} items", chunks.len(), items.len());

        let item_ids: HashSet<&str> = items.iter().map(TextItem::id).collect();
        let fresh: HashSet<&str> = chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
        self.purge_stale_chunks(&item_ids, &fresh);

        for item in items {
            self.items.insert(item.id().to_owned(), item);
        }
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            self.upsert_chunk(chunk, Some(vector));
        }
        self.dimension = Some(dimension);
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult<'_, T>>> {
        let Some(model) = &self.model else {
            return Err(Error::Unsupported(
                "index has no embedding model and no text search capability".to_owned(),
            ));
        };

        let query_vectors = model.embed(&[query.to_owned()]).await?;
        let query_vector = query_vectors
            .first()
            .ok_or_else(|| Error::Remote("model returned no query embedding".to_owned()))?;
        if let Some(dimension) = self.dimension {
            check_dimensions(&query_vectors, dimension)?;
        }

        let mut scored: Vec<(&StoredChunk, f32)> = self
            .chunks
            .values()
            .filter_map(|stored| {
                self.vectors
                    .get(&stored.chunk.chunk_id)
                    .map(|vector| (stored, cosine_similarity(query_vector, vector)))
            })
            .collect();

        info!(
            "Scored {} chunks across {} items for query",
            scored.len(),
            self.items.len()
        );

        scored.sort_by(|(chunk_a, score_a), (chunk_b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then(chunk_a.sequence.cmp(&chunk_b.sequence))
        });

        scored
            .into_iter()
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

        let chunks: Vec<Chunk> = ordered.iter().map(|stored| stored.chunk.clone()).collect();
        let vectors: Vec<Vec<f32>> = ordered
            .iter()
            .filter_map(|stored| self.vectors.get(&stored.chunk.chunk_id).cloned())
            .collect();

        IndexSnapshot::Memory {
            items: self.items.values().cloned().collect(),
            chunks,
            vectors,
            dimension: self.dimension,
            model_identity: self.model.as_ref().map(|model| model.identity()),
        }
    }

    async fn reset(&mut self) -> Result<()> {
        self.items.clear();
        self.chunks.clear();
        self.vectors.clear();
        self.dimension = None;
        self.next_sequence = 0;
        Ok(())
    }
}

/// Cosine similarity between two vectors of equal length.
fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    if vector_a.len() != vector_b.len() {
        return 0.0;
    }

    let dot: f32 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(a, b)| a * b)
        .sum();
    let magnitude_a = vector_a.iter().map(|a| a * a).sum::<f32>().sqrt();
    let magnitude_b = vector_b.iter().map(|b| b * b).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot / (magnitude_a * magnitude_b)
}
