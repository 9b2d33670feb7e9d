//! Deterministic hash-projection embedder for tests and offline use.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};

use async_trait::async_trait;
use faculty_core::Result;

use super::EmbeddingModel;

/// Embeds text by projecting a content hash into a fixed-dimension vector.
///
/// Identical texts always map to identical vectors, which is exactly what
/// index round-trip and idempotency tests need. Not a semantic model:
/// similarity between different texts is meaningless.
pub struct HashEmbeddingModel {
    dimension: usize,
}

impl Default for HashEmbeddingModel {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

impl HashEmbeddingModel {
    /// An embedder producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_embedding(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        (0..self.dimension)
            .map(|idx| ((hash.wrapping_add(idx as u64)) % 1000) as f32 / 1000.0)
            .collect()
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbeddingModel {
    fn identity(&self) -> String {
        format!("hash-{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_input_chars(&self) -> usize {
        usize::MAX
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.hash_embedding(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let model = HashEmbeddingModel::default();
        let first = model.embed(&["hello".to_owned()]).await.unwrap();
        let second = model.embed(&["hello".to_owned()]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 384);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let model = HashEmbeddingModel::new(16);
        let vectors = model.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
