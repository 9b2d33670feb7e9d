//! Embedding model abstraction with remote, local, and hash-based variants.

mod hash;
#[cfg(feature = "local")]
mod local;
mod remote;

pub use hash::HashEmbeddingModel;
#[cfg(feature = "local")]
pub use local::LocalEmbeddingModel;
pub use remote::{RemoteEmbeddingConfig, RemoteEmbeddingModel};

use async_trait::async_trait;
use faculty_core::{Error, Result};

/// Maps texts to fixed-dimension vectors.
///
/// Implementations are object-safe so indexes can hold `Arc<dyn
/// EmbeddingModel>` and tests can substitute deterministic fakes.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Stable identity of the model, persisted in snapshots.
    ///
    /// Restoring an index with a model whose identity differs from the
    /// persisted one fails with a configuration error.
    fn identity(&self) -> String;

    /// Output vector dimension, fixed per instance.
    fn dimension(&self) -> usize;

    /// Largest input length the model accepts, in chars.
    fn max_input_chars(&self) -> usize;

    /// Embeds a batch of texts, one vector per input in input order.
    ///
    /// Empty input yields an empty output.
    ///
    /// # Errors
    /// Returns an error if the model is unreachable or misconfigured.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Verifies that every vector in a batch has the model's dimension.
///
/// A mismatch means the model or its configuration is wrong, which no
/// retry can fix, so it surfaces as [`Error::Config`].
pub(crate) fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    for vector in vectors {
        if vector.len() != expected {
            return Err(Error::Config(format!(
                "embedding dimension mismatch: expected {expected}, got {}",
                vector.len()
            )));
        }
    }
    Ok(())
}
