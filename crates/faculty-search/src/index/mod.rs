//! Search index backends over a common contract.

mod memory;
mod project;

pub use memory::MemoryIndex;
pub use project::ProjectIndex;

use async_trait::async_trait;
use faculty_core::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::snapshot::IndexSnapshot;
use crate::types::{SearchResult, TextItem};

/// Common contract for the local and remote index backends.
///
/// `update` takes `&mut self` and `search` takes `&self`, so the borrow
/// checker enforces one writer or many readers; callers that share an index
/// across threads serialize updates with their own synchronization.
#[async_trait]
pub trait SearchIndex<T: TextItem>: Send + Sync {
    /// Upserts items into the index.
    ///
    /// With an embedding model the items are chunked and all chunk texts of
    /// the batch are embedded in a single model call; without one, each item
    /// is stored as a single whole-text record. Upserting an unchanged item
    /// is idempotent: chunk ids are deterministic, so existing records are
    /// overwritten rather than duplicated.
    ///
    /// # Errors
    /// Returns [`Error::Config`](faculty_core::Error::Config) before any
    /// write if the model's vectors do not match the stored dimension.
    async fn update(&mut self, items: Vec<T>) -> Result<()>;

    /// Returns up to `limit` chunks nearest to the query, best first.
    ///
    /// Ties are broken by chunk insertion order.
    ///
    /// # Errors
    /// Returns [`Error::Unsupported`](faculty_core::Error::Unsupported) if
    /// the backend has no query path for its modality, and
    /// [`Error::NotFound`](faculty_core::Error::NotFound) if a returned
    /// chunk no longer resolves to a stored item.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult<'_, T>>>;

    /// Number of stored items.
    fn len(&self) -> usize;

    /// Whether the index holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captures the durable state needed to restore this index.
    fn snapshot(&self) -> IndexSnapshot<T>
    where
        T: Serialize + DeserializeOwned;

    /// Clears all stored state, returning the index to empty.
    ///
    /// The remote backend also deletes its remote project.
    async fn reset(&mut self) -> Result<()>;
}
