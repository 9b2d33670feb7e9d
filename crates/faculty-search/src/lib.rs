//! Semantic search indexing over text items.
//!
//! Items implementing [`TextItem`] are split into overlapping chunks,
//! embedded through an [`EmbeddingModel`], and stored in a backend behind
//! the [`SearchIndex`] contract: [`MemoryIndex`] keeps everything in
//! process, [`ProjectIndex`] delegates vector storage and nearest-neighbor
//! queries to a project-scoped remote service. Both persist through
//! [`IndexSnapshot`] and restore to query-equivalent state.

/// Sliding-window chunking of item text.
pub mod chunker;
/// Embedding model variants.
pub mod embedding;
/// Index backends.
pub mod index;
/// Document loading helpers.
pub mod loader;
/// Remote vector service wire contract.
pub mod service;
/// Durable index snapshots.
pub mod snapshot;
/// Item, chunk, and result types.
pub mod types;

pub use chunker::Chunker;
#[cfg(feature = "local")]
pub use embedding::LocalEmbeddingModel;
pub use embedding::{EmbeddingModel, HashEmbeddingModel, RemoteEmbeddingConfig, RemoteEmbeddingModel};
pub use index::{MemoryIndex, ProjectIndex, SearchIndex};
pub use loader::{Document, DocumentSource, load_text_document};
pub use service::{
    HttpVectorService, IndexHandle, Neighbors, ProjectHandle, VectorRecord, VectorService,
};
pub use snapshot::IndexSnapshot;
pub use types::{Chunk, Modality, SearchResult, TextItem};
