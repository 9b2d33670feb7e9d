//! Core data model for indexable items and their chunks.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Anything the index can store and search over.
///
/// The index keeps its own copy of each item, so callers can drop their
/// handles after [`update`](crate::SearchIndex::update) and snapshots never
/// depend on caller-held state. Ids must be stable and globally unique
/// across the lifetime of an index.
pub trait TextItem: Clone + Send + Sync {
    /// Stable, globally unique identifier.
    fn id(&self) -> &str;

    /// Full text content of the item.
    fn text(&self) -> String;
}

/// A contiguous slice of an item's text, the unit of indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic chunk identifier, `"{item_id}:{start}-{end}"`.
    pub chunk_id: String,
    /// Id of the owning item.
    pub item_id: String,
    /// Chunk text, byte-exact slice of the parent text.
    pub text: String,
    /// Byte-offset range into the parent text, aligned to char boundaries.
    ///
    /// Invariant: `item.text()[substring_range] == text` at chunking time.
    pub substring_range: Range<usize>,
}

impl Chunk {
    /// Builds a chunk from an explicit byte range of an item's text.
    ///
    /// The range must lie on char boundaries of `text`.
    pub fn from_range(item_id: &str, text: &str, range: Range<usize>) -> Self {
        Self {
            chunk_id: format!("{item_id}:{}-{}", range.start, range.end),
            item_id: item_id.to_owned(),
            text: text[range.clone()].to_owned(),
            substring_range: range,
        }
    }

    /// A single chunk spanning the item's whole text.
    ///
    /// Used for whole-item indexing when no embedding model is configured.
    pub fn total(item: &impl TextItem) -> Self {
        let text = item.text();
        let len = text.len();
        Self::from_range(item.id(), &text, 0..len)
    }
}

/// One search hit, borrowed from the index's item store.
///
/// Valid until the index next mutates. Higher scores are better; scores are
/// only comparable within a single backend.
#[derive(Debug)]
pub struct SearchResult<'items, T> {
    /// The item the matching chunk belongs to.
    pub item: &'items T,
    /// Similarity score, higher is better.
    pub score: f32,
    /// Id of the matching chunk.
    pub chunk_id: String,
    /// Byte range of the matching chunk within `item.text()`.
    pub substring_range: Range<usize>,
}

/// How an index represents its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// Chunked text with one vector per chunk.
    Embedding,
    /// Whole-item text records, no vectors.
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Note {
        id: String,
        body: String,
    }

    impl TextItem for Note {
        fn id(&self) -> &str {
            &self.id
        }

        fn text(&self) -> String {
            self.body.clone()
        }
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        let chunk_a = Chunk::from_range("note-1", "hello world", 0..5);
        let chunk_b = Chunk::from_range("note-1", "hello world", 0..5);
        assert_eq!(chunk_a.chunk_id, "note-1:0-5");
        assert_eq!(chunk_a, chunk_b);
    }

    #[test]
    fn test_total_spans_whole_text() {
        let note = Note {
            id: "note-2".to_owned(),
            body: "résumé".to_owned(),
        };
        let chunk = Chunk::total(&note);
        assert_eq!(chunk.substring_range, 0..note.body.len());
        assert_eq!(chunk.text, note.body);
        assert_eq!(note.text()[chunk.substring_range.clone()], chunk.text);
    }
}
