//! Deterministic sliding-window chunker.

use crate::embedding::EmbeddingModel;
use crate::types::{Chunk, TextItem};

/// Default window size in chars.
pub const DEFAULT_WINDOW_CHARS: usize = 1000;
/// Default overlap between consecutive windows in chars.
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

/// Splits item text into overlapping char windows.
///
/// Chunking is a pure function of the text and the policy: the same input
/// always yields identical chunk boundaries and ids, so re-indexing an
/// unchanged item overwrites existing chunks instead of duplicating them.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    /// Window size in chars.
    pub window_chars: usize,
    /// Overlap between consecutive windows in chars, strictly less than
    /// the window size.
    pub overlap_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            window_chars: DEFAULT_WINDOW_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

impl Chunker {
    /// A chunker whose window fits within the model's input limit.
    pub fn for_model(model: &dyn EmbeddingModel) -> Self {
        let policy = Self::default();
        let window_chars = policy.window_chars.min(model.max_input_chars());
        Self {
            window_chars,
            overlap_chars: policy.overlap_chars.min(window_chars / 2),
        }
    }

    /// Chunks one item into overlapping windows with byte-offset ranges.
    ///
    /// Windows are measured in chars but ranges are recorded in byte
    /// offsets, so `substring_range` always lands on char boundaries and
    /// slices the parent text byte-exactly. Empty text yields no chunks.
    pub fn chunk(&self, item: &impl TextItem) -> Vec<Chunk> {
        let text = item.text();
        if text.is_empty() {
            return Vec::default();
        }

        // Byte offset of each char plus one past-the-end sentinel.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        boundaries.push(text.len());
        let char_count = boundaries.len() - 1;

        let step = self.window_chars.saturating_sub(self.overlap_chars).max(1);
        let mut chunks = Vec::default();
        let mut start_char = 0;
        loop {
            let end_char = (start_char + self.window_chars).min(char_count);
            let range = boundaries[start_char]..boundaries[end_char];
            chunks.push(Chunk::from_range(item.id(), &text, range));
            if end_char == char_count {
                break;
            }
            start_char += step;
        }
        chunks
    }

    /// Chunks a batch of items lazily, flattening in item order.
    pub fn get_chunks<'items, T: TextItem>(
        &self,
        items: &'items [T],
    ) -> impl Iterator<Item = Chunk> + 'items {
        let chunker = *self;
        items.iter().flat_map(move |item| chunker.chunk(item))
    }
}
