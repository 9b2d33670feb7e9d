//! Loading documents into indexable items.

use std::path::Path;

use faculty_core::Result;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::types::TextItem;

/// A plain text document, the simplest indexable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document id.
    pub id: String,
    /// Full document text.
    pub text: String,
}

impl TextItem for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> String {
        self.text.clone()
    }
}

/// Reads a UTF-8 text file as a [`Document`].
///
/// The id is the path itself, so reloading the same file across runs yields
/// the same id and re-indexing overwrites instead of duplicating.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub async fn load_text_document(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path).await?;
    debug!("Loaded {} chars from {}", text.chars().count(), path.display());
    Ok(Document {
        id: path.to_string_lossy().into_owned(),
        text,
    })
}

/// Seam for collaborators that extract text from formats this library does
/// not parse itself, like PDFs or office documents.
pub trait DocumentSource {
    /// Produces the documents this source holds.
    ///
    /// # Errors
    /// Returns an error if extraction fails.
    fn documents(&self) -> Result<Vec<Document>>;
}
