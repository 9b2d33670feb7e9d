//! Durable index state, bincode-encoded with a format version tag.

use std::path::Path;

use bincode::config::standard as bincode_config;
use faculty_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{Chunk, Modality};

/// Snapshot format version, bumped on layout changes.
pub const VERSION: u32 = 1;

/// Everything needed to rebuild an index to query-equivalent state.
///
/// Holds reattach handles and stored data only, never live connection
/// internals. A restored index answers any previously-issued query with the
/// same results as the index it was captured from.
#[derive(Debug, Serialize, Deserialize)]
pub enum IndexSnapshot<T> {
    /// State of a [`MemoryIndex`](crate::MemoryIndex).
    Memory {
        /// Stored items.
        items: Vec<T>,
        /// Stored chunks in insertion order.
        chunks: Vec<Chunk>,
        /// One vector per chunk, parallel with `chunks`; empty for the
        /// text modality.
        vectors: Vec<Vec<f32>>,
        /// Vector dimension fixed by the first write, if any.
        dimension: Option<usize>,
        /// Identity of the embedding model the vectors came from.
        model_identity: Option<String>,
    },
    /// State of a [`ProjectIndex`](crate::ProjectIndex); vectors live in
    /// the remote project, referenced by its stable id.
    Project {
        /// Stored items.
        items: Vec<T>,
        /// Stored chunks in insertion order.
        chunks: Vec<Chunk>,
        /// Stable id of the remote project to reattach to.
        project_id: String,
        /// Human name the project was created under, reused on reset.
        project_name: String,
        /// Modality the project was created with.
        modality: Modality,
        /// Identity of the embedding model the vectors came from.
        model_identity: Option<String>,
    },
}

impl<T: Serialize + DeserializeOwned> IndexSnapshot<T> {
    /// Writes the snapshot to disk.
    ///
    /// # Errors
    /// Returns an error if encoding or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(&(VERSION, self), bincode_config())
            .map_err(|error| Error::Snapshot(format!("failed to encode snapshot: {error}")))?;
        tokio::fs::write(path, &bytes).await?;
        info!("Saved index snapshot ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Reads a snapshot back from disk.
    ///
    /// # Errors
    /// Returns [`Error::Snapshot`] if the file has a different format
    /// version or cannot be decoded.
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;

        // The version tag is encoded first, so it can be checked before
        // attempting to decode a possibly incompatible layout.
        let (version, _) = bincode::serde::decode_from_slice::<u32, _>(&data, bincode_config())
            .map_err(|error| Error::Snapshot(format!("failed to decode snapshot: {error}")))?;
        if version != VERSION {
            return Err(Error::Snapshot(format!(
                "snapshot version mismatch: expected {VERSION}, found {version}"
            )));
        }

        let ((_, snapshot), _) =
            bincode::serde::decode_from_slice::<(u32, Self), _>(&data, bincode_config())
                .map_err(|error| Error::Snapshot(format!("failed to decode snapshot: {error}")))?;
        Ok(snapshot)
    }
}

/// Checks a restoring model's identity against the persisted one.
///
/// Vectors from one model are meaningless under another, so a mismatch is a
/// configuration error rather than a silently wrong index.
pub(crate) fn verify_model_identity(
    persisted: Option<&str>,
    supplied: Option<&str>,
) -> Result<()> {
    if persisted == supplied {
        return Ok(());
    }
    Err(Error::Config(format!(
        "embedding model mismatch: snapshot was built with {}, restore supplied {}",
        persisted.unwrap_or("no model"),
        supplied.unwrap_or("no model")
    )))
}
