//! Identifier-indexed storage of DICOM entries and their previews.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{DicomEntry, EntryError};

mod file;
mod mem;

pub use file::FileStore;
pub use mem::MemStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("DICOM {0} not found")]
    NotFound(String),

    #[error("invalid DICOM id `{0}`")]
    InvalidId(String),

    #[error("failed to decode DICOM from {origin}: {source}")]
    Malformed {
        origin: String,
        source: dicom::object::ReadError,
    },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to encode DICOM {id}: {source}")]
    EncodeDataset {
        id: String,
        source: dicom::object::WriteError,
    },

    #[error("failed to encode preview for {id}: {source}")]
    EncodePreview {
        id: String,
        source: image::ImageError,
    },

    #[error(transparent)]
    Entry(#[from] EntryError),
}

impl StoreError {
    /// Whether the caller should report the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Storage of DICOM entries keyed by SOP Instance UID.
///
/// Creating an id that already exists replaces the previous entry and its
/// preview.
pub trait Store: Send + Sync {
    /// Persists the entry and, when one was rendered, its PNG preview.
    fn create(&self, entry: DicomEntry) -> Result<(), StoreError>;

    fn read(&self, id: &str) -> Result<Arc<DicomEntry>, StoreError>;

    /// PNG bytes of the entry's preview.
    ///
    /// Entries without pixel data have no preview and yield `NotFound`.
    fn get_image(&self, id: &str) -> Result<Vec<u8>, StoreError>;

    /// All stored entries, in no particular order.
    fn list(&self) -> Result<Vec<Arc<DicomEntry>>, StoreError>;
}

/// Rejects ids that cannot name a single stored artifact.
///
/// Both backends apply the same rule so an id accepted by one is accepted
/// by the other.
fn check_id(id: &str) -> Result<(), StoreError> {
    let unusable = id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']);
    if unusable {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn encode_preview(entry: &DicomEntry) -> Result<Option<Vec<u8>>, StoreError> {
    entry
        .preview_png()
        .map_err(|source| StoreError::EncodePreview {
            id: entry.id().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_single_path_components() {
        for id in ["", ".", "..", "a/b", "a\\b", "a\0b", "../escape"] {
            assert!(
                matches!(check_id(id), Err(StoreError::InvalidId(bad)) if bad == id),
                "{id:?}"
            );
        }
        assert!(check_id("1.2.840.113619.2.55").is_ok());
    }
}
