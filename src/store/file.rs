use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tempfile::NamedTempFile;

use super::{check_id, encode_preview, Store, StoreError};
use crate::codec;
use crate::model::DicomEntry;

const DICOM_DIR: &str = "dicom";
const PNG_DIR: &str = "png";
const DICOM_EXT: &str = "dcm";
const PNG_EXT: &str = "png";

/// Stores re-encoded DICOM files and PNG previews under a root directory:
/// `<root>/dicom/<id>.dcm` and `<root>/png/<id>.png`.
///
/// Files are replaced atomically through a temporary file in the same
/// directory. The lock serializes writers against readers of this instance
/// only; other processes sharing the root are not coordinated.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Opens a store at `root`, creating the directory layout if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in [root.join(DICOM_DIR), root.join(PNG_DIR)] {
            fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        }
        log::info!("Opened file store at {}", root.display());
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dicom_path(&self, id: &str) -> Option<PathBuf> {
        artifact_path(&self.root, DICOM_DIR, id, DICOM_EXT)
    }

    fn png_path(&self, id: &str) -> Option<PathBuf> {
        artifact_path(&self.root, PNG_DIR, id, PNG_EXT)
    }
}

impl Store for FileStore {
    fn create(&self, entry: DicomEntry) -> Result<(), StoreError> {
        let id = entry.id();
        check_id(id)?;
        let invalid = || StoreError::InvalidId(id.to_string());
        let dicom_path = self.dicom_path(id).ok_or_else(invalid)?;
        let png_path = self.png_path(id).ok_or_else(invalid)?;

        // Encode both forms before touching the disk.
        let dicom_bytes =
            codec::to_bytes(entry.dataset()).map_err(|source| StoreError::EncodeDataset {
                id: id.to_string(),
                source,
            })?;
        let png_bytes = encode_preview(&entry)?;

        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        write_atomic(&dicom_path, &dicom_bytes)?;
        match png_bytes {
            Some(bytes) => write_atomic(&png_path, &bytes)?,
            None => remove_if_exists(&png_path)?,
        }
        log::info!("Saved DICOM {id} to {}", dicom_path.display());
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Arc<DicomEntry>, StoreError> {
        let path = self
            .dicom_path(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        load_entry(&path)
    }

    fn get_image(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self
            .png_path(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    /// Decodes every stored file; the first one that fails aborts the listing.
    fn list(&self) -> Result<Vec<Arc<DicomEntry>>, StoreError> {
        let dir = self.root.join(DICOM_DIR);
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
            let path = dir_entry.map_err(io_error(&dir))?.path();
            if path.extension() != Some(OsStr::new(DICOM_EXT)) || !path.is_file() {
                continue;
            }
            entries.push(load_entry(&path)?);
        }
        log::debug!("Listed {} DICOM(s) from {}", entries.len(), dir.display());
        Ok(entries)
    }
}

fn load_entry(path: &Path) -> Result<Arc<DicomEntry>, StoreError> {
    let object = codec::open(path)?;
    // The preview is already on disk; skip decoding pixel data again.
    Ok(Arc::new(DicomEntry::without_preview(object)?))
}

/// `None` when the id cannot be used as a single file name.
fn artifact_path(root: &Path, dir: &str, id: &str, ext: &str) -> Option<PathBuf> {
    check_id(id).ok()?;
    Some(root.join(dir).join(format!("{id}.{ext}")))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    file.write_all(bytes).map_err(io_error(file.path()))?;
    file.persist(path).map_err(|err| io_error(path)(err.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale preview {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_error(path)(err)),
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
