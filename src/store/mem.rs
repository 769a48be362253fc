use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{check_id, encode_preview, Store, StoreError};
use crate::model::DicomEntry;

/// Keeps entries and PNG previews in memory for the lifetime of the process.
///
/// Both maps sit behind one lock so an entry and its preview are always
/// replaced together.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    dicoms: HashMap<String, Arc<DicomEntry>>,
    pngs: HashMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dicoms
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemStore {
    fn create(&self, entry: DicomEntry) -> Result<(), StoreError> {
        check_id(entry.id())?;
        let png = encode_preview(&entry)?;
        let id = entry.id().to_string();

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match png {
            Some(bytes) => {
                inner.pngs.insert(id.clone(), bytes);
            }
            None => {
                inner.pngs.remove(&id);
            }
        }
        log::info!("Saved DICOM {id} in memory");
        inner.dicoms.insert(id, Arc::new(entry));
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Arc<DicomEntry>, StoreError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dicoms
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_image(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pngs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<Arc<DicomEntry>>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.dicoms.values().cloned().collect())
    }
}
