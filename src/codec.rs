//! Thin wrappers over the DICOM file codec.

use std::io::Read;
use std::path::{Path, PathBuf};

use dicom::object::{from_reader, open_file, DefaultDicomObject};

use crate::store::StoreError;

const PREAMBLE_LEN: usize = 128;

pub fn open(path: &Path) -> Result<DefaultDicomObject, StoreError> {
    log::debug!("Decoding DICOM file: {}", path.display());
    open_file(path).map_err(|source| StoreError::Malformed {
        origin: path.display().to_string(),
        source,
    })
}

/// Decodes an in-memory DICOM file, with or without its 128-byte preamble.
pub fn from_bytes(bytes: &[u8]) -> Result<DefaultDicomObject, StoreError> {
    let body = match bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + 4) {
        Some(b"DICM") => &bytes[PREAMBLE_LEN..],
        _ => bytes,
    };
    from_reader(body).map_err(|source| StoreError::Malformed {
        origin: format!("{} byte upload", bytes.len()),
        source,
    })
}

/// Reads a complete DICOM stream, such as standard input, and decodes it.
pub fn read_stream(
    mut reader: impl Read,
    origin: &str,
) -> Result<DefaultDicomObject, StoreError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| StoreError::Io {
            path: PathBuf::from(origin),
            source,
        })?;
    log::debug!("Decoding {} bytes from {origin}", bytes.len());
    from_bytes(&bytes)
}

/// Encodes the object as a complete DICOM file.
pub fn to_bytes(object: &DefaultDicomObject) -> Result<Vec<u8>, dicom::object::WriteError> {
    let mut bytes = Vec::new();
    object.write_all(&mut bytes)?;
    Ok(bytes)
}
