pub mod attribute;
pub mod dicom_entry;

pub use attribute::{AttributeMatch, AttributeValue, TagRef};
pub use dicom_entry::{DicomEntry, EntryError};
