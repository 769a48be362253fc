use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::DefaultDicomObject;
use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

use crate::image_pipeline::FrameImagePipeline;

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("missing required attribute {name} ({:04X},{:04X})", .tag.group(), .tag.element())]
    MissingAttribute { tag: Tag, name: &'static str },
}

/// A stored DICOM instance, keyed by its SOP Instance UID.
#[derive(Debug, Serialize)]
pub struct DicomEntry {
    id: String,
    #[serde(rename = "studyInstanceUID")]
    study_instance_uid: Option<String>,
    #[serde(rename = "seriesInstanceUID")]
    series_instance_uid: Option<String>,
    #[serde(skip)]
    dataset: DefaultDicomObject,
    #[serde(skip)]
    preview: Option<RgbaImage>,
}

impl DicomEntry {
    /// Builds an entry from a decoded object and renders its first frame.
    ///
    /// A frame that fails to decode is logged and leaves the preview empty.
    pub fn from_object(dataset: DefaultDicomObject) -> Result<Self, EntryError> {
        let mut entry = Self::without_preview(dataset)?;
        entry.preview = extract_preview(&entry.dataset);
        Ok(entry)
    }

    /// Builds an entry without touching pixel data.
    ///
    /// Used when the preview is already persisted elsewhere, e.g. when a
    /// file store re-reads its raw form.
    pub fn without_preview(dataset: DefaultDicomObject) -> Result<Self, EntryError> {
        let id = attribute_text(&dataset, tags::SOP_INSTANCE_UID).ok_or(
            EntryError::MissingAttribute {
                tag: tags::SOP_INSTANCE_UID,
                name: "SOPInstanceUID",
            },
        )?;
        let study_instance_uid = attribute_text(&dataset, tags::STUDY_INSTANCE_UID);
        let series_instance_uid = attribute_text(&dataset, tags::SERIES_INSTANCE_UID);

        Ok(Self {
            id,
            study_instance_uid,
            series_instance_uid,
            dataset,
            preview: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn study_instance_uid(&self) -> Option<&str> {
        self.study_instance_uid.as_deref()
    }

    pub fn series_instance_uid(&self) -> Option<&str> {
        self.series_instance_uid.as_deref()
    }

    pub fn dataset(&self) -> &DefaultDicomObject {
        &self.dataset
    }

    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    /// PNG encoding of the preview, if one was rendered.
    pub fn preview_png(&self) -> Result<Option<Vec<u8>>, image::ImageError> {
        self.preview
            .as_ref()
            .map(FrameImagePipeline::encode_png)
            .transpose()
    }
}

fn extract_preview(object: &DefaultDicomObject) -> Option<RgbaImage> {
    match FrameImagePipeline::render_first_frame(object) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("Unable to build frame preview: {err}");
            None
        }
    }
}

/// First value of a string attribute, with DICOM padding removed.
fn attribute_text(object: &DefaultDicomObject, tag: Tag) -> Option<String> {
    let element = object.element(tag).ok()?;
    let values = element.value().to_multi_str().ok()?;
    values
        .first()
        .map(|value| value.trim_matches(|c: char| c == '\0' || c.is_whitespace()))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
