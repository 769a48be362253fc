//! Synthetic DICOM instances for unit and integration tests.

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, Tag, VR};
use dicom::dictionary_std::tags;
use dicom::object::mem::InMemElement;
use dicom::object::{DefaultDicomObject, FileMetaTableBuilder, InMemDicomObject};

use crate::model::DicomEntry;

pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
pub const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";
pub const STUDY_INSTANCE_UID: &str = "1.2.3";
pub const SERIES_INSTANCE_UID: &str = "1.2.3.1";
pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

pub fn text(tag: Tag, vr: VR, value: &str) -> InMemElement {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

pub fn unsigned(tag: Tag, value: u16) -> InMemElement {
    DataElement::new(tag, VR::US, PrimitiveValue::U16([value].into_iter().collect()))
}

/// Wraps the given elements in a file object with an explicit VR little endian meta group.
pub fn with_meta(elements: Vec<InMemElement>) -> DefaultDicomObject {
    file_object(elements, "2.25.1")
}

fn file_object(elements: Vec<InMemElement>, media_sop_instance_uid: &str) -> DefaultDicomObject {
    InMemDicomObject::from_element_iter(elements)
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LE)
                .media_storage_sop_class_uid(CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(media_sop_instance_uid),
        )
        .expect("synthetic meta group is complete")
}

/// An instance with SOP, study and series UIDs; `extra` elements replace same-tag defaults.
pub fn instance(sop_instance_uid: &str, extra: &[InMemElement]) -> DefaultDicomObject {
    let media_sop = if sop_instance_uid.is_empty() {
        "2.25.1"
    } else {
        sop_instance_uid
    };
    let mut object = file_object(
        vec![
            text(tags::SOP_CLASS_UID, VR::UI, CT_IMAGE_STORAGE),
            text(tags::SOP_INSTANCE_UID, VR::UI, sop_instance_uid),
            text(tags::PATIENT_NAME, VR::PN, "Doe^Jane"),
            text(tags::STUDY_INSTANCE_UID, VR::UI, STUDY_INSTANCE_UID),
            text(tags::SERIES_INSTANCE_UID, VR::UI, SERIES_INSTANCE_UID),
            text(tags::MODALITY, VR::CS, "CT"),
        ],
        media_sop,
    );
    for element in extra {
        object.put(element.clone());
    }
    object
}

/// Entry built from [`instance`] with no pixel data.
pub fn entry(sop_instance_uid: &str) -> DicomEntry {
    DicomEntry::from_object(instance(sop_instance_uid, &[])).expect("instance has a SOP UID")
}

fn image_module(
    samples_per_pixel: u16,
    photometric: &str,
    rows: u16,
    columns: u16,
    bits: u16,
) -> Vec<InMemElement> {
    vec![
        unsigned(tags::SAMPLES_PER_PIXEL, samples_per_pixel),
        text(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, photometric),
        unsigned(tags::ROWS, rows),
        unsigned(tags::COLUMNS, columns),
        unsigned(tags::BITS_ALLOCATED, bits),
        unsigned(tags::BITS_STORED, bits),
        unsigned(tags::HIGH_BIT, bits - 1),
        unsigned(tags::PIXEL_REPRESENTATION, 0),
    ]
}

/// A 2x2 8-bit MONOCHROME2 instance.
pub fn instance_with_pixels(sop_instance_uid: &str) -> DefaultDicomObject {
    let mut extra = image_module(1, "MONOCHROME2", 2, 2, 8);
    extra.push(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::U8([0u8, 64, 128, 255].into_iter().collect()),
    ));
    instance(sop_instance_uid, &extra)
}

/// A 4x3 16-bit MONOCHROME2 instance.
pub fn instance_with_wide_pixels(sop_instance_uid: &str) -> DefaultDicomObject {
    let (rows, columns) = (3u16, 4u16);
    let mut extra = image_module(1, "MONOCHROME2", rows, columns, 16);
    extra.push(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16((0..rows * columns).map(|v| v * 100).collect()),
    ));
    instance(sop_instance_uid, &extra)
}

/// A 2x1 8-bit RGB instance: a red pixel followed by a green one.
///
/// With `planar` the samples are stored colour-by-plane (planar configuration 1).
pub fn rgb_instance(sop_instance_uid: &str, planar: bool) -> DefaultDicomObject {
    let samples: [u8; 6] = if planar {
        [255, 0, 0, 255, 0, 0]
    } else {
        [255, 0, 0, 0, 255, 0]
    };
    let mut extra = image_module(3, "RGB", 1, 2, 8);
    extra.push(unsigned(tags::PLANAR_CONFIGURATION, u16::from(planar)));
    extra.push(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::U8(samples.into_iter().collect()),
    ));
    instance(sop_instance_uid, &extra)
}

/// Pixel data without the image pixel module, so no frame can be decoded.
pub fn instance_with_undecodable_pixels(sop_instance_uid: &str) -> DefaultDicomObject {
    instance(
        sop_instance_uid,
        &[DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::U8([1u8, 2, 3, 4].into_iter().collect()),
        )],
    )
}
