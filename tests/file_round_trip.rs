//! Persistence through the file store and attribute queries on re-read entries.

use std::fs;

use dicom::core::value::{DataSetSequence, Value};
use dicom::core::{DataElement, Length, VR};
use dicom::dictionary_std::tags;
use dicom::object::InMemDicomObject;
use dime::model::AttributeValue;
use dime::test_support::{entry as plain, instance, instance_with_wide_pixels, text};
use dime::{query, DicomEntry, FileStore, QueryError, Store, TagRef};
use tempfile::TempDir;

fn with_pixels(sop_instance_uid: &str) -> DicomEntry {
    DicomEntry::from_object(instance_with_wide_pixels(sop_instance_uid)).unwrap()
}

/// Length field of an explicit VR little endian element with a short header.
fn encoded_length(file: &[u8], group: u16, element: u16, vr: &[u8; 2]) -> Option<u32> {
    let mut header = Vec::with_capacity(6);
    header.extend_from_slice(&group.to_le_bytes());
    header.extend_from_slice(&element.to_le_bytes());
    header.extend_from_slice(vr);
    let at = file.windows(header.len()).position(|window| window == header)?;
    let length = file.get(at + 6..at + 8)?;
    Some(u32::from(u16::from_le_bytes([length[0], length[1]])))
}

#[test]
fn reopened_store_still_serves_entries() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileStore::new(dir.path()).unwrap();
        store.create(with_pixels("1.3.12.2.1107.5")).unwrap();
    }

    let store = FileStore::new(dir.path()).unwrap();
    let entry = store.read("1.3.12.2.1107.5").unwrap();
    assert_eq!(entry.id(), "1.3.12.2.1107.5");
    assert_eq!(entry.study_instance_uid(), Some(dime::test_support::STUDY_INSTANCE_UID));
    assert!(store.get_image("1.3.12.2.1107.5").is_ok());
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn last_write_wins() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.create(with_pixels("6.6")).unwrap();
    store.create(plain("6.6")).unwrap();

    assert_eq!(store.list().unwrap().len(), 1);
    assert!(store.get_image("6.6").unwrap_err().is_not_found());
}

#[test]
fn attributes_of_re_read_entry() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.create(plain("8.8")).unwrap();
    let entry = store.read("8.8").unwrap();

    let matches = query::resolve(
        &entry,
        &["(0002,0000)", "(0010,0010)", "0008,0060", "(0028,0010)"],
    )
    .unwrap();
    assert_eq!(matches.len(), 3);

    assert_eq!(matches[0].tag, TagRef { group: 2, element: 0 });
    assert_eq!(matches[0].vr, "UL");
    assert!(matches!(&matches[0].value, AttributeValue::Unsigned(v) if v.len() == 1 && v[0] > 0));

    assert_eq!(matches[1].tag, TagRef { group: 0x10, element: 0x10 });
    assert_eq!(matches[1].vr, "PN");
    assert_eq!(matches[1].value_length, Some(8));
    assert_eq!(matches[1].value, AttributeValue::Strings(vec!["Doe^Jane".into()]));

    assert_eq!(matches[2].tag, TagRef { group: 8, element: 0x60 });
    assert_eq!(matches[2].value, AttributeValue::Strings(vec!["CT".into()]));
}

#[test]
fn malformed_tag_fails_query() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.create(plain("8.9")).unwrap();
    let entry = store.read("8.9").unwrap();

    let err = query::resolve(&entry, &["bad"]).unwrap_err();
    assert_eq!(err, QueryError::InvalidFormat { token: "bad".into() });
}

#[test]
fn meta_lengths_match_the_stored_file() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store.create(plain("8.8")).unwrap();
    let entry = store.read("8.8").unwrap();
    let file = fs::read(dir.path().join("dicom/8.8.dcm")).unwrap();

    let matches =
        query::resolve(&entry, &["(0002,0000)", "(0002,0003)", "(0002,0010)"]).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].value_length, encoded_length(&file, 0x0002, 0x0000, b"UL"));
    assert_eq!(matches[1].value_length, encoded_length(&file, 0x0002, 0x0003, b"UI"));
    assert_eq!(matches[1].value_length, Some(4));
    assert_eq!(matches[2].value_length, encoded_length(&file, 0x0002, 0x0010, b"UI"));
    assert_eq!(matches[2].value_length, Some(20));
    assert_eq!(
        matches[2].value,
        AttributeValue::Strings(vec!["1.2.840.10008.1.2.1".into()])
    );
}

#[test]
fn sequence_items_survive_the_round_trip() {
    let region = InMemDicomObject::from_element_iter([
        text(tags::CODE_VALUE, VR::SH, "T-A0100"),
        text(tags::CODE_MEANING, VR::LO, "Brain"),
    ]);
    let sequence = DataElement::new(
        tags::ANATOMIC_REGION_SEQUENCE,
        VR::SQ,
        Value::Sequence(DataSetSequence::new(vec![region], Length::UNDEFINED)),
    );
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    store
        .create(DicomEntry::from_object(instance("8.7", &[sequence])).unwrap())
        .unwrap();
    let entry = store.read("8.7").unwrap();

    let matches = query::resolve(&entry, &["(0008,2218)"]).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].vr, "SQ");
    let AttributeValue::Sequence(items) = &matches[0].value else {
        panic!("expected a sequence, got {:?}", matches[0].value);
    };
    assert_eq!(items.len(), 1);
    let code = items[0]
        .iter()
        .find(|m| m.tag == TagRef { group: 0x0008, element: 0x0100 })
        .expect("code value in item");
    assert_eq!(code.value, AttributeValue::Strings(vec!["T-A0100".into()]));
}
