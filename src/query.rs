//! Attribute lookup by textual tag expressions such as `(0010,0010)`.

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, Tag, VR};
use dicom::object::mem::InMemElement;
use dicom::object::FileMetaTable;
use thiserror::Error;

use crate::model::{AttributeMatch, DicomEntry};

/// A tag expression that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid tag `{token}`: expected GGGG,EEEE with optional parentheses")]
    InvalidFormat { token: String },
    #[error("invalid tag `{token}`: `{part}` is not a 16-bit hexadecimal number")]
    InvalidNumber { token: String, part: String },
}

/// Parses `(GGGG,EEEE)` or `GGGG,EEEE` into a tag.
pub fn parse_tag(token: &str) -> Result<Tag, QueryError> {
    let trimmed = token.trim_matches(|c: char| c == '(' || c == ')');
    let mut parts = trimmed.split(',');
    let (Some(group), Some(element), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(QueryError::InvalidFormat {
            token: token.to_string(),
        });
    };

    Ok(Tag(parse_half(token, group)?, parse_half(token, element)?))
}

fn parse_half(token: &str, part: &str) -> Result<u16, QueryError> {
    let invalid = || QueryError::InvalidNumber {
        token: token.to_string(),
        part: part.to_string(),
    };
    // from_str_radix would also take a sign
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u16::from_str_radix(part, 16).map_err(|_| invalid())
}

/// Looks up every queried tag in the entry's dataset.
///
/// Results follow the order of `query_tags`. Tags with no matching element
/// are skipped; a single malformed tag fails the whole query.
pub fn resolve<S: AsRef<str>>(
    entry: &DicomEntry,
    query_tags: &[S],
) -> Result<Vec<AttributeMatch>, QueryError> {
    let tags = query_tags
        .iter()
        .map(|token| parse_tag(token.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let object = entry.dataset();
    let mut matches = Vec::with_capacity(tags.len());
    for tag in tags {
        let found = if tag.group() == 0x0002 {
            meta_element(object.meta(), tag)
                .map(|element| AttributeMatch::from_element(&element))
        } else {
            object.element(tag).ok().map(AttributeMatch::from_element)
        };
        match found {
            Some(attribute) => matches.push(attribute),
            None => log::debug!(
                "No element ({:04X},{:04X}) in {}",
                tag.group(),
                tag.element(),
                entry.id()
            ),
        }
    }
    Ok(matches)
}

/// File meta group elements live outside the main dataset.
///
/// Values are rebuilt as encoded on disk, so their lengths include the
/// padding to even length.
fn meta_element(meta: &FileMetaTable, tag: Tag) -> Option<InMemElement> {
    let (vr, value) = match tag.element() {
        0x0000 => (
            VR::UL,
            PrimitiveValue::U32([meta.information_group_length].into_iter().collect()),
        ),
        0x0001 => (VR::OB, padded_bytes(&meta.information_version)),
        0x0002 => (VR::UI, padded_text(&meta.media_storage_sop_class_uid, '\0')),
        0x0003 => (VR::UI, padded_text(&meta.media_storage_sop_instance_uid, '\0')),
        0x0010 => (VR::UI, padded_text(&meta.transfer_syntax, '\0')),
        0x0012 => (VR::UI, padded_text(&meta.implementation_class_uid, '\0')),
        0x0013 => (
            VR::SH,
            padded_text(meta.implementation_version_name.as_deref()?, ' '),
        ),
        0x0016 => (
            VR::AE,
            padded_text(meta.source_application_entity_title.as_deref()?, ' '),
        ),
        0x0100 => (
            VR::UI,
            padded_text(meta.private_information_creator_uid.as_deref()?, '\0'),
        ),
        0x0102 => (VR::OB, padded_bytes(meta.private_information.as_deref()?)),
        _ => return None,
    };
    Some(DataElement::new(tag, vr, value))
}

fn padded_text(value: &str, pad: char) -> PrimitiveValue {
    let mut value = value.to_string();
    if value.len() % 2 == 1 {
        value.push(pad);
    }
    PrimitiveValue::from(value)
}

fn padded_bytes(value: &[u8]) -> PrimitiveValue {
    let mut bytes = value.to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    PrimitiveValue::U8(bytes.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeValue, TagRef};
    use crate::test_support::instance;

    fn entry() -> DicomEntry {
        DicomEntry::from_object(instance("1.2.3.4", &[])).unwrap()
    }

    #[test]
    fn parses_with_and_without_parentheses() {
        assert_eq!(parse_tag("(0008,0018)").unwrap(), Tag(0x0008, 0x0018));
        assert_eq!(parse_tag("7FE0,0010").unwrap(), Tag(0x7FE0, 0x0010));
        assert_eq!(parse_tag("(7fe0,10)").unwrap(), Tag(0x7FE0, 0x0010));
    }

    #[test]
    fn rejects_wrong_number_of_parts() {
        for token in ["bad", "", "(0008)", "0008,0018,0020"] {
            assert_eq!(
                parse_tag(token),
                Err(QueryError::InvalidFormat {
                    token: token.to_string()
                }),
                "{token}"
            );
        }
    }

    #[test]
    fn rejects_non_hex_or_oversized_halves() {
        let err = parse_tag("(0008,XYZ1)").unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidNumber {
                token: "(0008,XYZ1)".into(),
                part: "XYZ1".into()
            }
        );
        assert!(parse_tag("10000,0000").is_err());
        assert!(parse_tag("+008,0018").is_err());
        assert!(parse_tag(",0018").is_err());
    }

    #[test]
    fn meta_group_length_is_answered() {
        let matches = resolve(&entry(), &["(0002,0000)"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tag, TagRef { group: 2, element: 0 });
        assert_eq!(matches[0].vr, "UL");
        assert_eq!(matches[0].value_length, Some(4));
    }

    #[test]
    fn meta_uid_lengths_include_padding() {
        let matches = resolve(&entry(), &["(0002,0010)", "(0002,0003)"]).unwrap();
        // "1.2.840.10008.1.2.1" and "1.2.3.4" are odd and encoded with a trailing NUL
        assert_eq!(matches[0].value_length, Some(20));
        assert_eq!(matches[1].value_length, Some(8));
        assert_eq!(
            matches[1].value,
            AttributeValue::Strings(vec!["1.2.3.4".to_string()])
        );
    }

    #[test]
    fn results_follow_query_order() {
        let matches = resolve(&entry(), &["0020,000D", "(0008,0018)", "0002,0010"]).unwrap();
        let tags: Vec<_> = matches.iter().map(|m| m.tag.to_string()).collect();
        assert_eq!(tags, ["(0020,000D)", "(0008,0018)", "(0002,0010)"]);
        assert_eq!(
            matches[1].value,
            AttributeValue::Strings(vec!["1.2.3.4".to_string()])
        );
        assert_eq!(
            matches[2].value,
            AttributeValue::Strings(vec!["1.2.840.10008.1.2.1".to_string()])
        );
    }

    #[test]
    fn absent_tags_are_skipped() {
        let matches = resolve(&entry(), &["(0010,0020)", "(0002,0100)", "(0002,9999)"]).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn one_bad_tag_fails_the_query() {
        let err = resolve(&entry(), &["(0008,0018)", "bad"]).unwrap_err();
        assert!(err.to_string().contains("`bad`"));
    }

    #[test]
    fn empty_query_yields_nothing() {
        let none: [&str; 0] = [];
        assert!(resolve(&entry(), &none).unwrap().is_empty());
    }
}
