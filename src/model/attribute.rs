use std::fmt;

use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::object::mem::{InMemElement, InMemFragment};
use dicom::object::InMemDicomObject;
use serde::Serialize;

/// Group/element pair as it appears in query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagRef {
    pub group: u16,
    pub element: u16,
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        Self {
            group: tag.group(),
            element: tag.element(),
        }
    }
}

impl From<TagRef> for Tag {
    fn from(tag: TagRef) -> Self {
        Tag(tag.group, tag.element)
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

/// Decoded value(s) of a matched element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Strings(Vec<String>),
    Signed(Vec<i64>),
    Unsigned(Vec<u64>),
    Floats(Vec<f64>),
    Bytes(Vec<u8>),
    Tags(Vec<TagRef>),
    /// One list of nested matches per sequence item.
    Sequence(Vec<Vec<AttributeMatch>>),
    /// Encapsulated pixel data, kept as its raw fragments.
    PixelSequence {
        #[serde(rename = "offsetTable")]
        offset_table: Vec<u32>,
        fragments: Vec<Vec<u8>>,
    },
}

/// One element answered by a tag query: tag, VR, raw length and value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMatch {
    pub tag: TagRef,
    pub vr: String,
    /// `None` for undefined length.
    pub value_length: Option<u32>,
    pub value: AttributeValue,
}

impl AttributeMatch {
    /// Describes an element, descending into sequence items.
    pub fn from_element(element: &InMemElement) -> Self {
        let header = element.header();
        Self {
            tag: header.tag.into(),
            vr: header.vr.to_string().to_owned(),
            value_length: header.len.get(),
            value: decode_value(element.value()),
        }
    }
}

fn decode_value(value: &Value<InMemDicomObject, InMemFragment>) -> AttributeValue {
    match value {
        Value::Primitive(primitive) => decode_primitive(primitive),
        Value::Sequence(sequence) => AttributeValue::Sequence(
            sequence
                .items()
                .iter()
                .map(|item| item.iter().map(AttributeMatch::from_element).collect())
                .collect(),
        ),
        Value::PixelSequence(sequence) => AttributeValue::PixelSequence {
            offset_table: sequence.offset_table().to_vec(),
            fragments: sequence.fragments().to_vec(),
        },
    }
}

fn decode_primitive(value: &PrimitiveValue) -> AttributeValue {
    match value {
        PrimitiveValue::Empty => AttributeValue::Strings(Vec::new()),
        PrimitiveValue::Str(_)
        | PrimitiveValue::Strs(_)
        | PrimitiveValue::Date(_)
        | PrimitiveValue::Time(_)
        | PrimitiveValue::DateTime(_) => AttributeValue::Strings(
            value
                .to_multi_str()
                .iter()
                .map(|s| s.trim_end_matches(['\0', ' ']).to_string())
                .collect(),
        ),
        PrimitiveValue::I16(values) => signed(values.iter().map(|&v| i64::from(v))),
        PrimitiveValue::I32(values) => signed(values.iter().map(|&v| i64::from(v))),
        PrimitiveValue::I64(values) => signed(values.iter().copied()),
        PrimitiveValue::U16(values) => unsigned(values.iter().map(|&v| u64::from(v))),
        PrimitiveValue::U32(values) => unsigned(values.iter().map(|&v| u64::from(v))),
        PrimitiveValue::U64(values) => unsigned(values.iter().copied()),
        PrimitiveValue::F32(values) => {
            AttributeValue::Floats(values.iter().map(|&v| f64::from(v)).collect())
        }
        PrimitiveValue::F64(values) => AttributeValue::Floats(values.to_vec()),
        PrimitiveValue::U8(values) => AttributeValue::Bytes(values.to_vec()),
        PrimitiveValue::Tags(values) => {
            AttributeValue::Tags(values.iter().map(|&tag| tag.into()).collect())
        }
    }
}

fn signed(values: impl Iterator<Item = i64>) -> AttributeValue {
    AttributeValue::Signed(values.collect())
}

fn unsigned(values: impl Iterator<Item = u64>) -> AttributeValue {
    AttributeValue::Unsigned(values.collect())
}
