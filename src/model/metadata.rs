use std::fmt;

use dicom::core::Tag;

use crate::utils::format_tag;

/// Element names which never become table columns.
pub const EXCLUDED_ELEMENTS: [&str; 2] = ["Pixel Data", "File Meta Information Version"];

/// The value of a single decoded element.
///
/// Single-valued elements map to the scalar variants,
/// multi-valued elements to the list variants.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Empty,
    Text(String),
    TextList(Vec<String>),
    Int(i64),
    IntList(Vec<i64>),
    UInt(u64),
    UIntList(Vec<u64>),
    Float(f64),
    FloatList(Vec<f64>),
    Bytes(Vec<u8>),
    Tag(Tag),
    TagList(Vec<Tag>),
    /// One nested table per sequence item.
    Sequence(Vec<MetadataTable>),
    /// Encapsulated fragments, kept as they were stored.
    Fragments(Vec<Vec<u8>>),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join("\\")
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Empty => f.write_str("(empty)"),
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::TextList(values) => f.write_str(&values.join("\\")),
            MetadataValue::Int(value) => write!(f, "{value}"),
            MetadataValue::IntList(values) => f.write_str(&join(values)),
            MetadataValue::UInt(value) => write!(f, "{value}"),
            MetadataValue::UIntList(values) => f.write_str(&join(values)),
            MetadataValue::Float(value) => write!(f, "{value}"),
            MetadataValue::FloatList(values) => f.write_str(&join(values)),
            MetadataValue::Bytes(bytes) => write!(f, "Binary data ({} bytes)", bytes.len()),
            MetadataValue::Tag(tag) => f.write_str(&format_tag(*tag)),
            MetadataValue::TagList(tags) => f.write_str(
                &tags
                    .iter()
                    .map(|tag| format_tag(*tag))
                    .collect::<Vec<_>>()
                    .join("\\"),
            ),
            MetadataValue::Sequence(items) => {
                let suffix = if items.len() == 1 { "" } else { "s" };
                write!(f, "Sequence ({} item{suffix})", items.len())
            }
            MetadataValue::Fragments(fragments) => {
                let suffix = if fragments.len() == 1 { "" } else { "s" };
                write!(f, "Pixel data ({} fragment{suffix})", fragments.len())
            }
        }
    }
}

/// A single-row table of element values, keyed by element name.
///
/// Columns keep the order in which the elements were decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    columns: Vec<String>,
    row: Vec<MetadataValue>,
}

impl MetadataTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self) -> &[MetadataValue] {
        &self.row
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|idx| &self.row[idx])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.row.iter())
    }
}

/// Builds the metadata table from decoded elements,
/// leaving out the pixel payload and the file meta version marker.
pub fn tabulate<I, N>(elements: I) -> MetadataTable
where
    I: IntoIterator<Item = (N, MetadataValue)>,
    N: Into<String>,
{
    let mut table = MetadataTable::default();
    for (name, value) in elements {
        let name = name.into();
        if EXCLUDED_ELEMENTS.contains(&name.as_str()) {
            continue;
        }
        if table.columns.contains(&name) {
            log::warn!("Duplicate element `{name}`, keeping the first value");
            continue;
        }
        table.columns.push(name);
        table.row.push(value);
    }
    table
}
