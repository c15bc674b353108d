use crate::types::{ColumnDescriptor, TypeTag};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Array,
    Boolean,
    Integer,
    Number,
    Object,
    String,
}

/// JSON-Schema fragment for one column. `type` always admits `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    #[serde(rename = "type", serialize_with = "nullable")]
    pub json_type: JsonType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bigint: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,
}

impl FieldSchema {
    fn of(json_type: JsonType) -> Self {
        Self {
            json_type,
            bigint: false,
            date: false,
            items: None,
        }
    }
}

fn nullable<S: Serializer>(json_type: &JsonType, serializer: S) -> Result<S::Ok, S::Error> {
    ("null", json_type).serialize(serializer)
}

/// Maps an engine type to the schema of its JSON-serialized values.
pub fn data_type_schema(tag: &TypeTag) -> FieldSchema {
    match tag {
        TypeTag::BigInt | TypeTag::HugeInt | TypeTag::UBigInt => FieldSchema {
            bigint: true,
            ..FieldSchema::of(JsonType::String)
        },
        TypeTag::TinyInt
        | TypeTag::Integer
        | TypeTag::SmallInt
        | TypeTag::UInteger
        | TypeTag::USmallInt
        | TypeTag::UTinyInt => FieldSchema::of(JsonType::Integer),
        TypeTag::Real | TypeTag::Double => FieldSchema::of(JsonType::Number),
        TypeTag::Boolean => FieldSchema::of(JsonType::Boolean),
        TypeTag::TimestampTz | TypeTag::Timestamp | TypeTag::Time | TypeTag::Date => {
            FieldSchema {
                date: true,
                ..FieldSchema::of(JsonType::String)
            }
        }
        TypeTag::Interval => FieldSchema::of(JsonType::Object),
        TypeTag::List(child) => FieldSchema {
            items: Some(Box::new(data_type_schema(child))),
            ..FieldSchema::of(JsonType::Array)
        },
        TypeTag::Varchar | TypeTag::Other(_) => FieldSchema::of(JsonType::String),
    }
}

/// Schema of a whole result set: an array of row objects whose properties
/// follow the column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    properties: Vec<(String, FieldSchema)>,
}

impl SchemaDescriptor {
    pub fn properties(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.properties
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

pub fn result_schema(columns: &[ColumnDescriptor]) -> SchemaDescriptor {
    SchemaDescriptor {
        properties: columns
            .iter()
            .map(|column| (column.name.clone(), data_type_schema(&column.data_type)))
            .collect(),
    }
}

struct RowObject<'a>(&'a [(String, FieldSchema)]);

struct Properties<'a>(&'a [(String, FieldSchema)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, schema)| (name, schema)))
    }
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RowObject", 2)?;
        state.serialize_field("type", &JsonType::Object)?;
        state.serialize_field("properties", &Properties(self.0))?;
        state.end()
    }
}

impl Serialize for SchemaDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SchemaDescriptor", 2)?;
        state.serialize_field("type", &JsonType::Array)?;
        state.serialize_field("items", &RowObject(&self.properties))?;
        state.end()
    }
}
