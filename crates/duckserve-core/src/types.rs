use base64::Engine as _;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Engine type identifiers the service knows how to describe.
///
/// The set mirrors the type ids DuckDB reports for result columns. Anything
/// outside it is carried verbatim in `Other` and described as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    BigInt,
    HugeInt,
    UBigInt,
    TinyInt,
    Integer,
    SmallInt,
    UInteger,
    USmallInt,
    UTinyInt,
    Real,
    Double,
    Boolean,
    TimestampTz,
    Timestamp,
    Time,
    Date,
    Interval,
    List(Box<TypeTag>),
    Varchar,
    Other(String),
}

impl TypeTag {
    /// Builds a tag from an engine type id. `child` is only consulted for `LIST`.
    pub fn from_id(id: &str, child: Option<TypeTag>) -> Self {
        match id {
            "BIGINT" => TypeTag::BigInt,
            "HUGEINT" => TypeTag::HugeInt,
            "UBIGINT" => TypeTag::UBigInt,
            "TINYINT" => TypeTag::TinyInt,
            "INTEGER" => TypeTag::Integer,
            "SMALLINT" => TypeTag::SmallInt,
            "UINTEGER" => TypeTag::UInteger,
            "USMALLINT" => TypeTag::USmallInt,
            "UTINYINT" => TypeTag::UTinyInt,
            "REAL" => TypeTag::Real,
            "DOUBLE" => TypeTag::Double,
            "BOOLEAN" => TypeTag::Boolean,
            "TIMESTAMP WITH TIME ZONE" => TypeTag::TimestampTz,
            "TIMESTAMP" => TypeTag::Timestamp,
            "TIME" => TypeTag::Time,
            "DATE" => TypeTag::Date,
            "INTERVAL" => TypeTag::Interval,
            "LIST" => TypeTag::List(Box::new(
                child.unwrap_or_else(|| TypeTag::Other("UNKNOWN".into())),
            )),
            "VARCHAR" => TypeTag::Varchar,
            other => TypeTag::Other(other.to_string()),
        }
    }

    /// Parses a SQL type spelling, accepting common DuckDB aliases and the
    /// `CHILD[]` list suffix.
    pub fn parse(spelling: &str) -> Self {
        let normalized = spelling.trim().to_ascii_uppercase();
        if let Some(inner) = normalized.strip_suffix("[]") {
            return TypeTag::List(Box::new(TypeTag::parse(inner)));
        }
        let canonical = match normalized.as_str() {
            "INT8" | "LONG" => "BIGINT",
            "INT128" => "HUGEINT",
            "UINT64" => "UBIGINT",
            "INT1" => "TINYINT",
            "INT" | "INT4" | "SIGNED" => "INTEGER",
            "INT2" | "SHORT" => "SMALLINT",
            "UINT32" => "UINTEGER",
            "UINT16" => "USMALLINT",
            "UINT8" => "UTINYINT",
            "FLOAT" | "FLOAT4" => "REAL",
            "FLOAT8" => "DOUBLE",
            "BOOL" | "LOGICAL" => "BOOLEAN",
            "TIMESTAMPTZ" => "TIMESTAMP WITH TIME ZONE",
            "DATETIME" => "TIMESTAMP",
            "STRING" | "TEXT" | "CHAR" | "BPCHAR" => "VARCHAR",
            other => other,
        };
        TypeTag::from_id(canonical, None)
    }

    pub fn id(&self) -> &str {
        match self {
            TypeTag::BigInt => "BIGINT",
            TypeTag::HugeInt => "HUGEINT",
            TypeTag::UBigInt => "UBIGINT",
            TypeTag::TinyInt => "TINYINT",
            TypeTag::Integer => "INTEGER",
            TypeTag::SmallInt => "SMALLINT",
            TypeTag::UInteger => "UINTEGER",
            TypeTag::USmallInt => "USMALLINT",
            TypeTag::UTinyInt => "UTINYINT",
            TypeTag::Real => "REAL",
            TypeTag::Double => "DOUBLE",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            TypeTag::Timestamp => "TIMESTAMP",
            TypeTag::Time => "TIME",
            TypeTag::Date => "DATE",
            TypeTag::Interval => "INTERVAL",
            TypeTag::List(_) => "LIST",
            TypeTag::Varchar => "VARCHAR",
            TypeTag::Other(id) => id,
        }
    }

    pub fn child(&self) -> Option<&TypeTag> {
        match self {
            TypeTag::List(child) => Some(child),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::List(child) => write!(f, "{child}[]"),
            other => f.write_str(other.id()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: TypeTag,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A single result value, shaped for JSON output.
///
/// `BigInt` holds every integer kind of 64 bits or wider and is written as a
/// decimal string so clients never lose precision.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Integer(i64),
    BigInt(i128),
    Float(f64),
    Text(String),
    Date(String),
    Interval { months: i32, days: i32, micros: i64 },
    List(Vec<DataValue>),
    Blob(Vec<u8>),
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DataValue::Null => serializer.serialize_unit(),
            DataValue::Boolean(v) => serializer.serialize_bool(*v),
            DataValue::Integer(v) => serializer.serialize_i64(*v),
            DataValue::BigInt(v) => serializer.collect_str(v),
            DataValue::Float(v) => serializer.serialize_f64(*v),
            DataValue::Text(v) | DataValue::Date(v) => serializer.serialize_str(v),
            DataValue::Interval {
                months,
                days,
                micros,
            } => {
                let mut state = serializer.serialize_struct("Interval", 3)?;
                state.serialize_field("months", months)?;
                state.serialize_field("days", days)?;
                state.serialize_field("micros", micros)?;
                state.end()
            }
            DataValue::List(items) => serializer.collect_seq(items),
            DataValue::Blob(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

/// One result row. Column names are shared by every row of a result set and
/// the row serializes as a JSON object in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    columns: Arc<[String]>,
    values: Vec<DataValue>,
}

impl DataRow {
    pub fn new(columns: Arc<[String]>, values: Vec<DataValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&DataValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.values.get(idx))
    }
}

impl Serialize for DataRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.columns.iter().zip(self.values.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::{DataRow, DataValue, TypeTag};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn from_id_round_trips_known_ids() {
        for id in [
            "BIGINT",
            "HUGEINT",
            "UBIGINT",
            "TINYINT",
            "INTEGER",
            "SMALLINT",
            "UINTEGER",
            "USMALLINT",
            "UTINYINT",
            "REAL",
            "DOUBLE",
            "BOOLEAN",
            "TIMESTAMP WITH TIME ZONE",
            "TIMESTAMP",
            "TIME",
            "DATE",
            "INTERVAL",
            "VARCHAR",
        ] {
            assert_eq!(TypeTag::from_id(id, None).id(), id);
        }
        assert_eq!(
            TypeTag::from_id("GEOMETRY", None),
            TypeTag::Other("GEOMETRY".into())
        );
    }

    #[test]
    fn parse_handles_aliases_and_lists() {
        assert_eq!(TypeTag::parse("int8"), TypeTag::BigInt);
        assert_eq!(TypeTag::parse("TIMESTAMPTZ"), TypeTag::TimestampTz);
        assert_eq!(
            TypeTag::parse("INTEGER[][]"),
            TypeTag::List(Box::new(TypeTag::List(Box::new(TypeTag::Integer))))
        );
        assert_eq!(TypeTag::parse(" text "), TypeTag::Varchar);
        assert_eq!(TypeTag::parse("VARCHAR[]").to_string(), "VARCHAR[]");
    }

    #[test]
    fn list_without_child_is_still_a_list() {
        let tag = TypeTag::from_id("LIST", None);
        assert_eq!(tag.id(), "LIST");
        assert_eq!(tag.child(), Some(&TypeTag::Other("UNKNOWN".into())));
    }

    #[test]
    fn bigints_serialize_as_strings() {
        let value = DataValue::List(vec![
            DataValue::Integer(1),
            DataValue::BigInt(9_007_199_254_740_993),
            DataValue::List(vec![DataValue::BigInt(i128::MIN)]),
        ]);
        assert_eq!(
            serde_json::to_value(&value).expect("serialize"),
            json!([1, "9007199254740993", ["-170141183460469231731687303715884105728"]])
        );
    }

    #[test]
    fn rows_serialize_in_column_order() {
        let columns: Arc<[String]> = vec!["z".to_string(), "a".to_string(), "m".to_string()].into();
        let row = DataRow::new(
            columns,
            vec![
                DataValue::Text("x".into()),
                DataValue::Null,
                DataValue::Interval {
                    months: 1,
                    days: 2,
                    micros: 3,
                },
            ],
        );
        let text = serde_json::to_string(&row).expect("serialize");
        assert_eq!(
            text,
            r#"{"z":"x","a":null,"m":{"months":1,"days":2,"micros":3}}"#
        );
        assert_eq!(row.get("a"), Some(&DataValue::Null));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn blobs_serialize_as_base64() {
        let value = DataValue::Blob(b"duck".to_vec());
        assert_eq!(serde_json::to_value(&value).expect("serialize"), json!("ZHVjaw=="));
    }
}
