pub mod error;
pub mod schema;
pub mod types;

pub use error::DuckserveError;
pub use schema::{data_type_schema, result_schema, FieldSchema, JsonType, SchemaDescriptor};
pub use types::{ColumnDescriptor, DataRow, DataValue, TypeTag};
