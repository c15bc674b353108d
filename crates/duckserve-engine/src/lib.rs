pub mod convert;
pub mod database;
pub mod stream;

pub use database::{Connection, Database, DatabaseOptions, PreparedStatement, ResultStream};
pub use stream::{drain, ChunkSource};
