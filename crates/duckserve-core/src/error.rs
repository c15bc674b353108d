use thiserror::Error;

#[derive(Debug, Error)]
pub enum DuckserveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid sql: {0}")]
    InvalidSql(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DuckserveError {
    fn from(err: serde_json::Error) -> Self {
        DuckserveError::Serialization(err.to_string())
    }
}
