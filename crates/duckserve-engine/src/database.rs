use crate::convert::{data_value, param_value, type_tag};
use duckdb::types::Value;
use duckserve_core::{ColumnDescriptor, DataRow, DataValue, DuckserveError};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// DuckDB's native vector size.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// File path, or `:memory:` for a private in-memory database.
    pub path: String,
    pub chunk_size: usize,
    pub threads: Option<u32>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: None,
        }
    }
}

/// Handle on one embedded database. Every call to [`Database::connect`] yields
/// an independent connection to the same database instance.
pub struct Database {
    root: Mutex<duckdb::Connection>,
    options: DatabaseOptions,
}

impl Database {
    pub fn open(options: DatabaseOptions) -> Result<Self, DuckserveError> {
        let mut config = duckdb::Config::default();
        if let Some(threads) = options.threads {
            config = config.threads(i64::from(threads)).map_err(connection_error)?;
        }
        let root = if options.path == ":memory:" {
            duckdb::Connection::open_in_memory_with_flags(config)
        } else {
            duckdb::Connection::open_with_flags(&options.path, config)
        }
        .map_err(connection_error)?;
        info!(path = %options.path, chunk_size = options.chunk_size, "database opened");
        Ok(Self {
            root: Mutex::new(root),
            options,
        })
    }

    pub async fn connect(&self) -> Result<Connection, DuckserveError> {
        let inner = self
            .root
            .lock()
            .map_err(|_| DuckserveError::Connection("database handle poisoned".into()))?
            .try_clone()
            .map_err(connection_error)?;
        debug!("connection acquired");
        Ok(Connection {
            inner,
            chunk_size: self.options.chunk_size.max(1),
        })
    }

    /// Closes the root connection. Connections still held by in-flight
    /// requests keep the database alive until they finish.
    pub fn shutdown(self) -> Result<(), DuckserveError> {
        let root = self
            .root
            .into_inner()
            .map_err(|_| DuckserveError::Connection("database handle poisoned".into()))?;
        root.close().map_err(|(_, err)| connection_error(err))?;
        info!(path = %self.options.path, "database closed");
        Ok(())
    }
}

/// A single-request connection. Preparing a statement moves it onto a
/// blocking worker, which closes it once the result is exhausted or dropped.
pub struct Connection {
    inner: duckdb::Connection,
    chunk_size: usize,
}

impl Connection {
    pub async fn prepare(self, sql: &str) -> Result<PreparedStatement, DuckserveError> {
        let (prepared_tx, prepared_rx) = oneshot::channel();
        let (request_tx, request_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel(4);
        let worker = StatementWorker {
            conn: self.inner,
            sql: sql.to_string(),
            chunk_size: self.chunk_size,
        };
        let worker =
            tokio::task::spawn_blocking(move || worker.run(prepared_tx, request_rx, chunk_tx));

        match prepared_rx.await {
            Ok(prepared) => prepared?,
            Err(_) => return Err(worker_failure(worker).await),
        }
        debug!("statement prepared");
        Ok(PreparedStatement {
            request: request_tx,
            chunks: chunk_rx,
            worker,
        })
    }
}

pub struct PreparedStatement {
    request: oneshot::Sender<ExecuteRequest>,
    chunks: mpsc::Receiver<Result<Vec<DataRow>, DuckserveError>>,
    worker: JoinHandle<()>,
}

impl PreparedStatement {
    /// Binds `params` positionally, executes, and returns the chunked result.
    pub async fn stream(self, params: &[serde_json::Value]) -> Result<ResultStream, DuckserveError> {
        let params = params
            .iter()
            .map(param_value)
            .collect::<Result<Vec<_>, _>>()?;
        let (columns_tx, columns_rx) = oneshot::channel();
        let request = ExecuteRequest {
            params,
            columns: columns_tx,
        };
        if self.request.send(request).is_err() {
            return Err(worker_failure(self.worker).await);
        }
        let columns = match columns_rx.await {
            Ok(columns) => columns?,
            Err(_) => return Err(worker_failure(self.worker).await),
        };
        Ok(ResultStream {
            columns,
            chunks: self.chunks,
            worker: Some(self.worker),
        })
    }
}

/// Pull-based view over an executing statement's rows.
pub struct ResultStream {
    columns: Vec<ColumnDescriptor>,
    chunks: mpsc::Receiver<Result<Vec<DataRow>, DuckserveError>>,
    worker: Option<JoinHandle<()>>,
}

impl ResultStream {
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Next batch of rows, or `None` once the result is exhausted.
    ///
    /// The chunk channel closes both when the worker finishes and when it
    /// dies, so end of results is only reported after the worker has been
    /// joined cleanly.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<DataRow>>, DuckserveError> {
        if let Some(chunk) = self.chunks.recv().await {
            return chunk.map(Some);
        }
        match self.worker.take() {
            Some(worker) => worker.await.map(|_| None).map_err(worker_panicked),
            None => Ok(None),
        }
    }
}

struct ExecuteRequest {
    params: Vec<Value>,
    columns: oneshot::Sender<Result<Vec<ColumnDescriptor>, DuckserveError>>,
}

struct StatementWorker {
    conn: duckdb::Connection,
    sql: String,
    chunk_size: usize,
}

impl StatementWorker {
    fn run(
        self,
        prepared: oneshot::Sender<Result<(), DuckserveError>>,
        request: oneshot::Receiver<ExecuteRequest>,
        chunks: mpsc::Sender<Result<Vec<DataRow>, DuckserveError>>,
    ) {
        let mut stmt = match self.conn.prepare(&self.sql) {
            Ok(stmt) => stmt,
            Err(err) => {
                let _ = prepared.send(Err(invalid_sql(&self.sql, err)));
                return;
            }
        };
        if prepared.send(Ok(())).is_err() {
            return;
        }
        let Ok(request) = request.blocking_recv() else {
            return;
        };

        let expected = stmt.parameter_count();
        if request.params.len() != expected {
            let _ = request.columns.send(Err(DuckserveError::InvalidRequest(format!(
                "statement expects {expected} params, got {}",
                request.params.len()
            ))));
            return;
        }
        let executed = request
            .params
            .iter()
            .enumerate()
            .try_for_each(|(idx, param)| stmt.raw_bind_parameter(idx + 1, param))
            .and_then(|_| stmt.raw_execute());
        if let Err(err) = executed {
            let _ = request.columns.send(Err(execution_error(err)));
            return;
        }

        let columns = match describe_columns(&stmt) {
            Ok(columns) => columns,
            Err(err) => {
                let _ = request.columns.send(Err(err));
                return;
            }
        };
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        if request.columns.send(Ok(columns)).is_err() {
            return;
        }

        let mut rows = stmt.raw_query();
        let mut chunk = Vec::with_capacity(self.chunk_size);
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => {
                    let _ = chunks.blocking_send(Err(execution_error(err)));
                    return;
                }
            };
            let values = match read_row(row, names.len()) {
                Ok(values) => values,
                Err(err) => {
                    let _ = chunks.blocking_send(Err(err));
                    return;
                }
            };
            chunk.push(DataRow::new(names.clone(), values));
            if chunk.len() == self.chunk_size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(self.chunk_size));
                trace!(rows = full.len(), "chunk ready");
                if chunks.blocking_send(Ok(full)).is_err() {
                    return;
                }
            }
        }
        if !chunk.is_empty() {
            trace!(rows = chunk.len(), "final chunk ready");
            let _ = chunks.blocking_send(Ok(chunk));
        }
    }
}

fn describe_columns(stmt: &duckdb::Statement<'_>) -> Result<Vec<ColumnDescriptor>, DuckserveError> {
    (0..stmt.column_count())
        .map(|idx| {
            let name = stmt.column_name(idx).map_err(execution_error)?.to_string();
            Ok(ColumnDescriptor::new(name, type_tag(&stmt.column_type(idx))))
        })
        .collect()
}

fn read_row(row: &duckdb::Row<'_>, width: usize) -> Result<Vec<DataValue>, DuckserveError> {
    (0..width)
        .map(|idx| {
            row.get::<_, Value>(idx)
                .map(data_value)
                .map_err(execution_error)
        })
        .collect()
}

fn invalid_sql(sql: &str, err: duckdb::Error) -> DuckserveError {
    let preview = if sql.len() > 120 {
        let mut end = 120;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &sql[..end])
    } else {
        sql.to_string()
    };
    DuckserveError::InvalidSql(format!("{err} (query: {preview})"))
}

fn execution_error(err: duckdb::Error) -> DuckserveError {
    DuckserveError::Execution(err.to_string())
}

fn connection_error(err: duckdb::Error) -> DuckserveError {
    DuckserveError::Connection(err.to_string())
}

/// Explains why a worker hung up before answering.
async fn worker_failure(worker: JoinHandle<()>) -> DuckserveError {
    match worker.await {
        Ok(()) => DuckserveError::Execution("statement worker exited".into()),
        Err(err) => worker_panicked(err),
    }
}

fn worker_panicked(err: tokio::task::JoinError) -> DuckserveError {
    DuckserveError::Execution(format!("statement worker failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::ResultStream;
    use crate::stream::drain;
    use duckserve_core::{ColumnDescriptor, DataRow, DataValue, DuckserveError, TypeTag};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn stream_from<F>(produce: F) -> ResultStream
    where
        F: FnOnce(mpsc::Sender<Result<Vec<DataRow>, DuckserveError>>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(4);
        ResultStream {
            columns: vec![ColumnDescriptor::new("v", TypeTag::Integer)],
            chunks: rx,
            worker: Some(tokio::task::spawn_blocking(move || produce(tx))),
        }
    }

    fn chunk(values: &[i64]) -> Vec<DataRow> {
        let columns: Arc<[String]> = vec!["v".to_string()].into();
        values
            .iter()
            .map(|v| DataRow::new(columns.clone(), vec![DataValue::Integer(*v)]))
            .collect()
    }

    #[tokio::test]
    async fn worker_dying_mid_stream_is_an_error() {
        let mut stream = stream_from(|tx| {
            tx.blocking_send(Ok(chunk(&[1, 2]))).expect("send");
            panic!("worker died");
        });
        let err = drain(&mut stream).await.err().expect("should fail");
        assert!(matches!(err, DuckserveError::Execution(ref msg) if msg.contains("worker")));
    }

    #[tokio::test]
    async fn clean_worker_exit_ends_the_stream() {
        let mut stream = stream_from(|tx| {
            tx.blocking_send(Ok(chunk(&[1]))).expect("send");
            tx.blocking_send(Ok(chunk(&[2, 3]))).expect("send");
        });
        let rows = drain(&mut stream).await.expect("drain");
        assert_eq!(rows, chunk(&[1, 2, 3]));
        assert_eq!(stream.next_chunk().await.expect("exhausted"), None);
    }
}
