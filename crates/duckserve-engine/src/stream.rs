use crate::database::ResultStream;
use duckserve_core::{DataRow, DuckserveError};
use std::future::Future;

/// A finite, pull-based sequence of row chunks.
pub trait ChunkSource {
    fn next_chunk(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<DataRow>>, DuckserveError>> + Send;
}

impl ChunkSource for ResultStream {
    fn next_chunk(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<DataRow>>, DuckserveError>> + Send {
        ResultStream::next_chunk(self)
    }
}

/// Pulls every chunk and concatenates them in fetch order.
pub async fn drain<S: ChunkSource>(source: &mut S) -> Result<Vec<DataRow>, DuckserveError> {
    let mut rows = Vec::new();
    while let Some(chunk) = source.next_chunk().await? {
        rows.extend(chunk);
    }
    Ok(rows)
}
