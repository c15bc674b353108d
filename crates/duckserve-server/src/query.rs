use crate::error::ApiError;
use crate::server::AppContext;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use duckserve_core::{result_schema, DataRow, DuckserveError, SchemaDescriptor};
use duckserve_engine::drain;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub data: Vec<DataRow>,
    pub schema: SchemaDescriptor,
}

/// `POST` handler: runs one SQL statement and returns every row with the
/// JSON-Schema of the row shape.
pub async fn handle_query(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    async move {
        counter!("query_requests_total").increment(1);
        let started = Instant::now();
        let outcome = respond(&ctx, &body).await;
        match &outcome {
            Ok((rows, columns, _)) => {
                counter!("query_success_total").increment(1);
                histogram!("query_rows").record(*rows as f64);
                info!(
                    rows,
                    columns,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query completed"
                );
            }
            Err(_) => {
                counter!("query_error_total").increment(1);
            }
        }
        let (_, _, body) = outcome?;
        Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
    }
    .instrument(info_span!("query", %request_id))
    .await
}

async fn respond(ctx: &AppContext, body: &[u8]) -> Result<(usize, usize, Vec<u8>), ApiError> {
    let request: QueryRequest = serde_json::from_slice(body)
        .map_err(|err| DuckserveError::InvalidRequest(err.to_string()))?;
    debug!(sql = %request.sql, params = request.params.len(), "executing query");
    let response = execute(ctx, request).await?;
    let rows = response.data.len();
    let columns = response.schema.len();
    let body = serde_json::to_vec(&response).map_err(DuckserveError::from)?;
    Ok((rows, columns, body))
}

pub async fn execute(ctx: &AppContext, request: QueryRequest) -> Result<QueryResponse, DuckserveError> {
    let conn = ctx.database.connect().await?;
    let statement = conn.prepare(&request.sql).await?;
    let mut result = statement.stream(&request.params).await?;
    let columns = result.columns().to_vec();
    let data = drain(&mut result).await?;
    let schema = result_schema(&columns);
    Ok(QueryResponse { data, schema })
}
