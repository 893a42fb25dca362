use crate::{
    AppState,
    types::{AppError, IngestRequest, IngestResponse, Result},
};
use axum::{Json, extract::State};

/// Ingest a document into the knowledge base
///
/// The text is chunked and embedded, and every chunk is stored with a fresh
/// id. Posting the same document twice stores it twice.
#[utoipa::path(
    post,
    path = "/ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Document ingested", body = IngestResponse),
        (status = 400, description = "Missing source name"),
        (status = 502, description = "Embedding or vector store failure")
    ),
    tag = "ingest"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let source = payload.source.trim();
    if source.is_empty() {
        return Err(AppError::InvalidInput("source must not be empty".into()));
    }

    let report = state.pipeline.ingest_document(source, &payload.text).await?;

    Ok(Json(IngestResponse {
        source: report.source,
        chunks: report.chunks,
    }))
}
