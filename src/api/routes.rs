use crate::AppState;
use crate::api::handlers::{chat, health, ingest};
use crate::types::{ChatRequest, ChatResponse, HealthResponse, IngestRequest, IngestResponse, Source};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Largest request body accepted, in bytes. Ingested documents arrive inline.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jarvis",
        description = "Retrieval-augmented question answering over a document knowledge base"
    ),
    paths(health::health, chat::chat, ingest::ingest),
    components(schemas(
        ChatRequest,
        ChatResponse,
        Source,
        IngestRequest,
        IngestResponse,
        HealthResponse
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "chat", description = "Question answering"),
        (name = "ingest", description = "Knowledge base ingestion")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/ingest", post(ingest::ingest))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
