use crate::{
    AppState,
    types::{ChatRequest, ChatResponse, Result},
};
use axum::{Json, extract::State};

/// Answer a question from the knowledge base
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Grounded answer with cited chunks", body = ChatResponse),
        (status = 400, description = "Malformed request body"),
        (status = 502, description = "Embedding, vector store or LLM failure")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let response = state.pipeline.answer_query(&payload.message).await?;

    tracing::info!(
        sources = response.sources.len(),
        grounded = !response.sources.is_empty(),
        "Answered chat message"
    );

    Ok(Json(response))
}
