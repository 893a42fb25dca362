use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Answer returned when retrieval finds nothing to ground a response on.
pub const FALLBACK_ANSWER: &str = "I don't have enough information in the knowledge base.";

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl ChatResponse {
    /// The ungrounded reply: fixed answer, no sources.
    pub fn fallback() -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// A retrieved chunk cited in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Source {
    pub source: String,
    pub chunk_id: String,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRequest {
    /// Name recorded as the `source` of every chunk (usually a file name)
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub source: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

// ============= RAG Types =============

/// A document read from disk (or posted over HTTP) before chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub name: String,
    pub text: String,
}

/// Metadata stored next to every vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_id: String,
    pub text: String,
}

/// A vector ready to be written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A raw nearest-neighbour hit as returned by a vector store.
///
/// Metadata is kept loosely typed: vectors written by other tools may lack
/// any of the fields this service writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A context chunk after metadata defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub score: f32,
    pub text: String,
    pub source: String,
    pub chunk_id: String,
}

impl RetrievedChunk {
    pub fn from_match(hit: &ScoredMatch) -> Self {
        Self {
            score: hit.score,
            text: metadata_string(&hit.metadata, "text").unwrap_or_default(),
            source: metadata_string(&hit.metadata, "source").unwrap_or_else(|| "unknown".into()),
            chunk_id: metadata_string(&hit.metadata, "chunk_id").unwrap_or_else(|| "NA".into()),
        }
    }

    pub fn to_source(&self) -> Source {
        Source {
            source: self.source.clone(),
            chunk_id: self.chunk_id.clone(),
            score: self.score,
        }
    }
}

fn metadata_string(metadata: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match metadata.get(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub source: String,
    pub chunks: usize,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Embedding(_) | AppError::VectorStore(_) | AppError::LLM(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Configuration(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
