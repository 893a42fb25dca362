//! Sentence embeddings.
//!
//! Two backends sit behind the [`Embedder`] trait:
//!
//! - [`OllamaEmbedder`] (default) - calls a running Ollama server's
//!   `/api/embed` endpoint. The default model `all-minilm` is the
//!   `all-MiniLM-L6-v2` sentence transformer.
//! - [`FastEmbedder`] (`local-embeddings` feature) - runs the ONNX model
//!   in-process via fastembed.
//!
//! Every vector leaving this module is L2-normalised, so cosine similarity
//! and dot product rank identically downstream.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dimensions of `all-MiniLM-L6-v2`.
pub const MINILM_DIMENSIONS: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Embed a batch of texts, one normalised vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("Embedder returned no vector".into()))
    }
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

fn check_batch(expected: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>> {
    if vectors.len() != expected {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    Ok(vectors.into_iter().map(normalize).collect())
}

// ============================================================================
// Ollama
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings served by Ollama's `/api/embed`.
pub struct OllamaEmbedder {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Ollama embed request failed ({}): {}",
                status, text
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse response: {}", e)))?;

        check_batch(texts.len(), parsed.embeddings)
    }
}

// ============================================================================
// fastembed
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::{check_batch, Embedder};
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-process sentence embeddings via fastembed.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
        dimensions: usize,
    }

    impl FastEmbedder {
        pub fn new(model_name: &str) -> Result<Self> {
            let (model_type, dimensions) = match model_name {
                "all-minilm" | "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                    (EmbeddingModel::AllMiniLML6V2, 384)
                }
                "BAAI/bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
                "BAAI/bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
                other => {
                    return Err(AppError::Configuration(format!(
                        "Unsupported local embedding model: {}",
                        other
                    )))
                }
            };

            let model = TextEmbedding::try_new(
                InitOptions::new(model_type).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Embedding(e.to_string()))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                model_name: model_name.to_string(),
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = Arc::clone(&self.model);
            let batch = texts.to_vec();
            let expected = batch.len();

            // ONNX inference is CPU-bound
            let vectors = tokio::task::spawn_blocking(move || model.lock().embed(batch, None))
                .await
                .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
                .map_err(|e| AppError::Embedding(e.to_string()))?;

            check_batch(expected, vectors)
        }
    }
}
