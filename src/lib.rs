//! # Jarvis - Retrieval-augmented question answering
//!
//! A small knowledge-base assistant: documents are chunked, embedded and
//! stored in a vector index; questions are answered by a local language
//! model that only sees the chunks retrieved for them.
//!
//! ## Overview
//!
//! Jarvis can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `jarvis-server` binary
//! 2. **As a library** - Build a [`RagPipeline`] from your own components
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use jarvis::JarvisConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = JarvisConfig::load("jarvis.toml")?;
//!     config.validate()?;
//!
//!     let pipeline = config.build_pipeline()?;
//!     pipeline.ingest_document("Handbook.pdf", "Employees get 12 paid leaves per year.").await?;
//!
//!     let response = pipeline.answer_query("How many paid leaves do I get?").await?;
//!     println!("{}", response.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama generation client (default) |
//! | `pdf` | PDF text extraction for ingestion (default) |
//! | `local-embeddings` | In-process fastembed embeddings |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`db`] - Vector stores (Pinecone, in-memory)
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Chunking, embeddings, prompts and the pipeline
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface for the server binary.
pub mod cli;
/// Vector store clients.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities (TOML, environment).
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use db::{VectorStore, VectorStoreProvider};
pub use llm::{LLMClient, Provider};
pub use rag::embeddings::Embedder;
pub use rag::RagPipeline;
pub use types::{AppError, Result};
pub use utils::toml_config::JarvisConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration
    pub config: Arc<JarvisConfig>,
    /// Ingestion and question-answering pipeline
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(config: JarvisConfig, pipeline: RagPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }
}
