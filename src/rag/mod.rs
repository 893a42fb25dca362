//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::loader`](crate::rag::loader) - Reads `.txt` / `.pdf` files from a data directory
//! - [`rag::chunker`](crate::rag::chunker) - Fixed-size overlapping character windows
//! - [`rag::embeddings`](crate::rag::embeddings) - Sentence embeddings (Ollama or fastembed)
//! - [`rag::prompt`](crate::rag::prompt) - Grounded prompt assembly
//! - [`rag::pipeline`](crate::rag::pipeline) - Ingestion and question answering
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are chunked and embedded
//! 2. **Storage** - Embeddings upserted into the vector index with their text
//! 3. **Retrieval** - Query embedded, `top_k` nearest chunks fetched
//! 4. **Generation** - LLM answers from the retrieved chunks only, or the
//!    pipeline falls back to a fixed answer when nothing usable was found
//!
//! # Example
//!
//! ```ignore
//! use jarvis::rag::pipeline::RagPipeline;
//!
//! let pipeline = RagPipeline::new(chunker, embedder, store, llm);
//! pipeline.ingest_document("Handbook.pdf", &text).await?;
//! let response = pipeline.answer_query("How many paid leaves do I get?").await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod loader;
pub mod pipeline;
pub mod prompt;

pub use pipeline::RagPipeline;
