//! Ingestion and question answering over a vector index.

use crate::db::VectorStore;
use crate::llm::LLMClient;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::rag::prompt::build_prompt;
use crate::types::{
    AppError, ChatResponse, ChunkMetadata, IngestReport, Result, RetrievedChunk, VectorRecord,
};
use std::sync::Arc;

/// Number of chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Chunk, embed, store, retrieve, generate.
///
/// Every collaborator is a trait object so the pipeline can run against
/// Pinecone and Ollama in production and in-process fakes in tests.
pub struct RagPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMClient>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn llm(&self) -> &Arc<dyn LLMClient> {
        &self.llm
    }

    /// Split `text` into chunks and write one vector per chunk.
    ///
    /// Every call mints fresh ids, so ingesting the same document twice
    /// stores it twice.
    pub async fn ingest_document(&self, source: &str, text: &str) -> Result<IngestReport> {
        self.store.ensure_index(self.embedder.dimensions()).await?;

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::warn!(source = %source, "No chunks produced, nothing to ingest");
            return Ok(IngestReport {
                source: source.to_string(),
                chunks: 0,
            });
        }

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Embedded {} of {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, values))| VectorRecord {
                id: uuid::Uuid::new_v4().to_string(),
                values,
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_id: i.to_string(),
                    text: chunk,
                },
            })
            .collect();

        let total = records.len();
        self.store.upsert(&records).await?;

        tracing::info!(source = %source, chunks = total, "Ingested document");

        Ok(IngestReport {
            source: source.to_string(),
            chunks: total,
        })
    }

    /// Nearest chunks to `query`, best first, with metadata defaults filled in.
    pub async fn retrieve_context(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed_one(query).await?;
        let matches = self.store.query(&vector, top_k).await?;

        tracing::debug!(matches = matches.len(), top_k, "Retrieved context");

        Ok(matches.iter().map(RetrievedChunk::from_match).collect())
    }

    /// Answer `query` from the index, or fall back without calling the model
    /// when retrieval yields no usable text.
    pub async fn answer_query(&self, query: &str) -> Result<ChatResponse> {
        let contexts = self.retrieve_context(query, self.top_k).await?;

        if contexts.iter().all(|c| c.text.trim().is_empty()) {
            tracing::info!("No usable context retrieved, returning fallback answer");
            return Ok(ChatResponse::fallback());
        }

        let prompt = build_prompt(query, &contexts);
        let answer = self.llm.generate(&prompt).await?;

        Ok(ChatResponse {
            answer,
            sources: contexts.iter().map(RetrievedChunk::to_source).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryVectorStore;
    use crate::types::{ScoredMatch, FALLBACK_ANSWER};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Bag-of-letters embedding: texts sharing letters land close together.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn dimensions(&self) -> usize {
            26
        }

        fn model_name(&self) -> &str {
            "letters"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; 26];
                    for c in t.to_ascii_lowercase().bytes() {
                        if c.is_ascii_lowercase() {
                            v[(c - b'a') as usize] += 1.0;
                        }
                    }
                    crate::rag::embeddings::normalize(v)
                })
                .collect())
        }
    }

    struct RecordingLlm {
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl RecordingLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LLMClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock() = Some(prompt.to_string());
            Ok("Twelve.".to_string())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    /// Store whose hits carry no metadata at all.
    struct BareStore;

    #[async_trait]
    impl VectorStore for BareStore {
        fn provider_name(&self) -> &'static str {
            "bare"
        }

        async fn ensure_index(&self, _dimensions: usize) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
            Ok(records.len())
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
            Ok((0..top_k.min(2))
                .map(|i| ScoredMatch {
                    id: format!("id-{i}"),
                    score: 0.5,
                    metadata: HashMap::new(),
                })
                .collect())
        }
    }

    fn pipeline(store: Arc<dyn VectorStore>, llm: Arc<RecordingLlm>) -> RagPipeline {
        RagPipeline::new(TextChunker::new(40, 10).unwrap(), Arc::new(LetterEmbedder), store, llm)
    }

    #[tokio::test]
    async fn test_ingest_assigns_sequential_chunk_ids() {
        let store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(RecordingLlm::new());
        let pipeline = pipeline(store.clone(), llm);

        let text = "Employees get 12 paid leaves per year. Overtime is paid at 1.5x.";
        let report = pipeline.ingest_document("Handbook.pdf", text).await.unwrap();

        assert_eq!(report.source, "Handbook.pdf");
        assert!(report.chunks > 1);
        assert_eq!(store.len(), report.chunks);

        let hits = pipeline.retrieve_context("leaves", 10).await.unwrap();
        let mut ids: Vec<usize> = hits.iter().map(|c| c.chunk_id.parse().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..report.chunks).collect::<Vec<_>>());
        assert!(hits.iter().all(|c| c.source == "Handbook.pdf"));
    }

    #[tokio::test]
    async fn test_ingest_blank_text_reports_zero() {
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline = pipeline(store.clone(), Arc::new(RecordingLlm::new()));

        let report = pipeline.ingest_document("empty.txt", "   \n").await.unwrap();
        assert_eq!(report.chunks, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reingesting_duplicates_records() {
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline = pipeline(store.clone(), Arc::new(RecordingLlm::new()));

        pipeline.ingest_document("a.txt", "short note").await.unwrap();
        pipeline.ingest_document("a.txt", "short note").await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_without_llm() {
        let llm = Arc::new(RecordingLlm::new());
        let pipeline = pipeline(Arc::new(InMemoryVectorStore::new()), llm.clone());

        let response = pipeline.answer_query("How many leaves?").await.unwrap();
        assert_eq!(response.answer, FALLBACK_ANSWER);
        assert!(response.sources.is_empty());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_context_text_falls_back_without_llm() {
        let llm = Arc::new(RecordingLlm::new());
        let pipeline = pipeline(Arc::new(BareStore), llm.clone());

        let hits = pipeline.retrieve_context("anything", 4).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "unknown");
        assert_eq!(hits[0].chunk_id, "NA");

        let response = pipeline.answer_query("anything").await.unwrap();
        assert_eq!(response, ChatResponse::fallback());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_grounded_answer_cites_sources_in_order() {
        let store = Arc::new(InMemoryVectorStore::new());
        let llm = Arc::new(RecordingLlm::new());
        let pipeline = pipeline(store, llm.clone()).with_top_k(2);

        pipeline
            .ingest_document("Handbook.pdf", "Employees get 12 paid leaves per year.")
            .await
            .unwrap();

        let response = pipeline.answer_query("paid leaves").await.unwrap();
        assert_eq!(response.answer, "Twelve.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].source, "Handbook.pdf");
        assert_eq!(response.sources[0].chunk_id, "0");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let prompt = llm.last_prompt.lock().clone().unwrap();
        assert!(prompt.contains("[Source: Handbook.pdf | Chunk: 0]"));
        assert!(prompt.contains("USER QUESTION:\npaid leaves"));
    }

    #[tokio::test]
    async fn test_llm_errors_propagate() {
        struct FailingLlm;

        #[async_trait]
        impl LLMClient for FailingLlm {
            async fn generate(&self, _prompt: &str) -> Result<String> {
                Err(AppError::LLM("connection refused".into()))
            }

            fn model_name(&self) -> &str {
                "failing"
            }
        }

        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline = RagPipeline::new(
            TextChunker::default(),
            Arc::new(LetterEmbedder),
            store,
            Arc::new(FailingLlm),
        );
        pipeline.ingest_document("a.txt", "some text").await.unwrap();

        let err = pipeline.answer_query("text").await.unwrap_err();
        assert!(matches!(err, AppError::LLM(_)));
    }
}
