//! Vector Store Abstraction Layer
//!
//! The index itself is never implemented here: production deployments
//! delegate storage and nearest-neighbour search to Pinecone. The trait keeps
//! the pipeline independent of that service so it can run against the
//! in-memory store during development and tests.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               VectorStore Trait              │
//! ├──────────────────────────────────────────────┤
//! │   ensure_index   │    upsert    │    query   │
//! └──────────────────────────────────────────────┘
//!          ▲                              ▲
//!    ┌─────┴──────┐                ┌──────┴─────┐
//!    │  Pinecone  │                │  InMemory  │
//!    │  (cloud)   │                │  (testing) │
//!    └────────────┘                └────────────┘
//! ```

use crate::types::{AppError, Result, ScoredMatch, VectorRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Configuration for vector store providers.
#[derive(Debug, Clone)]
pub enum VectorStoreProvider {
    /// Pinecone - Managed cloud vector database.
    Pinecone(super::pinecone::PineconeSettings),

    /// In-memory vector store.
    ///
    /// Data is not persisted and will be lost when the process exits.
    Memory,
}

impl VectorStoreProvider {
    /// Create a vector store instance from this provider configuration.
    pub fn create_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            VectorStoreProvider::Pinecone(settings) => {
                let store = super::pinecone::PineconeStore::new(settings.clone())?;
                Ok(Arc::new(store))
            }
            VectorStoreProvider::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorStoreProvider::Pinecone(_) => "pinecone",
            VectorStoreProvider::Memory => "memory",
        }
    }
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector index operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Create the index if it does not exist yet.
    ///
    /// Existing indexes are left untouched, whatever their dimensions.
    async fn ensure_index(&self, dimensions: usize) -> Result<()>;

    /// Insert or overwrite records, keyed by `id`.
    ///
    /// Returns the number of records written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Return the `top_k` nearest records to `vector` with their metadata,
    /// highest score first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>>;
}

// ============================================================================
// In-Memory Vector Store (for testing)
// ============================================================================

/// In-memory vector store.
///
/// Linear cosine-similarity scan; fine for tests and small local corpora.
pub struct InMemoryVectorStore {
    index: Arc<RwLock<Option<InMemoryIndex>>>,
}

struct InMemoryIndex {
    dimensions: usize,
    records: HashMap<String, VectorRecord>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            index: Arc::new(RwLock::new(None)),
        }
    }

    /// Number of stored records (0 before the index exists).
    pub fn len(&self) -> usize {
        self.index
            .read()
            .as_ref()
            .map(|idx| idx.records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_index(&self, dimensions: usize) -> Result<()> {
        let mut index = self.index.write();
        if index.is_none() {
            *index = Some(InMemoryIndex {
                dimensions,
                records: HashMap::new(),
            });
        }
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut guard = self.index.write();
        let index = guard
            .as_mut()
            .ok_or_else(|| AppError::VectorStore("Index has not been created".into()))?;

        for record in records {
            if record.values.len() != index.dimensions {
                return Err(AppError::VectorStore(format!(
                    "Vector '{}' has dimension {}, index expects {}",
                    record.id,
                    record.values.len(),
                    index.dimensions
                )));
            }
        }

        for record in records {
            index.records.insert(record.id.clone(), record.clone());
        }

        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
        let guard = self.index.read();
        let Some(index) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut results: Vec<ScoredMatch> = index
            .records
            .values()
            .map(|record| ScoredMatch {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values),
                metadata: metadata_map(record),
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }
}

fn metadata_map(record: &VectorRecord) -> HashMap<String, serde_json::Value> {
    HashMap::from([
        ("source".to_string(), record.metadata.source.clone().into()),
        (
            "chunk_id".to_string(),
            record.metadata.chunk_id.clone().into(),
        ),
        ("text".to_string(), record.metadata.text.clone().into()),
    ])
}

// ============================================================================
// Tests
// ============================================================================
