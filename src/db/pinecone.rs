//! Pinecone vector database integration.
//!
//! Talks to Pinecone's REST API directly:
//!
//! - control plane (`https://api.pinecone.io`): list, create and describe
//!   indexes
//! - data plane (`https://<index-host>`): upsert and query vectors
//!
//! Every request carries the `Api-Key` header. Upstream failures are
//! returned as [`AppError::VectorStore`] with the status and body; nothing is
//! retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use jarvis::db::{PineconeSettings, PineconeStore, VectorStore};
//!
//! let store = PineconeStore::new(PineconeSettings::new("pcsk_..."))?;
//! store.ensure_index(384).await?;
//! store.upsert(&records).await?;
//! let matches = store.query(&query_embedding, 4).await?;
//! ```

use super::vectorstore::VectorStore;
use crate::types::{AppError, Result, ScoredMatch, VectorRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_INDEX_NAME: &str = "jarvis-knowledge";
const API_VERSION: &str = "2025-04";

/// Pinecone accepts at most 1000 vectors / 2MB per upsert request; text
/// metadata makes 100 the safe batch size.
pub const UPSERT_BATCH_SIZE: usize = 100;

const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct PineconeSettings {
    pub api_key: String,
    pub index_name: String,
    /// Serverless cloud used when the index has to be created
    pub cloud: String,
    pub region: String,
    pub namespace: Option<String>,
    /// Data-plane URL; resolved from the control plane when unset
    pub index_host: Option<String>,
    pub control_plane_url: String,
    /// How long to wait for a freshly created index to become ready
    pub ready_timeout_secs: u64,
}

impl PineconeSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            namespace: None,
            index_host: None,
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.to_string(),
            ready_timeout_secs: 120,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

// Request bodies are typed so vector values serialize as f32, not widened f64.
#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredMatch>,
}

// ============================================================================
// Store
// ============================================================================

/// Pinecone-backed [`VectorStore`].
pub struct PineconeStore {
    http_client: reqwest::Client,
    settings: PineconeSettings,
    host: OnceCell<String>,
}

impl PineconeStore {
    pub fn new(settings: PineconeSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "Pinecone API key is empty. Set PINECONE_API_KEY".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let host = OnceCell::new();
        if let Some(ref explicit) = settings.index_host {
            // Cannot fail: the cell is fresh
            let _ = host.set(normalize_host(explicit));
        }

        Ok(Self {
            http_client,
            settings,
            host,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.settings.index_name
    }

    fn control_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.settings.control_plane_url.trim_end_matches('/'),
            path
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("Api-Key", &self.settings.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone {} failed: {}", operation, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone {} failed: {}", operation, e)))?;

        if !status.is_success() {
            return Err(AppError::VectorStore(format!(
                "Pinecone {} failed ({}): {}",
                operation, status, text
            )));
        }

        let body: &str = if text.trim().is_empty() {
            "{}"
        } else {
            text.as_str()
        };
        serde_json::from_str(body).map_err(|e| {
            AppError::VectorStore(format!("Invalid Pinecone {} response: {}", operation, e))
        })
    }

    async fn list_index_names(&self) -> Result<Vec<String>> {
        let list: IndexList = self
            .send(
                "list indexes",
                self.request(reqwest::Method::GET, &self.control_url("/indexes")),
            )
            .await?;
        Ok(list.indexes.into_iter().map(|idx| idx.name).collect())
    }

    async fn describe_index(&self) -> Result<IndexModel> {
        let url = self.control_url(&format!("/indexes/{}", self.settings.index_name));
        self.send("describe index", self.request(reqwest::Method::GET, &url))
            .await
    }

    async fn create_index(&self, dimensions: usize) -> Result<()> {
        let body = json!({
            "name": self.settings.index_name,
            "dimension": dimensions,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": self.settings.cloud,
                    "region": self.settings.region,
                }
            }
        });

        let response = self
            .request(reqwest::Method::POST, &self.control_url("/indexes"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone create index failed: {}", e)))?;

        let status = response.status();
        // Lost a race with another ingester
        if status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Pinecone create index failed ({}): {}",
                status, text
            )));
        }
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<IndexModel> {
        let deadline = Instant::now() + Duration::from_secs(self.settings.ready_timeout_secs);

        loop {
            let model = self.describe_index().await?;
            if model.status.as_ref().map(|s| s.ready).unwrap_or(false) {
                return Ok(model);
            }
            if Instant::now() >= deadline {
                return Err(AppError::VectorStore(format!(
                    "Pinecone index '{}' not ready after {}s",
                    self.settings.index_name, self.settings.ready_timeout_secs
                )));
            }
            tracing::debug!(index = %self.settings.index_name, "Waiting for index to become ready");
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Data-plane base URL, resolved once per store.
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let model = self.describe_index().await?;
                model.host.map(|h| normalize_host(&h)).ok_or_else(|| {
                    AppError::VectorStore(format!(
                        "Pinecone index '{}' has no host yet",
                        self.settings.index_name
                    ))
                })
            })
            .await?;
        Ok(host.as_str())
    }

    fn namespace(&self) -> &str {
        self.settings.namespace.as_deref().unwrap_or("")
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn ensure_index(&self, dimensions: usize) -> Result<()> {
        let existing = self.list_index_names().await?;
        if existing.iter().any(|name| name == &self.settings.index_name) {
            return Ok(());
        }

        tracing::info!(
            index = %self.settings.index_name,
            dimensions,
            cloud = %self.settings.cloud,
            region = %self.settings.region,
            "Creating Pinecone index"
        );
        self.create_index(dimensions).await?;

        let model = self.wait_until_ready().await?;
        if let Some(host) = model.host {
            let _ = self.host.set(normalize_host(&host));
        }
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.host().await?);
        let mut written = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let body = UpsertRequest {
                vectors: batch,
                namespace: self.namespace(),
            };
            let response: UpsertResponse = self
                .send(
                    "upsert",
                    self.request(reqwest::Method::POST, &url).json(&body),
                )
                .await?;
            written += response.upserted_count.unwrap_or(batch.len());
        }

        Ok(written)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
        let url = format!("{}/query", self.host().await?);
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace(),
        };

        let response: QueryResponse = self
            .send("query", self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        Ok(response.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> PineconeSettings {
        PineconeSettings {
            control_plane_url: server.uri(),
            ready_timeout_secs: 5,
            ..PineconeSettings::new("test-key")
        }
    }

    fn record(i: usize) -> VectorRecord {
        VectorRecord {
            id: format!("id-{}", i),
            values: vec![0.0, 1.0],
            metadata: ChunkMetadata {
                source: "Handbook.pdf".into(),
                chunk_id: i.to_string(),
                text: format!("chunk {}", i),
            },
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("jarvis-abc.svc.pinecone.io"),
            "https://jarvis-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = PineconeStore::new(PineconeSettings::new("  ")).err().unwrap();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_ensure_index_creates_missing_index() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexes"))
            .and(header("Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "jarvis-knowledge",
                "dimension": 384,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "jarvis-knowledge",
                "status": { "ready": false, "state": "Initializing" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/indexes/jarvis-knowledge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "jarvis-knowledge",
                "host": server.uri(),
                "status": { "ready": true, "state": "Ready" }
            })))
            .mount(&server)
            .await;

        let store = PineconeStore::new(settings(&server)).unwrap();
        store.ensure_index(384).await.unwrap();

        assert_eq!(store.host().await.unwrap(), server.uri());
    }

    #[tokio::test]
    async fn test_ensure_index_keeps_existing_index() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{ "name": "jarvis-knowledge", "dimension": 384 }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let store = PineconeStore::new(settings(&server)).unwrap();
        store.ensure_index(384).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_is_batched() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(3)
            .mount(&server)
            .await;

        let store = PineconeStore::new(PineconeSettings {
            index_host: Some(server.uri()),
            ..settings(&server)
        })
        .unwrap();

        let records: Vec<VectorRecord> = (0..250).map(record).collect();
        assert_eq!(store.upsert(&records).await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_upsert_sends_chunk_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({
                "vectors": [{
                    "id": "id-0",
                    "metadata": { "source": "Handbook.pdf", "chunk_id": "0", "text": "chunk 0" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let store = PineconeStore::new(PineconeSettings {
            index_host: Some(server.uri()),
            ..settings(&server)
        })
        .unwrap();

        assert_eq!(store.upsert(&[record(0)]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_f32_values_exact() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
            .mount(&server)
            .await;

        let store = PineconeStore::new(PineconeSettings {
            index_host: Some(server.uri()),
            ..settings(&server)
        })
        .unwrap();

        let mut rec = record(0);
        rec.values = vec![0.6, 0.0, 0.8];
        store.upsert(&[rec]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains(r#""values":[0.6,0.0,0.8]"#), "{}", body);
    }

    #[tokio::test]
    async fn test_query_resolves_host_and_parses_matches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexes/jarvis-knowledge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "jarvis-knowledge",
                "host": server.uri(),
                "status": { "ready": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({ "topK": 4, "includeMetadata": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    { "id": "a", "score": 0.91, "metadata": { "source": "Handbook.pdf", "chunk_id": "0", "text": "leave" } },
                    { "id": "b", "score": 0.42 }
                ],
                "namespace": ""
            })))
            .mount(&server)
            .await;

        let store = PineconeStore::new(settings(&server)).unwrap();
        let matches = store.query(&[0.0, 1.0], 4).await.unwrap();
        // Host lookup is cached
        store.query(&[0.0, 1.0], 4).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert_eq!(matches[0].metadata["source"], "Handbook.pdf");
        assert!(matches[1].metadata.is_empty());
    }

    #[tokio::test]
    async fn test_query_passes_through_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let store = PineconeStore::new(PineconeSettings {
            index_host: Some(server.uri()),
            ..settings(&server)
        })
        .unwrap();

        match store.query(&[1.0], 4).await.unwrap_err() {
            AppError::VectorStore(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
