//! TOML-based configuration for Jarvis
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`jarvis.toml` unless `--config` says otherwise)
//! 3. Environment variables (a `.env` file is loaded into the environment
//!    by the binary before the config is read)
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [rag]
//! chunk_size = 900
//! chunk_overlap = 150
//! top_k = 4
//!
//! [vector_store]
//! provider = "pinecone"
//! index_name = "jarvis-knowledge"
//!
//! [llm]
//! model = "mistral"
//! ```

use crate::db::{PineconeSettings, VectorStoreProvider};
use crate::llm::Provider;
use crate::rag::chunker::{TextChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::rag::embeddings::{Embedder, OllamaEmbedder, MINILM_DIMENSIONS};
use crate::rag::pipeline::{RagPipeline, DEFAULT_TOP_K};
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "jarvis.toml";

const REDACTED: &str = "********";

/// Root configuration structure loaded from jarvis.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JarvisConfig {
    pub server: ServerConfig,
    pub rag: RagConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub llm: LlmConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Folder scanned by `jarvis-server ingest`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            data_dir: default_data_dir(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama's `/api/embed`
    Ollama,
    /// In-process fastembed (`local-embeddings` feature)
    Local,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "local" | "fastembed" => Ok(Self::Local),
            other => Err(format!("unknown embedding provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Ollama server used for embeddings; usually the same as `[llm]`
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Must match the index dimension
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> EmbeddingBackend {
    EmbeddingBackend::Ollama
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

fn default_dimensions() -> usize {
    MINILM_DIMENSIONS
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_ollama_url(),
            dimensions: default_dimensions(),
        }
    }
}

// ============= Vector Store Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    Pinecone,
    /// Process-local index, lost on exit
    Memory,
}

impl FromStr for VectorStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown vector store '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store")]
    pub provider: VectorStoreKind,

    /// Normally supplied through `PINECONE_API_KEY` rather than the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Skips the control-plane lookup when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,

    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_vector_store() -> VectorStoreKind {
    VectorStoreKind::Pinecone
}

fn default_index_name() -> String {
    crate::db::pinecone::DEFAULT_INDEX_NAME.to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_control_plane_url() -> String {
    crate::db::pinecone::DEFAULT_CONTROL_PLANE_URL.to_string()
}

fn default_ready_timeout_secs() -> u64 {
    120
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_store(),
            api_key: None,
            index_name: default_index_name(),
            cloud: default_cloud(),
            region: default_region(),
            namespace: None,
            index_host: None,
            control_plane_url: default_control_plane_url(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "mistral".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Environment variable '{name}' has invalid value '{value}': {reason}")]
    InvalidEnvVar {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl JarvisConfig {
    /// Load configuration from an optional TOML file, then apply environment
    /// overrides. A missing file is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read `path` without consulting the environment. A missing file yields defaults.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, matching how .env files are usually written
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.server.log_level = v;
        }

        if let Some(v) = var("CHUNK_SIZE") {
            self.rag.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = var("CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_var("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = var("TOP_K") {
            self.rag.top_k = parse_var("TOP_K", &v)?;
        }
        if let Some(v) = var("DATA_DIR") {
            self.rag.data_dir = PathBuf::from(v);
        }

        if let Some(v) = var("EMBEDDING_PROVIDER") {
            self.embedding.provider = parse_var("EMBEDDING_PROVIDER", &v)?;
        }
        if let Some(v) = var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }

        if let Some(v) = var("VECTOR_STORE") {
            self.vector_store.provider = parse_var("VECTOR_STORE", &v)?;
        }
        if let Some(v) = var("PINECONE_API_KEY") {
            self.vector_store.api_key = Some(v);
        }
        if let Some(v) = var("PINECONE_INDEX_NAME") {
            self.vector_store.index_name = v;
        }
        if let Some(v) = var("PINECONE_CLOUD") {
            self.vector_store.cloud = v;
        }
        if let Some(v) = var("PINECONE_REGION") {
            self.vector_store.region = v;
        }
        if let Some(v) = var("PINECONE_INDEX_HOST") {
            self.vector_store.index_host = Some(v);
        }
        if let Some(v) = var("PINECONE_NAMESPACE") {
            self.vector_store.namespace = Some(v);
        }

        // OLLAMA_URL points both generation and embeddings at the same server
        if let Some(v) = var("OLLAMA_URL") {
            self.llm.base_url = v.clone();
            self.embedding.base_url = v;
        }
        if let Some(v) = var("OLLAMA_MODEL") {
            self.llm.model = v;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_store.provider == VectorStoreKind::Pinecone
            && self
                .vector_store
                .api_key
                .as_deref()
                .is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "PINECONE_API_KEY is not set (or set vector_store.provider = \"memory\")".into(),
            ));
        }

        TextChunker::new(self.rag.chunk_size, self.rag.chunk_overlap)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be greater than zero".into(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }

        check_url("llm.base_url", &self.llm.base_url)?;
        if self.embedding.provider == EmbeddingBackend::Ollama {
            check_url("embedding.base_url", &self.embedding.base_url)?;
        }
        if self.vector_store.provider == VectorStoreKind::Pinecone {
            check_url(
                "vector_store.control_plane_url",
                &self.vector_store.control_plane_url,
            )?;
        }

        Ok(())
    }

    /// Copy of this configuration with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.vector_store.api_key.is_some() {
            config.vector_store.api_key = Some(REDACTED.to_string());
        }
        config
    }

    /// Render the redacted configuration as TOML.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| ConfigError::ValidationError(format!("Failed to render config: {}", e)))
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    // ============= Component builders =============

    pub fn chunker(&self) -> crate::types::Result<TextChunker> {
        TextChunker::new(self.rag.chunk_size, self.rag.chunk_overlap)
    }

    pub fn vector_store_provider(&self) -> Result<VectorStoreProvider, ConfigError> {
        match self.vector_store.provider {
            VectorStoreKind::Memory => Ok(VectorStoreProvider::Memory),
            VectorStoreKind::Pinecone => {
                let api_key = self.vector_store.api_key.clone().ok_or_else(|| {
                    ConfigError::ValidationError("PINECONE_API_KEY is not set".into())
                })?;

                let mut settings = PineconeSettings::new(api_key);
                settings.index_name = self.vector_store.index_name.clone();
                settings.cloud = self.vector_store.cloud.clone();
                settings.region = self.vector_store.region.clone();
                settings.namespace = self.vector_store.namespace.clone();
                settings.index_host = self.vector_store.index_host.clone();
                settings.control_plane_url = self.vector_store.control_plane_url.clone();
                settings.ready_timeout_secs = self.vector_store.ready_timeout_secs;

                Ok(VectorStoreProvider::Pinecone(settings))
            }
        }
    }

    pub fn llm_provider(&self) -> Provider {
        Provider::Ollama {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }

    pub fn embedder(&self) -> crate::types::Result<Arc<dyn Embedder>> {
        match self.embedding.provider {
            EmbeddingBackend::Ollama => Ok(Arc::new(OllamaEmbedder::new(
                &self.embedding.base_url,
                &self.embedding.model,
                self.embedding.dimensions,
            )?)),

            #[cfg(feature = "local-embeddings")]
            EmbeddingBackend::Local => Ok(Arc::new(crate::rag::embeddings::FastEmbedder::new(
                &self.embedding.model,
            )?)),

            #[cfg(not(feature = "local-embeddings"))]
            EmbeddingBackend::Local => Err(AppError::Configuration(
                "Local embeddings not compiled in. Rebuild with --features local-embeddings"
                    .into(),
            )),
        }
    }

    /// Wire every component into a ready pipeline.
    pub fn build_pipeline(&self) -> crate::types::Result<RagPipeline> {
        let store = self.vector_store_provider()?.create_store()?;
        let llm = self.llm_provider().create_client()?;
        let embedder = self.embedder()?;

        tracing::info!(
            vector_store = store.provider_name(),
            embedding_model = embedder.model_name(),
            llm_model = llm.model_name(),
            top_k = self.rag.top_k,
            "Pipeline configured"
        );

        Ok(RagPipeline::new(self.chunker()?, embedder, store, llm).with_top_k(self.rag.top_k))
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::ValidationError(format!("{} '{}' is not a valid URL: {}", field, value, e)))
}
