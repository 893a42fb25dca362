use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Ollama client for the one-shot generate API (`stream: false`).
pub struct OllamaClient {
    client: Ollama,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        let (host, port) = split_base_url(base_url)?;
        let client = Ollama::builder().host(host.as_str()).port(port).build();

        Ok(Self {
            client,
            model,
            timeout,
        })
    }
}

/// Split `scheme://host[:port]` into the host and port the client builder takes.
/// A missing port means Ollama's default, not the scheme's.
fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| AppError::Configuration(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Configuration(format!(
            "Ollama URL '{}' must use http or https",
            base_url
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::Configuration(format!("Ollama URL '{}' has no host", base_url)))?;

    Ok((
        format!("{}://{}", url.scheme(), host),
        url.port().unwrap_or(DEFAULT_OLLAMA_PORT),
    ))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());

        let response = tokio::time::timeout(self.timeout, self.client.generate(request))
            .await
            .map_err(|_| {
                AppError::LLM(format!(
                    "Ollama did not respond within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
