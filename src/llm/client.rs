//! LLM Client abstractions and provider management
//!
//! Generation is delegated to a local language-model server. Only Ollama is
//! wired in today; the trait is the seam tests use to substitute a mock.

use crate::types::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "mistral".to_string(),
    ///     timeout: Duration::from_secs(120),
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        timeout: Duration,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's feature is disabled or the base URL
    /// is invalid.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "ollama")]
            Provider::Ollama {
                base_url,
                model,
                timeout,
            } => Ok(Arc::new(super::ollama::OllamaClient::new(
                base_url,
                model.clone(),
                *timeout,
            )?)),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { .. } => Err(crate::types::AppError::Configuration(
                "Ollama support not compiled in. Rebuild with --features ollama".into(),
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "ollama")]
    use crate::types::AppError;

    #[test]
    fn test_provider_name() {
        let provider = Provider::Ollama {
            base_url: "http://localhost:11434".into(),
            model: "mistral".into(),
            timeout: Duration::from_secs(120),
        };
        assert_eq!(provider.name(), "Ollama");
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_create_client_uses_configured_model() {
        let provider = Provider::Ollama {
            base_url: "http://localhost:11434".into(),
            model: "mistral".into(),
            timeout: Duration::from_secs(120),
        };
        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "mistral");
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_create_client_rejects_bad_url() {
        let provider = Provider::Ollama {
            base_url: "not a url".into(),
            model: "mistral".into(),
            timeout: Duration::from_secs(120),
        };
        assert!(matches!(
            provider.create_client().err(),
            Some(AppError::Configuration(_))
        ));
    }
}
