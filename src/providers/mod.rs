//! Embedding/LLM provider adapters
//!
//! The pipeline consumes providers through two object-safe traits so that
//! deployments (and tests) can swap backends freely. Two HTTP adapters ship
//! with the crate: an OpenAI-compatible one and an Ollama one; both implement
//! both traits.

mod ollama;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::AppConfig;
use crate::errors::Result;

/// Limits applied to a single completion call.
#[derive(Debug, Clone)]
pub struct CompletionConstraints {
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for CompletionConstraints {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

/// Turns text into a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    ///
    /// # Errors
    ///
    /// Network failures and timeouts surface as transient errors; provider
    /// rejections as permanent `Embedding` errors.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    ///
    /// The default implementation embeds sequentially; adapters override it
    /// when the backend supports batching or concurrency.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`embed`](Self::embed); the first failing text
    /// aborts the batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce a completion for the prompt under the given constraints
    ///
    /// # Errors
    ///
    /// Network failures and timeouts surface as transient errors; provider
    /// rejections as permanent `Completion` errors.
    async fn complete(&self, prompt: &str, constraints: &CompletionConstraints) -> Result<String>;
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// `OpenAI`-compatible HTTP API
    OpenAi,
    /// Ollama local models
    Ollama,
}

impl ProviderKind {
    /// Infer the backend from configuration.
    ///
    /// Priority: api_key > endpoint domain. The literal key "ollama" always
    /// selects the local adapter; otherwise the endpoint host decides.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        if config.provider_api_key() == "ollama" {
            ProviderKind::Ollama
        } else if config.provider_endpoint().contains("api.openai.com") {
            ProviderKind::OpenAi
        } else if config.provider_endpoint().contains("localhost")
            || !config.provider_endpoint().contains("openai")
        {
            // Local or non-OpenAI endpoint, assume Ollama
            ProviderKind::Ollama
        } else {
            ProviderKind::OpenAi
        }
    }
}

/// Build the embedding/completion pair the configuration describes.
///
/// Both halves are served by one shared adapter instance.
///
/// # Errors
///
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn provider_from_config(
    config: &AppConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn CompletionProvider>)> {
    match ProviderKind::from_config(config) {
        ProviderKind::OpenAi => {
            let provider = Arc::new(OpenAiProvider::new(
                config.provider_endpoint().to_string(),
                config.provider_api_key().to_string(),
                config.embedding_model().to_string(),
                config.completion_model().to_string(),
            )?);
            Ok((provider.clone(), provider))
        }
        ProviderKind::Ollama => {
            let provider = Arc::new(OllamaProvider::new(
                config.provider_endpoint().to_string(),
                config.embedding_model().to_string(),
                config.completion_model().to_string(),
            )?);
            Ok((provider.clone(), provider))
        }
    }
}
