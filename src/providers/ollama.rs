//! Ollama local-model adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::CompletionConstraints;
use super::CompletionProvider;
use super::EmbeddingProvider;
use crate::errors::DocuRagError;
use crate::errors::Result;

/// Adapter for a local Ollama instance.
pub struct OllamaProvider {
    endpoint: String,
    embedding_model: String,
    completion_model: String,
    client: Client,
}

impl OllamaProvider {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns an `Http` error if the HTTP client cannot be built.
    pub fn new(
        endpoint: String,
        embedding_model: String,
        completion_model: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DocuRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            embedding_model,
            completion_model,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = self.url("/api/embeddings");
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DocuRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status.is_server_error() {
                return Err(DocuRagError::TransientProvider(format!(
                    "Ollama API error ({status}): {error_text}"
                )));
            }
            return Err(DocuRagError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| DocuRagError::Embedding(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no batch endpoint, so fan out with bounded concurrency
        use futures::stream::StreamExt;
        use futures::stream::{
            self,
        };

        let concurrency = std::cmp::min(texts.len(), 32);
        let requests: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        let results: Vec<Result<Vec<f32>>> = stream::iter(requests)
            .buffered(concurrency.max(1))
            .collect()
            .await;

        // Convert Vec<Result<T, E>> to Result<Vec<T>, E>
        let mut embeddings = Vec::with_capacity(results.len());
        for result in results {
            embeddings.push(result?);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str, constraints: &CompletionConstraints) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
            options: GenerateOptions,
        }

        #[derive(Serialize)]
        struct GenerateOptions {
            temperature: f32,
            num_predict: usize,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let url = self.url("/api/generate");
        debug!("Calling Ollama generate API: {}", url);

        let request = GenerateRequest {
            model: &self.completion_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: constraints.temperature,
                num_predict: constraints.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DocuRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status.is_server_error() {
                return Err(DocuRagError::TransientProvider(format!(
                    "Ollama API error ({status}): {error_text}"
                )));
            }
            return Err(DocuRagError::Completion(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DocuRagError::Completion(format!("Failed to parse response: {e}")))?;

        Ok(result.response)
    }
}
