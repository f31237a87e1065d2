//! OpenAI-compatible HTTP adapter

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::CompletionConstraints;
use super::CompletionProvider;
use super::EmbeddingProvider;
use crate::errors::DocuRagError;
use crate::errors::Result;

/// Adapter for OpenAI-compatible embedding and chat-completion endpoints.
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    embedding_model: String,
    completion_model: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns an `Http` error if the HTTP client cannot be built.
    pub fn new(
        endpoint: String,
        api_key: String,
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
            api_key,
            embedding_model,
            completion_model,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint.trim_end_matches('/'))
    }
}

/// Rate limits and server-side failures are worth retrying; everything else
/// is a rejection of the request itself.
fn classify_status(
    status: StatusCode,
    context: &str,
    body: String,
    permanent: fn(String) -> DocuRagError,
) -> DocuRagError {
    let message = format!("{context} ({status}): {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        DocuRagError::TransientProvider(message)
    } else {
        permanent(message)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = self.url("/v1/embeddings");
        debug!("Calling OpenAI embeddings API: {}", url);

        let request = EmbeddingRequest {
            input: text,
            model: &self.embedding_model,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            return Err(classify_status(
                status,
                "OpenAI embeddings API error",
                error_text,
                DocuRagError::Embedding,
            ));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocuRagError::Embedding(format!("Failed to parse response: {e}")))?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DocuRagError::Embedding("No embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct BatchRequest<'a> {
            input: &'a [String],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = self.url("/v1/embeddings");
        debug!("Calling OpenAI batch embeddings API: {} items", texts.len());

        let request = BatchRequest {
            input: texts,
            model: &self.embedding_model,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            return Err(classify_status(
                status,
                "OpenAI embeddings API error",
                error_text,
                DocuRagError::Embedding,
            ));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocuRagError::Embedding(format!("Failed to parse response: {e}")))?;

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, constraints: &CompletionConstraints) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: usize,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let url = self.url("/v1/chat/completions");
        debug!("Calling OpenAI chat completions API: {}", url);

        let request = ChatRequest {
            model: &self.completion_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: constraints.max_tokens,
            temperature: constraints.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            return Err(classify_status(
                status,
                "OpenAI chat API error",
                error_text,
                DocuRagError::Completion,
            ));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocuRagError::Completion(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DocuRagError::Completion("No choices in response".to_string()))
    }
}
