//! In-memory reference vector store

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::ScoredChunk;
use super::VectorStore;
use crate::errors::Result;
use crate::models::DocumentChunk;

/// Brute-force cosine-similarity store over an in-memory chunk index.
///
/// Suitable for tests, demos and small corpora; larger deployments implement
/// [`VectorStore`] over a real index.
#[derive(Default)]
pub struct InMemoryVectorStore {
    chunks: DashMap<String, Arc<DocumentChunk>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: DashMap::new(),
        }
    }

    /// Ingestion hook: index a batch of chunks, replacing any with the same id.
    pub fn add_chunks(&self, chunks: impl IntoIterator<Item = DocumentChunk>) {
        for chunk in chunks {
            self.chunks
                .insert(chunk.chunk_id.clone(), Arc::new(chunk));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let mut scores: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|entry| ScoredChunk {
                chunk_id: entry.key().clone(),
                score: cosine_similarity(embedding, &entry.value().embedding),
            })
            .collect();

        // Best first; chunk_id tiebreak keeps full scans deterministic
        scores.sort_by(|first, second| {
            second
                .score
                .partial_cmp(&first.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| first.chunk_id.cmp(&second.chunk_id))
        });
        scores.truncate(top_k);

        debug!(
            "In-memory store scored {} chunks, returning {}",
            self.chunks.len(),
            scores.len()
        );
        Ok(scores)
    }

    async fn get_chunk(&self, chunk_id: &str) -> Result<Option<Arc<DocumentChunk>>> {
        Ok(self.chunks.get(chunk_id).map(|entry| entry.value().clone()))
    }
}

/// Cosine similarity with the degenerate cases pinned to 0.0.
#[must_use]
pub fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> f32 {
    if vector_a.len() != vector_b.len() {
        return 0.0;
    }

    let dot_product: f32 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(x, y)| x * y)
        .sum();
    let magnitude_a = vector_a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = vector_b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
