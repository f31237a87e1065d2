//! Vector similarity store interface
//!
//! The pipeline reads chunk embeddings through the [`VectorStore`] trait and
//! never mutates the store; ingestion is an upstream concern. A reference
//! in-memory implementation lives in [`memory`] for tests, demos and small
//! corpora.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::InMemoryVectorStore;

use crate::errors::Result;
use crate::models::DocumentChunk;

/// Similarity hit as returned by a store query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score: f32,
}

/// Read-only view over an indexed chunk corpus.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` nearest neighbors of `embedding`, best first
    ///
    /// # Errors
    ///
    /// Store unavailability surfaces as a transient error.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Resolve a chunk id to its full record
    ///
    /// Returns `Ok(None)` for ids the store does not know.
    ///
    /// # Errors
    ///
    /// Store unavailability surfaces as a transient error.
    async fn get_chunk(&self, chunk_id: &str) -> Result<Option<Arc<DocumentChunk>>>;
}
