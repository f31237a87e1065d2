use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous span of source-document text with its embedding.
///
/// Chunks are produced by the ingestion pipeline and are immutable after
/// ingestion; the query pipeline only ever holds `Arc` references to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub source_file: String,
    pub page_number: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub byte_offset: u64,
}

impl DocumentChunk {
    #[must_use]
    pub fn new(
        chunk_id: impl Into<String>,
        source_file: impl Into<String>,
        page_number: u32,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_file: source_file.into(),
            page_number,
            text: text.into(),
            embedding,
            byte_offset: 0,
        }
    }

    #[must_use]
    pub fn with_byte_offset(mut self, byte_offset: u64) -> Self {
        self.byte_offset = byte_offset;
        self
    }
}

/// A chunk retrieved as potentially relevant to a query, with its
/// similarity score.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Arc<DocumentChunk>,
    pub score: f32,
}

impl Candidate {
    #[must_use]
    pub fn new(chunk: Arc<DocumentChunk>, score: f32) -> Self {
        Self { chunk, score }
    }

    #[must_use]
    pub fn chunk_id(&self) -> &str {
        &self.chunk.chunk_id
    }

    #[must_use]
    pub fn source_file(&self) -> &str {
        &self.chunk.source_file
    }
}

/// A single source attribution attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_file: String,
    pub page_number: u32,
    pub relevance_score: f32,
}

impl Citation {
    /// Identity used for deduplication: the same page of the same file is
    /// cited at most once.
    #[must_use]
    pub fn key(&self) -> (&str, u32) {
        (&self.source_file, self.page_number)
    }
}

/// One query/answer exchange recorded in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub query_text: String,
    pub final_answer: String,
    pub citations: Vec<Citation>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    #[must_use]
    pub fn new(
        query_text: impl Into<String>,
        final_answer: impl Into<String>,
        citations: Vec<Citation>,
    ) -> Self {
        Self {
            query_text: query_text.into(),
            final_answer: final_answer.into(),
            citations,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_key_identity() {
        let a = Citation {
            source_file: "guide.pdf".to_string(),
            page_number: 3,
            relevance_score: 0.9,
        };
        let b = Citation {
            source_file: "guide.pdf".to_string(),
            page_number: 3,
            relevance_score: 0.4,
        };
        // Same page of the same file, regardless of score.
        assert_eq!(a.key(), b.key());

        let c = Citation {
            source_file: "guide.pdf".to_string(),
            page_number: 4,
            relevance_score: 0.9,
        };
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_candidate_shares_chunk() {
        let chunk = Arc::new(DocumentChunk::new(
            "c1",
            "guide.pdf",
            1,
            "some text",
            vec![0.1, 0.2],
        ));
        let a = Candidate::new(Arc::clone(&chunk), 0.8);
        let b = Candidate::new(Arc::clone(&chunk), 0.6);
        assert_eq!(a.chunk_id(), b.chunk_id());
        assert_eq!(Arc::strong_count(&chunk), 3);
    }

    #[test]
    fn test_turn_records_timestamp() {
        let turn = Turn::new("what is covered?", "Everything in scope.", vec![]);
        assert!(turn.timestamp <= Utc::now());
        assert!(turn.citations.is_empty());
    }
}
