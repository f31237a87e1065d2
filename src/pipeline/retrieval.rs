//! Candidate retrieval and selection policy

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::models::Candidate;
use crate::models::Turn;
use crate::providers::EmbeddingProvider;
use crate::store::VectorStore;

/// Greeting fragments that mark a query as smalltalk rather than a
/// question about the corpus.
const GREETING_PATTERNS: &[&str] = &[
    // English
    "hello",
    "hi",
    "hey",
    "how are you",
    "good morning",
    "good evening",
    "thank you",
    "thanks",
    "goodbye",
    "see you",
    // Turkish
    "merhaba",
    "selam",
    "nasılsın",
    "günaydın",
    "iyi akşamlar",
    "teşekkürler",
    "sağol",
    "hoşça kal",
    "görüşürüz",
    "naber",
    // Italian
    "ciao",
    "buongiorno",
    "buonasera",
    "grazie",
    "arrivederci",
];

/// Tuning knobs for candidate selection.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub min_distinct_sources: usize,
    pub near_duplicate_overlap: f32,
    pub smalltalk_gate: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            similarity_threshold: 0.5,
            min_distinct_sources: 2,
            near_duplicate_overlap: 0.8,
            smalltalk_gate: true,
        }
    }
}

/// Turns a query into a ranked, deduplicated candidate list.
pub struct RetrievalStage {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    options: RetrievalOptions,
}

impl RetrievalStage {
    /// Create a new retrieval stage
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            options,
        }
    }

    /// Retrieve candidates for a query.
    ///
    /// Pipeline: smalltalk gate → follow-up reformulation → embed →
    /// top-K store query → threshold filter → per-source near-duplicate
    /// dedup → deterministic sort. An empty result is a valid outcome,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Embedding or store unavailability propagates as a transient error.
    pub async fn retrieve(&self, query: &str, history: &[Turn]) -> Result<Vec<Candidate>> {
        if self.options.smalltalk_gate && is_smalltalk(query) {
            debug!("Query classified as smalltalk, skipping store lookup");
            return Ok(Vec::new());
        }

        let embedding_input = contextual_query(query, history);
        debug!("Generating query embedding");
        let query_embedding = self.embedder.embed(&embedding_input).await?;

        debug!("Querying vector store with top_k={}", self.options.top_k);
        let hits = self
            .store
            .query(&query_embedding, self.options.top_k)
            .await?;

        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.score < self.options.similarity_threshold {
                continue;
            }
            if let Some(chunk) = self.store.get_chunk(&hit.chunk_id).await? {
                candidates.push(Candidate::new(chunk, hit.score));
            }
        }

        let mut selected = dedupe_near_identical(
            candidates,
            self.options.min_distinct_sources,
            self.options.near_duplicate_overlap,
        );

        // Descending score, ascending chunk_id on ties: same query, same order
        selected.sort_by(|first, second| {
            second
                .score
                .partial_cmp(&first.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| first.chunk_id().cmp(second.chunk_id()))
        });

        debug!("Selected {} candidates", selected.len());
        Ok(selected)
    }
}

/// Short greeting-only inputs skip the store entirely.
fn is_smalltalk(query: &str) -> bool {
    let lowered = query.to_lowercase();
    let lowered = lowered.trim();
    if lowered.split_whitespace().count() >= 3 {
        return false;
    }
    GREETING_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Terse follow-ups borrow the previous query for embedding only; the
/// stored query text is never rewritten.
fn contextual_query(query: &str, history: &[Turn]) -> String {
    let is_terse = query.split_whitespace().count() <= 3;
    match history.last() {
        Some(previous) if is_terse => format!("{} {query}", previous.query_text),
        _ => query.to_string(),
    }
}

/// Per-source near-duplicate filtering.
///
/// Within one source file, a chunk whose text overlaps a higher-scored kept
/// chunk at or above `overlap_threshold` is dropped, so a single document
/// cannot dominate the candidate list with restatements of one passage.
/// When the incoming set spans fewer than `min_distinct_sources` source
/// files, everything is kept: recall matters more than tidiness when there
/// is little to fan out over.
fn dedupe_near_identical(
    candidates: Vec<Candidate>,
    min_distinct_sources: usize,
    overlap_threshold: f32,
) -> Vec<Candidate> {
    let distinct_sources: HashSet<&str> = candidates
        .iter()
        .map(Candidate::source_file)
        .collect();
    if distinct_sources.len() < min_distinct_sources {
        return candidates;
    }

    // Visit best-first so each near-duplicate cluster keeps its top scorer.
    let mut by_score: Vec<&Candidate> = candidates.iter().collect();
    by_score.sort_by(|first, second| {
        second
            .score
            .partial_cmp(&first.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| first.chunk_id().cmp(second.chunk_id()))
    });

    let mut kept_ids: HashSet<&str> = HashSet::new();
    let mut kept: Vec<&Candidate> = Vec::with_capacity(by_score.len());
    for candidate in by_score {
        let duplicate = kept.iter().any(|existing| {
            existing.source_file() == candidate.source_file()
                && word_overlap(&existing.chunk.text, &candidate.chunk.text) >= overlap_threshold
        });
        if duplicate {
            debug!(
                "Dropping near-duplicate chunk {} from {}",
                candidate.chunk_id(),
                candidate.source_file()
            );
        } else {
            kept_ids.insert(candidate.chunk_id());
            kept.push(candidate);
        }
    }

    candidates
        .iter()
        .filter(|candidate| kept_ids.contains(candidate.chunk_id()))
        .cloned()
        .collect()
}

/// Jaccard similarity over lowercase word sets.
fn word_overlap(first: &str, second: &str) -> f32 {
    let first_lower = first.to_lowercase();
    let second_lower = second.to_lowercase();
    let words_a: HashSet<&str> = first_lower.split_whitespace().collect();
    let words_b: HashSet<&str> = second_lower.split_whitespace().collect();
    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f32 / union as f32
}
