//! Citation attribution and answer finalization

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;

use crate::models::{Candidate, Citation};
use crate::pipeline::language::Language;

/// Attach source citations to a draft answer.
///
/// Every candidate that informed synthesis is cited. Citations are
/// deduplicated by (source file, page number), keeping the first occurrence
/// and the candidate order. With no candidates the draft passes through
/// unchanged and the citation list is empty.
#[must_use]
pub fn cite(draft: &str, candidates: &[Candidate], language: Language) -> (String, Vec<Citation>) {
    let citations = collect_citations(candidates);
    if citations.is_empty() {
        return (draft.to_string(), citations);
    }
    debug!("Attributed {} citations", citations.len());

    let mut answer = String::from(draft);
    answer.push_str(&render_footer(&citations, language));
    (answer, citations)
}

/// One-line digest of cited sources for logs and formatted results.
#[must_use]
pub fn citation_summary(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return "no sources".to_string();
    }
    let mut order: Vec<&str> = Vec::new();
    let mut pages: HashMap<&str, Vec<u32>> = HashMap::new();
    for citation in citations {
        let file = citation.source_file.as_str();
        let entry = pages.entry(file).or_default();
        if entry.is_empty() {
            order.push(file);
        }
        entry.push(citation.page_number);
    }
    order
        .iter()
        .map(|file| {
            let list = pages[file]
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{file} (pages {list})")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn collect_citations(candidates: &[Candidate]) -> Vec<Citation> {
    let mut seen: HashSet<(&str, u32)> = HashSet::new();
    let mut citations = Vec::new();
    for candidate in candidates {
        if seen.insert((candidate.source_file(), candidate.chunk.page_number)) {
            citations.push(Citation {
                source_file: candidate.chunk.source_file.clone(),
                page_number: candidate.chunk.page_number,
                relevance_score: candidate.score,
            });
        }
    }
    citations
}

fn render_footer(citations: &[Citation], language: Language) -> String {
    let mut footer = format!("\n\n**{}:**", language.sources_heading());
    for (index, citation) in citations.iter().enumerate() {
        footer.push_str(&format!(
            "\n{}. {} ({} {})",
            index + 1,
            citation.source_file,
            language.page_word(),
            citation.page_number
        ));
    }
    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;
    use std::sync::Arc;

    fn candidate(id: &str, source: &str, page: u32, score: f32) -> Candidate {
        Candidate::new(
            Arc::new(DocumentChunk::new(id, source, page, "passage text", vec![1.0])),
            score,
        )
    }

    // ====== Citation Collection Tests ======

    #[test]
    fn test_every_candidate_is_cited() {
        let candidates = vec![
            candidate("c1", "guide.pdf", 3, 0.9),
            candidate("c2", "rules.pdf", 7, 0.8),
        ];
        let (_, citations) = cite("The cap is 60000 EUR.", &candidates, Language::English);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].source_file, "guide.pdf");
        assert_eq!(citations[1].source_file, "rules.pdf");
    }

    #[test]
    fn test_same_page_cited_once_keeping_first_score() {
        let candidates = vec![
            candidate("c1", "guide.pdf", 3, 0.9),
            candidate("c2", "guide.pdf", 3, 0.6),
            candidate("c3", "guide.pdf", 4, 0.5),
        ];
        let (_, citations) = cite("answer", &candidates, Language::English);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].page_number, 3);
        assert!((citations[0].relevance_score - 0.9).abs() < 1e-6);
        assert_eq!(citations[1].page_number, 4);
    }

    #[test]
    fn test_citations_preserve_candidate_order() {
        let candidates = vec![
            candidate("c1", "b.pdf", 1, 0.9),
            candidate("c2", "a.pdf", 1, 0.8),
        ];
        let (_, citations) = cite("answer", &candidates, Language::English);
        let files: Vec<&str> = citations.iter().map(|c| c.source_file.as_str()).collect();
        assert_eq!(files, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_never_more_citations_than_candidates() {
        let candidates = vec![
            candidate("c1", "a.pdf", 1, 0.9),
            candidate("c2", "a.pdf", 1, 0.8),
        ];
        let (_, citations) = cite("answer", &candidates, Language::English);
        assert!(citations.len() <= candidates.len());
    }

    // ====== Footer Rendering Tests ======

    #[test]
    fn test_footer_appended_in_query_language() {
        let candidates = vec![candidate("c1", "rehber.pdf", 2, 0.9)];
        let (answer, _) = cite("Hibe üst sınırı 60000 EUR.", &candidates, Language::Turkish);
        assert_eq!(
            answer,
            "Hibe üst sınırı 60000 EUR.\n\n**Kaynaklar:**\n1. rehber.pdf (Sayfa 2)"
        );
    }

    #[test]
    fn test_footer_numbers_follow_citation_order() {
        let candidates = vec![
            candidate("c1", "guide.pdf", 3, 0.9),
            candidate("c2", "rules.pdf", 7, 0.8),
        ];
        let (answer, _) = cite("The cap is 60000 EUR.", &candidates, Language::English);
        assert!(answer.contains("**Sources:**\n1. guide.pdf (Page 3)\n2. rules.pdf (Page 7)"));
    }

    #[test]
    fn test_empty_candidates_pass_draft_through() {
        let draft = "Insufficient information found to answer the question.";
        let (answer, citations) = cite(draft, &[], Language::English);
        assert_eq!(answer, draft);
        assert!(citations.is_empty());
    }

    // ====== Summary Tests ======

    #[test]
    fn test_summary_groups_pages_by_file() {
        let candidates = vec![
            candidate("c1", "guide.pdf", 3, 0.9),
            candidate("c2", "guide.pdf", 5, 0.8),
            candidate("c3", "rules.pdf", 7, 0.7),
        ];
        let (_, citations) = cite("answer", &candidates, Language::English);
        assert_eq!(
            citation_summary(&citations),
            "guide.pdf (pages 3, 5); rules.pdf (pages 7)"
        );
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(citation_summary(&[]), "no sources");
    }
}
