//! Draft answer synthesis over the selected candidates

use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::models::Candidate;
use crate::models::Turn;
use crate::pipeline::language::Language;
use crate::pipeline::prompts::build_answer_prompt;
use crate::providers::{CompletionConstraints, CompletionProvider};

/// Tuning knobs for prompt assembly and generation.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub max_context_chars: usize,
    pub history_turns: usize,
    pub constraints: CompletionConstraints,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
            history_turns: 5,
            constraints: CompletionConstraints::default(),
        }
    }
}

/// What synthesis produced for a query.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub draft_answer: String,
    pub detected_language: Language,
}

/// Produces a draft answer from candidates, recent history, and the query.
pub struct SynthesisStage {
    completer: Arc<dyn CompletionProvider>,
    options: SynthesisOptions,
}

impl SynthesisStage {
    /// Create a new synthesis stage
    pub fn new(completer: Arc<dyn CompletionProvider>, options: SynthesisOptions) -> Self {
        Self { completer, options }
    }

    /// Synthesize a draft answer in the query's language.
    ///
    /// With no candidates the canonical insufficient-information answer is
    /// returned directly and the completion provider is never called.
    ///
    /// # Errors
    ///
    /// Propagates completion provider failures.
    pub async fn synthesize(
        &self,
        query: &str,
        candidates: &[Candidate],
        history: &[Turn],
    ) -> Result<SynthesisOutput> {
        let language = Language::detect(query);
        debug!("Detected query language: {}", language);

        if candidates.is_empty() {
            debug!("No candidates to synthesize from, returning canonical answer");
            return Ok(SynthesisOutput {
                draft_answer: language.insufficient_information().to_string(),
                detected_language: language,
            });
        }

        let context = build_context_window(candidates, self.options.max_context_chars, language);
        let history_block = format_history(history, self.options.history_turns);
        let prompt = build_answer_prompt(query, &context, &history_block, language);

        debug!(
            "Requesting completion with {} candidates, {} context chars",
            candidates.len(),
            context.chars().count()
        );
        let draft_answer = self
            .completer
            .complete(&prompt, &self.options.constraints)
            .await?;

        Ok(SynthesisOutput {
            draft_answer,
            detected_language: language,
        })
    }
}

/// Greedy context assembly under a character budget.
///
/// Candidates are taken in their given order until the next formatted entry
/// would overflow the budget. If even the first entry overflows, it is
/// truncated rather than dropped so the window is never empty.
fn build_context_window(candidates: &[Candidate], max_chars: usize, language: Language) -> String {
    let mut window = String::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let entry = format!(
            "{} {} - {} ({} {}):\n{}\n---",
            language.document_word(),
            index + 1,
            candidate.chunk.source_file,
            language.page_word(),
            candidate.chunk.page_number,
            candidate.chunk.text
        );
        let entry_chars = entry.chars().count();
        if window.is_empty() {
            if entry_chars > max_chars {
                window = entry.chars().take(max_chars).collect();
                break;
            }
            window = entry;
        } else {
            let window_chars = window.chars().count();
            // Two newlines separate entries.
            if window_chars + 2 + entry_chars > max_chars {
                break;
            }
            window.push_str("\n\n");
            window.push_str(&entry);
        }
    }
    window
}

/// Cap on each stored answer inside the history block, so one verbose turn
/// cannot crowd out the document window.
const HISTORY_ANSWER_PREVIEW_CHARS: usize = 300;

/// Format the most recent turns as alternating question/answer lines.
///
/// Answers are clipped to a fixed preview; the full text stays in the
/// session store.
fn format_history(history: &[Turn], max_turns: usize) -> String {
    let skip = history.len().saturating_sub(max_turns);
    history
        .iter()
        .skip(skip)
        .map(|turn| {
            format!(
                "Q: {}\nA: {}",
                turn.query_text,
                answer_preview(&turn.final_answer)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn answer_preview(answer: &str) -> String {
    if answer.chars().count() <= HISTORY_ANSWER_PREVIEW_CHARS {
        return answer.to_string();
    }
    let mut preview: String = answer
        .chars()
        .take(HISTORY_ANSWER_PREVIEW_CHARS)
        .collect();
    preview.push_str("...");
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoCompleter;

    #[async_trait]
    impl CompletionProvider for EchoCompleter {
        async fn complete(
            &self,
            prompt: &str,
            _constraints: &CompletionConstraints,
        ) -> Result<String> {
            Ok(format!("echo({})", prompt.len()))
        }
    }

    struct RefusingCompleter;

    #[async_trait]
    impl CompletionProvider for RefusingCompleter {
        async fn complete(
            &self,
            _prompt: &str,
            _constraints: &CompletionConstraints,
        ) -> Result<String> {
            panic!("completion provider must not be called");
        }
    }

    #[derive(Default)]
    struct CapturingCompleter {
        prompt: Mutex<String>,
    }

    impl CapturingCompleter {
        fn prompt(&self) -> String {
            self.prompt.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for CapturingCompleter {
        async fn complete(
            &self,
            prompt: &str,
            _constraints: &CompletionConstraints,
        ) -> Result<String> {
            *self.prompt.lock().unwrap() = prompt.to_string();
            Ok("draft".to_string())
        }
    }

    fn candidate(id: &str, source: &str, page: u32, text: &str) -> Candidate {
        Candidate::new(
            Arc::new(DocumentChunk::new(id, source, page, text, vec![1.0])),
            0.9,
        )
    }

    // ====== Context Window Tests ======

    #[test]
    fn test_context_window_formats_entries() {
        let candidates = vec![
            candidate("c1", "guide.pdf", 3, "Grants are capped at 60000 EUR."),
            candidate("c2", "rules.pdf", 7, "Deadlines fall at the end of March."),
        ];
        let window = build_context_window(&candidates, 10_000, Language::English);
        assert!(window.starts_with("Document 1 - guide.pdf (Page 3):\n"));
        assert!(window.contains("Document 2 - rules.pdf (Page 7):\n"));
        assert!(window.contains("Grants are capped at 60000 EUR.\n---"));
    }

    #[test]
    fn test_context_window_stops_at_budget() {
        let candidates = vec![
            candidate("c1", "a.pdf", 1, "short first passage"),
            candidate("c2", "b.pdf", 1, "second passage that will not fit"),
        ];
        let first_len = build_context_window(&candidates[..1], 10_000, Language::English)
            .chars()
            .count();
        let window = build_context_window(&candidates, first_len + 1, Language::English);
        assert!(window.contains("a.pdf"));
        assert!(!window.contains("b.pdf"));
    }

    #[test]
    fn test_oversized_first_entry_is_truncated_not_dropped() {
        let candidates = vec![candidate("c1", "a.pdf", 1, &"x".repeat(500))];
        let window = build_context_window(&candidates, 40, Language::English);
        assert!(!window.is_empty());
        assert_eq!(window.chars().count(), 40);
    }

    #[test]
    fn test_context_window_uses_query_language() {
        let candidates = vec![candidate("c1", "rehber.pdf", 2, "Hibe üst sınırı 60000 EUR.")];
        let window = build_context_window(&candidates, 10_000, Language::Turkish);
        assert!(window.starts_with("Belge 1 - rehber.pdf (Sayfa 2):\n"));
    }

    // ====== History Formatting Tests ======

    #[test]
    fn test_history_formats_question_answer_pairs() {
        let history = vec![
            Turn::new("What is the budget?", "50000 EUR.", vec![]),
            Turn::new("And the deadline?", "End of March.", vec![]),
        ];
        let block = format_history(&history, 5);
        assert_eq!(
            block,
            "Q: What is the budget?\nA: 50000 EUR.\nQ: And the deadline?\nA: End of March."
        );
    }

    #[test]
    fn test_history_keeps_only_most_recent_turns() {
        let history: Vec<Turn> = (0..6)
            .map(|i| Turn::new(format!("q{i}"), format!("a{i}"), vec![]))
            .collect();
        let block = format_history(&history, 2);
        assert!(!block.contains("q3"));
        assert!(block.contains("q4"));
        assert!(block.contains("q5"));
    }

    #[test]
    fn test_empty_history_formats_empty() {
        assert_eq!(format_history(&[], 5), "");
    }

    #[test]
    fn test_history_answers_clip_to_preview() {
        let history = vec![Turn::new("What is the budget?", "x".repeat(2_000), vec![])];
        let block = format_history(&history, 5);
        assert_eq!(
            block,
            format!("Q: What is the budget?\nA: {}...", "x".repeat(300))
        );
    }

    #[test]
    fn test_short_history_answers_are_kept_whole() {
        let history = vec![Turn::new("What is the budget?", "50000 EUR.", vec![])];
        let block = format_history(&history, 5);
        assert_eq!(block, "Q: What is the budget?\nA: 50000 EUR.");
    }

    // ====== Synthesis Tests ======

    #[tokio::test]
    async fn test_empty_candidates_skip_the_provider() {
        let stage = SynthesisStage::new(Arc::new(RefusingCompleter), SynthesisOptions::default());
        let output = stage
            .synthesize("What is the maximum grant amount?", &[], &[])
            .await
            .unwrap();
        assert_eq!(
            output.draft_answer,
            "Insufficient information found to answer the question."
        );
        assert_eq!(output.detected_language, Language::English);
    }

    #[tokio::test]
    async fn test_empty_candidates_answer_in_query_language() {
        let stage = SynthesisStage::new(Arc::new(RefusingCompleter), SynthesisOptions::default());
        let output = stage
            .synthesize("Hibe başvuru süreci nedir bilmiyorum", &[], &[])
            .await
            .unwrap();
        assert_eq!(output.draft_answer, "Yanıtlamak için yeterli bilgi bulunamadı.");
        assert_eq!(output.detected_language, Language::Turkish);
    }

    #[tokio::test]
    async fn test_verbose_history_cannot_crowd_the_prompt() {
        let completer = Arc::new(CapturingCompleter::default());
        let stage = SynthesisStage::new(completer.clone(), SynthesisOptions::default());
        let long_answer = "x".repeat(50_000);
        let history = vec![Turn::new("What is the budget?", long_answer.clone(), vec![])];
        let candidates = vec![candidate("c1", "guide.pdf", 1, "Grants are capped.")];

        stage
            .synthesize("What is the maximum grant amount?", &candidates, &history)
            .await
            .unwrap();

        let prompt = completer.prompt();
        assert!(!prompt.contains(&long_answer));
        // Template + one context entry + the clipped history stay small.
        assert!(prompt.chars().count() < 2_000);
    }

    #[tokio::test]
    async fn test_synthesis_calls_provider_with_candidates() {
        let stage = SynthesisStage::new(Arc::new(EchoCompleter), SynthesisOptions::default());
        let candidates = vec![candidate("c1", "guide.pdf", 1, "Grants are capped.")];
        let output = stage
            .synthesize("What is the maximum grant amount?", &candidates, &[])
            .await
            .unwrap();
        assert!(output.draft_answer.starts_with("echo("));
        assert_eq!(output.detected_language, Language::English);
    }
}
