//! Stage sequencing, retry, timeout, and resume

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::errors::{DocuRagError, Result};
use crate::models::Turn;
use crate::pipeline::citation;
use crate::pipeline::language::Language;
use crate::pipeline::retrieval::{RetrievalOptions, RetrievalStage};
use crate::pipeline::state::{AskResult, FailureRecord, QueryState, Stage};
use crate::pipeline::synthesis::{SynthesisOptions, SynthesisStage};
use crate::providers::{
    provider_from_config, CompletionConstraints, CompletionProvider, EmbeddingProvider,
};
use crate::session::SessionStore;
use crate::store::VectorStore;

/// Stage scheduling knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Timeout applied to each attempt of a stage with external calls.
    pub stage_timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Backoff before the first retry, doubled for each one after.
    pub retry_backoff: Duration,
    /// How many recent turns the synthesis prompt may see.
    pub history_turns: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_millis(30_000),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            history_turns: 5,
        }
    }
}

/// Drives queries through retrieval, synthesis, and citing.
///
/// The orchestrator owns the stage instances and the session store; it is
/// cheap to share behind an `Arc` and safe to call from concurrent tasks.
pub struct Orchestrator {
    retrieval: RetrievalStage,
    synthesis: SynthesisStage,
    sessions: Arc<SessionStore>,
    options: PipelineOptions,
}

impl Orchestrator {
    /// Build an orchestrator from configuration, inferring the provider
    /// backend from the configured endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig, store: Arc<dyn VectorStore>) -> Result<Self> {
        let (embedder, completer) = provider_from_config(config)?;
        Ok(Self::from_services(embedder, completer, store, config))
    }

    /// Build an orchestrator around explicit provider implementations.
    #[must_use]
    pub fn from_services(
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        store: Arc<dyn VectorStore>,
        config: &AppConfig,
    ) -> Self {
        let retrieval_options = RetrievalOptions {
            top_k: config.retrieval.top_k,
            similarity_threshold: config.retrieval.similarity_threshold,
            min_distinct_sources: config.retrieval.min_distinct_sources,
            near_duplicate_overlap: config.retrieval.near_duplicate_overlap,
            smalltalk_gate: config.retrieval.smalltalk_gate,
        };
        let synthesis_options = SynthesisOptions {
            max_context_chars: config.synthesis.max_context_chars,
            history_turns: config.synthesis.history_turns,
            constraints: CompletionConstraints {
                max_tokens: config.synthesis.max_tokens,
                temperature: config.synthesis.temperature,
            },
        };
        let options = PipelineOptions {
            stage_timeout: config.stage_timeout(),
            max_retries: config.max_retries(),
            retry_backoff: config.retry_backoff(),
            history_turns: config.synthesis.history_turns,
        };
        Self {
            retrieval: RetrievalStage::new(embedder, store, retrieval_options),
            synthesis: SynthesisStage::new(completer, synthesis_options),
            sessions: Arc::new(SessionStore::new(config.max_history())),
            options,
        }
    }

    /// Get the session store shared by this orchestrator
    #[must_use]
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// Answer a query within a session.
    ///
    /// Never fails: pipeline errors are folded into the result's `status`
    /// along with whatever the pipeline produced before failing.
    pub async fn ask(&self, session_id: &str, query_text: &str) -> AskResult {
        let state = self.run(session_id, query_text).await;
        AskResult::from_state(&state)
    }

    /// Run a fresh query to a terminal stage and return the full state.
    ///
    /// Operational failures are recorded on the state, never returned as
    /// `Err`; callers inspect `error` and `status()`.
    pub async fn run(&self, session_id: &str, query_text: &str) -> QueryState {
        let mut state = QueryState::new(session_id, query_text);
        info!(
            "Processing query {} for session {}",
            state.query_id, state.session_id
        );
        self.drive(&mut state).await;
        state
    }

    /// Resume a previously recorded state from where it left off.
    ///
    /// Completed stages are skipped based on the progress flags; a failed
    /// state has its error cleared and is retried from the first incomplete
    /// stage. A completed state is returned unchanged, with no second
    /// history append.
    ///
    /// # Errors
    ///
    /// Returns `MalformedState` when the flags claim progress the payload
    /// fields do not back up.
    pub async fn resume(&self, mut state: QueryState) -> Result<QueryState> {
        validate_resumable(&state)?;
        if state.stage() == Stage::Done {
            return Ok(state);
        }
        if state.stage() == Stage::Failed {
            info!(
                "Resuming failed query {} at stage {}",
                state.query_id,
                state.flags.next_stage().as_str()
            );
            state.error = None;
        }
        self.drive(&mut state).await;
        Ok(state)
    }

    /// Advance the state machine until a terminal stage is reached.
    ///
    /// The next stage is always derived from the progress flags, never from
    /// the recorded stage, so re-driving a partial state repeats no work.
    async fn drive(&self, state: &mut QueryState) {
        loop {
            match state.flags.next_stage() {
                Stage::Retrieving => {
                    state.enter(Stage::Retrieving);
                    debug!("Step 1: Retrieving candidates");
                    let history = self.sessions.recent_history(&state.session_id, 1);
                    let outcome = self
                        .with_retry("retrieving", || {
                            self.retrieval.retrieve(&state.query_text, &history)
                        })
                        .await;
                    match outcome {
                        Ok(candidates) => {
                            info!(
                                "Query {} retrieved {} candidates",
                                state.query_id,
                                candidates.len()
                            );
                            state.candidates = candidates;
                            state.flags.retrieved = true;
                        }
                        Err(record) => {
                            error!(
                                "Query {} failed while {}: {}",
                                state.query_id, record.stage, record.message
                            );
                            state.fail(record);
                            return;
                        }
                    }
                }
                Stage::Synthesizing => {
                    state.enter(Stage::Synthesizing);
                    debug!("Step 2: Synthesizing draft answer");
                    let history = self
                        .sessions
                        .recent_history(&state.session_id, self.options.history_turns);
                    let outcome = self
                        .with_retry("synthesizing", || {
                            self.synthesis
                                .synthesize(&state.query_text, &state.candidates, &history)
                        })
                        .await;
                    match outcome {
                        Ok(output) => {
                            state.draft_answer = Some(output.draft_answer);
                            state.detected_language = Some(output.detected_language);
                            state.flags.answered = true;
                        }
                        Err(record) => {
                            error!(
                                "Query {} failed while {}: {}",
                                state.query_id, record.stage, record.message
                            );
                            state.fail(record);
                            return;
                        }
                    }
                }
                Stage::Citing => {
                    state.enter(Stage::Citing);
                    debug!("Step 3: Attributing citations");
                    let Some(draft) = state.draft_answer.clone() else {
                        state.fail(FailureRecord {
                            stage: "citing",
                            message: "no draft answer to cite".to_string(),
                            attempts: 0,
                        });
                        return;
                    };
                    // Pure local work: no timeout or retry applies here.
                    let language = state
                        .detected_language
                        .unwrap_or_else(|| Language::detect(&state.query_text));
                    state.detected_language = Some(language);
                    let (final_answer, citations) =
                        citation::cite(&draft, &state.candidates, language);
                    state.final_answer = Some(final_answer);
                    state.citations = citations;
                    state.flags.cited = true;
                }
                Stage::Done => {
                    state.enter(Stage::Done);
                    self.record_turn(state);
                    info!(
                        "Query {} completed: {}",
                        state.query_id,
                        citation::citation_summary(&state.citations)
                    );
                    return;
                }
                // next_stage only ever yields the four stages handled above
                Stage::Init | Stage::Failed => return,
            }
        }
    }

    /// Run one stage operation with per-attempt timeout and transient retry.
    async fn with_retry<T, F, Fut>(
        &self,
        stage: &'static str,
        operation: F,
    ) -> std::result::Result<T, FailureRecord>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 1;
        let mut backoff = self.options.retry_backoff;
        loop {
            let outcome = tokio::time::timeout(self.options.stage_timeout, operation()).await;
            let err = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => DocuRagError::StageTimeout {
                    stage,
                    timeout_ms: u64::try_from(self.options.stage_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                },
            };
            if err.is_transient() && attempt <= self.options.max_retries {
                warn!(
                    "Stage {} attempt {} failed: {}, retrying in {:?}",
                    stage, attempt, err, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            } else {
                return Err(FailureRecord {
                    stage,
                    message: err.to_string(),
                    attempts: attempt,
                });
            }
        }
    }

    /// Append the completed exchange to the session, oldest turns evicted
    /// first by the store's bound.
    fn record_turn(&self, state: &QueryState) {
        let Some(answer) = state.final_answer.clone() else {
            return;
        };
        let turn = Turn::new(state.query_text.clone(), answer, state.citations.clone());
        self.sessions.append_turn(&state.session_id, turn);
    }
}

fn validate_resumable(state: &QueryState) -> Result<()> {
    let flags = &state.flags;
    if flags.answered && !flags.retrieved {
        return Err(DocuRagError::MalformedState(
            "answered flag set without retrieval".to_string(),
        ));
    }
    if flags.cited && !flags.answered {
        return Err(DocuRagError::MalformedState(
            "cited flag set without an answer".to_string(),
        ));
    }
    if flags.answered && state.draft_answer.is_none() {
        return Err(DocuRagError::MalformedState(
            "answered flag set but draft answer missing".to_string(),
        ));
    }
    if flags.cited && state.final_answer.is_none() {
        return Err(DocuRagError::MalformedState(
            "cited flag set but final answer missing".to_string(),
        ));
    }
    Ok(())
}
