//! Per-query pipeline state

use serde::Serialize;
use uuid::Uuid;

use crate::models::Candidate;
use crate::models::Citation;
use crate::pipeline::language::Language;

/// Pipeline stages in execution order, plus the two terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Retrieving,
    Synthesizing,
    Citing,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Retrieving => "retrieving",
            Stage::Synthesizing => "synthesizing",
            Stage::Citing => "citing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// Per-stage completion markers. Transitions are monotonic: false to true,
/// never reset. The next stage to run is a pure function of this set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub retrieved: bool,
    pub answered: bool,
    pub cited: bool,
}

impl StageFlags {
    /// The fixed transition table: first unfinished stage wins.
    #[must_use]
    pub fn next_stage(&self) -> Stage {
        if !self.retrieved {
            Stage::Retrieving
        } else if !self.answered {
            Stage::Synthesizing
        } else if !self.cited {
            Stage::Citing
        } else {
            Stage::Done
        }
    }
}

/// Terminal failure details preserved on the query state.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub stage: &'static str,
    pub message: String,
    pub attempts: u32,
}

/// The shared per-query record the orchestrator drives through the pipeline.
///
/// Owned exclusively by the orchestrator while a query is in flight;
/// returned to the caller at a terminal stage. Stage outputs are written
/// once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub query_id: Uuid,
    pub session_id: String,
    pub query_text: String,
    pub detected_language: Option<Language>,
    pub candidates: Vec<Candidate>,
    pub draft_answer: Option<String>,
    pub final_answer: Option<String>,
    pub citations: Vec<Citation>,
    pub flags: StageFlags,
    pub error: Option<FailureRecord>,
    stage: Stage,
}

impl QueryState {
    #[must_use]
    pub fn new(session_id: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            session_id: session_id.into(),
            query_text: query_text.into(),
            detected_language: None,
            candidates: Vec::new(),
            draft_answer: None,
            final_answer: None,
            citations: Vec::new(),
            flags: StageFlags::default(),
            error: None,
            stage: Stage::Init,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Record a terminal failure, keeping every field populated so far.
    pub(crate) fn fail(&mut self, record: FailureRecord) {
        self.stage = Stage::Failed;
        self.error = Some(record);
    }

    /// Map the terminal state onto the caller-facing status.
    ///
    /// A failed run still counts as degraded when retrieval produced
    /// candidates a caller could render.
    #[must_use]
    pub fn status(&self) -> AskStatus {
        match self.stage {
            Stage::Failed => {
                if self.candidates.is_empty() {
                    AskStatus::Error
                } else {
                    AskStatus::Degraded
                }
            }
            _ => AskStatus::Ok,
        }
    }
}

/// Caller-facing outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AskStatus {
    Ok,
    Degraded,
    Error,
}

/// Structured result of [`ask`](crate::pipeline::Orchestrator::ask).
///
/// Always returned, never an exception: failures show up as `status` plus
/// whatever fields survived.
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub final_answer: Option<String>,
    pub citations: Vec<Citation>,
    pub detected_language: Option<Language>,
    pub status: AskStatus,
}

impl AskResult {
    #[must_use]
    pub fn from_state(state: &QueryState) -> Self {
        // A degraded run may have a draft the citation stage never sealed.
        let final_answer = state
            .final_answer
            .clone()
            .or_else(|| state.draft_answer.clone());
        Self {
            final_answer,
            citations: state.citations.clone(),
            detected_language: state.detected_language,
            status: state.status(),
        }
    }

    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Status: {:?}\n\n", self.status));
        if let Some(language) = self.detected_language {
            output.push_str(&format!("Language: {language}\n\n"));
        }
        match &self.final_answer {
            Some(answer) => output.push_str(&format!("Answer:\n{answer}\n\n")),
            None => output.push_str("Answer: <none>\n\n"),
        }
        output.push_str(&format!("Citations ({}):\n", self.citations.len()));
        for (idx, citation) in self.citations.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} (page {}, score {:.2})\n",
                idx + 1,
                citation.source_file,
                citation.page_number,
                citation.relevance_score
            ));
        }
        output
    }
}
