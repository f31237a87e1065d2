//! Question-answering pipeline
//!
//! This module drives a query end to end over an ingested document corpus:
//! - Candidate retrieval with similarity scoring and near-duplicate dedup
//! - Draft answer synthesis in the query's language
//! - Citation attribution with a per-language sources footer
//! - Bounded per-session conversation memory
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docurag::config::AppConfig;
//! use docurag::pipeline::Orchestrator;
//! use docurag::store::InMemoryVectorStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let store = Arc::new(InMemoryVectorStore::new());
//!     let orchestrator = Orchestrator::from_config(&config, store)?;
//!
//!     let result = orchestrator
//!         .ask("session-1", "What is the maximum grant amount?")
//!         .await;
//!     println!("{}", result.format());
//!
//!     Ok(())
//! }
//! ```

pub mod citation;
pub mod language;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;
pub mod state;
pub mod synthesis;

pub use language::Language;
pub use orchestrator::Orchestrator;
pub use orchestrator::PipelineOptions;
pub use retrieval::RetrievalOptions;
pub use retrieval::RetrievalStage;
pub use state::AskResult;
pub use state::AskStatus;
pub use state::FailureRecord;
pub use state::QueryState;
pub use state::Stage;
pub use state::StageFlags;
pub use synthesis::SynthesisOptions;
pub use synthesis::SynthesisStage;
