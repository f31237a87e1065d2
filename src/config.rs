use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Base URL of the embedding/LLM backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key; the literal value "ollama" selects the local adapter.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_api_key() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_completion_model() -> String {
    "llama3.2".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum similarity score a hit must reach; must lie in [0, 1].
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Below this many distinct source files, near-duplicate chunks are
    /// kept rather than deduplicated.
    #[serde(default = "default_min_distinct_sources")]
    pub min_distinct_sources: usize,
    /// Word-overlap ratio at or above which two chunks from the same source
    /// count as near-identical; must lie in [0, 1].
    #[serde(default = "default_near_duplicate_overlap")]
    pub near_duplicate_overlap: f32,
    /// Route greeting-only queries straight to the canonical response
    /// without touching the store.
    #[serde(default = "default_smalltalk_gate")]
    pub smalltalk_gate: bool,
}

fn default_top_k() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.5
}

fn default_min_distinct_sources() -> usize {
    2
}

fn default_near_duplicate_overlap() -> f32 {
    0.8
}

fn default_smalltalk_gate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Character budget for the document context window in the prompt.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// How many recent turns of session history the prompt carries.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_context_chars() -> usize {
    12_000
}

fn default_history_turns() -> usize {
    5
}

fn default_max_tokens() -> usize {
    1024
}

fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Timeout applied to each stage attempt.
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,
    /// Retries after the first attempt, per stage.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry; doubled on each subsequent retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_stage_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Hard cap on turns kept per session; oldest turns are evicted first.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse as TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default config file path
    ///
    /// Tries `config.toml` first, then falls back to `config.example.toml`,
    /// then to built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation.
    pub fn load() -> crate::Result<Self> {
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Ok(Self::default())
        }
    }

    /// Check all recognized options for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns `Config` errors naming the offending option.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(crate::DocuRagError::Config(format!(
                "similarity_threshold must lie in [0, 1], got {}",
                self.retrieval.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.near_duplicate_overlap) {
            return Err(crate::DocuRagError::Config(format!(
                "near_duplicate_overlap must lie in [0, 1], got {}",
                self.retrieval.near_duplicate_overlap
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(crate::DocuRagError::Config(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.session.max_history == 0 {
            return Err(crate::DocuRagError::Config(
                "max_history must be at least 1".to_string(),
            ));
        }
        if Url::parse(&self.providers.endpoint).is_err() {
            return Err(crate::DocuRagError::Config(format!(
                "providers.endpoint is not a valid URL: {}",
                self.providers.endpoint
            )));
        }
        Ok(())
    }

    /// Get provider base endpoint
    pub fn provider_endpoint(&self) -> &str {
        &self.providers.endpoint
    }

    /// Get provider API key
    pub fn provider_api_key(&self) -> &str {
        &self.providers.api_key
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.providers.embedding_model
    }

    /// Get completion model name
    pub fn completion_model(&self) -> &str {
        &self.providers.completion_model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.providers.embedding_dimension
    }

    /// Get retrieval fan-out
    pub fn top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Get minimum similarity score
    pub fn similarity_threshold(&self) -> f32 {
        self.retrieval.similarity_threshold
    }

    /// Get per-stage timeout
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline.stage_timeout_ms)
    }

    /// Get retry budget per stage
    pub fn max_retries(&self) -> u32 {
        self.pipeline.max_retries
    }

    /// Get base retry backoff
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.pipeline.retry_backoff_ms)
    }

    /// Get session history bound
    pub fn max_history(&self) -> usize {
        self.session.max_history
    }

    /// Get log level
    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            embedding_model: default_embedding_model(),
            completion_model: default_completion_model(),
            embedding_dimension: default_embedding_dimension(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            min_distinct_sources: default_min_distinct_sources(),
            near_duplicate_overlap: default_near_duplicate_overlap(),
            smalltalk_gate: default_smalltalk_gate(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            history_turns: default_history_turns(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: default_stage_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            retrieval: RetrievalConfig::default(),
            synthesis: SynthesisConfig::default(),
            pipeline: PipelineConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
