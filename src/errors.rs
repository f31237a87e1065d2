use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocuRagError {
    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    #[error("Stage `{stage}` timed out after {timeout_ms} ms")]
    StageTimeout { stage: &'static str, timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Malformed query state: {0}")]
    MalformedState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl DocuRagError {
    /// Whether the failure is safe to retry with backoff.
    ///
    /// Timeouts, rate limits and connection-level failures are transient;
    /// provider rejections (bad auth, bad request) and contract violations
    /// are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientProvider(_) | Self::StageTimeout { .. } | Self::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DocuRagError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ====== Transient Classification Tests ======

    #[test]
    fn test_transient_variants_are_retryable() {
        assert!(DocuRagError::TransientProvider("rate limited".to_string()).is_transient());
        assert!(DocuRagError::StageTimeout {
            stage: "retrieval",
            timeout_ms: 30_000
        }
        .is_transient());
        assert!(DocuRagError::Http("connection reset".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_variants_are_not_retryable() {
        assert!(!DocuRagError::Embedding("invalid api key".to_string()).is_transient());
        assert!(!DocuRagError::Completion("model not found".to_string()).is_transient());
        assert!(!DocuRagError::Store("index corrupt".to_string()).is_transient());
        assert!(!DocuRagError::MalformedState("cited before answered".to_string()).is_transient());
        assert!(!DocuRagError::Config("top_k must be positive".to_string()).is_transient());
    }

    // ====== Display Tests ======

    #[test]
    fn test_error_display_includes_context() {
        let err = DocuRagError::StageTimeout {
            stage: "synthesis",
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "Stage `synthesis` timed out after 5000 ms");

        let err = DocuRagError::MalformedState("answered flag set without draft".to_string());
        assert!(err.to_string().contains("Malformed query state"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let err: DocuRagError = io_err.into();
        assert!(matches!(err, DocuRagError::Io(_)));
        assert!(!err.is_transient());
    }
}
