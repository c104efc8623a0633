//! Error types for the consulta agent.

use thiserror::Error;

/// Main error type for consulta operations.
#[derive(Error, Debug)]
pub enum ConsultaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Language service error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors from the external NLU/NLG service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Empty response from model")]
    EmptyResponse,
}

/// Errors raised by the request pipeline stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The NLU response could not be parsed as an intent, even after
    /// brace recovery.
    #[error("Failed to parse intent from model response: {0}")]
    IntentParse(String),

    /// The NLG call failed or produced empty query text.
    #[error("Query synthesis failed: {0}")]
    Synthesis(String),

    /// The safety validator rejected the candidate. Carries the specific
    /// policy reason, never a generic denial.
    #[error("Query rejected by safety policy: {0}")]
    ValidationRejected(String),

    /// The dispatcher was invoked without an accepted verdict. Unreachable
    /// in correct wiring; fatal to the request.
    #[error("Dispatcher invoked without a validated query")]
    PolicyViolation,
}

/// Errors from the SQL and API execution backends.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution timed out after {0}s")]
    Timeout(u64),

    #[error("Unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("Connection pool error: {0}")]
    Pool(String),
}

/// Result type alias for consulta operations.
pub type Result<T> = std::result::Result<T, ConsultaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_carries_reason() {
        let err = ConsultaError::Pipeline(PipelineError::ValidationRejected(
            "blocked keyword: DROP".to_string(),
        ));
        assert!(err.to_string().contains("DROP"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConsultaError = io_err.into();
        assert!(matches!(err, ConsultaError::Io(_)));
    }

    #[test]
    fn test_backend_timeout_display() {
        let err = BackendError::Timeout(30);
        assert_eq!(err.to_string(), "Execution timed out after 30s");
    }
}
