//! Error types for the analysis runner.
//!
//! Uses `thiserror` for typed errors that surface through the runner
//! pipeline: configuration, prompt rendering, LLM calls and request
//! validation. Parsing never errors; malformed text degrades to partial
//! artifacts instead.

/// Errors that can occur during analysis runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM backend rejected the call because its quota is exhausted.
    #[error("LLM backend rate limited: {0}")]
    RateLimited(String),

    /// The analysis request is structurally invalid.
    #[error("invalid analysis request: {0}")]
    InvalidRequest(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
