use thiserror::Error;

/// Errors returned by the AI completion client.
///
/// Every variant is recoverable: callers fall back to the local result.
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key is configured.
    #[error("AI provider not configured")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider returned status {0}")]
    Status(u16),

    /// Still rate limited after the single backoff retry.
    #[error("AI provider rate limited after {retry_after_secs}s backoff")]
    RateLimited { retry_after_secs: u64 },

    #[error("AI provider returned an empty completion")]
    EmptyResponse,

    #[error("could not parse AI response: {0}")]
    Parse(String),
}
