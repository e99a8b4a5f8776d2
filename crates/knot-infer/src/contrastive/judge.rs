use async_trait::async_trait;
use knot_core::error::ErrorCode;

/// Anything that can answer a relatedness prompt with free text.
///
/// Implementations should return the raw model reply; parsing is done by the
/// caller. Transport failures map onto [`JudgeError`] so the caller can decide
/// whether to retry.
#[async_trait]
pub trait RelatednessJudge: Send + Sync {
    /// Short identifier for logs (model name, fake name).
    fn name(&self) -> &str;

    /// Send `prompt` and return the reply text.
    async fn classify(&self, prompt: &str) -> Result<String, JudgeError>;
}

/// Failure of a single judge call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgeError {
    /// HTTP 429 or equivalent. `retry_after_ms` is honoured when present.
    #[error("judge rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("judge call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Transient transport or server failure.
    #[error("judge unavailable: {0}")]
    Unavailable(String),

    /// Non-retryable refusal (bad key, unknown model, malformed request).
    #[error("judge rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The reply could not be read.
    #[error("malformed judge reply: {0}")]
    Malformed(String),

    /// Judge could not be constructed from settings.
    #[error("judge not configured: {0}")]
    NotConfigured(String),
}

impl JudgeError {
    /// Rate limits and transient outages are retried; everything else is final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unavailable(_))
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RateLimited { .. } => ErrorCode::JudgeRateLimited,
            Self::Timeout { .. } => ErrorCode::JudgeTimeout,
            Self::Unavailable(_) => ErrorCode::JudgeUnavailable,
            Self::Rejected { .. } | Self::Malformed(_) => ErrorCode::JudgeRejected,
            Self::NotConfigured(_) => ErrorCode::LlmSettingsInvalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_retry() {
        assert!(JudgeError::RateLimited { retry_after_ms: None }.is_retryable());
        assert!(JudgeError::Unavailable("503".into()).is_retryable());
        assert!(!JudgeError::Timeout { secs: 30 }.is_retryable());
        assert!(
            !JudgeError::Rejected {
                status: 401,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!JudgeError::Malformed("empty".into()).is_retryable());
    }

    #[test]
    fn codes_map_to_judge_family() {
        assert_eq!(JudgeError::Timeout { secs: 1 }.code().code(), "E3003");
        assert_eq!(
            JudgeError::RateLimited { retry_after_ms: Some(10) }.code(),
            ErrorCode::JudgeRateLimited
        );
    }
}
