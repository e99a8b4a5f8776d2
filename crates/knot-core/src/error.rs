use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigOutOfRange,
    WeightBudgetExceeded,
    PromptTemplateInvalid,
    LlmSettingsInvalid,
    InputParseError,
    EmbeddingDimensionMismatch,
    JudgeMissing,
    JudgeRateLimited,
    JudgeTimeout,
    JudgeUnavailable,
    JudgeRejected,
    Cancelled,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigOutOfRange => "E1002",
            Self::WeightBudgetExceeded => "E1003",
            Self::PromptTemplateInvalid => "E1004",
            Self::LlmSettingsInvalid => "E1005",
            Self::InputParseError => "E2001",
            Self::EmbeddingDimensionMismatch => "E2002",
            Self::JudgeMissing => "E3001",
            Self::JudgeRateLimited => "E3002",
            Self::JudgeTimeout => "E3003",
            Self::JudgeUnavailable => "E3004",
            Self::JudgeRejected => "E3005",
            Self::Cancelled => "E4001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigOutOfRange => "Config value out of range",
            Self::WeightBudgetExceeded => "Fusion weights exceed 1.0",
            Self::PromptTemplateInvalid => "Contrastive prompt template invalid",
            Self::LlmSettingsInvalid => "LLM settings invalid",
            Self::InputParseError => "Input file parse error",
            Self::EmbeddingDimensionMismatch => "Embedding dimension mismatch",
            Self::JudgeMissing => "Relatedness judge not configured",
            Self::JudgeRateLimited => "Relatedness judge rate limited",
            Self::JudgeTimeout => "Relatedness judge timed out",
            Self::JudgeUnavailable => "Relatedness judge unavailable",
            Self::JudgeRejected => "Relatedness judge rejected request",
            Self::Cancelled => "Inference cancelled",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in knot.toml and retry."),
            Self::ConfigOutOfRange => Some("Thresholds and weights must lie in [0, 1]."),
            Self::WeightBudgetExceeded => {
                Some("Lower project_weight or schema_weight so their sum is at most 1.0.")
            }
            Self::PromptTemplateInvalid => {
                Some("Include both {text_a} and {text_b} placeholders in the template.")
            }
            Self::LlmSettingsInvalid => Some("Set llm.concurrency and llm.timeout_secs to at least 1."),
            Self::InputParseError => Some("Objects must be a JSON array or JSON Lines file."),
            Self::EmbeddingDimensionMismatch => {
                Some("Regenerate embeddings for both objects with the same model.")
            }
            Self::JudgeMissing => {
                Some("Pass a judge to infer_with_judge or disable use_contrastive_icl.")
            }
            Self::JudgeRateLimited => Some("Lower llm.concurrency or raise llm.initial_backoff_ms."),
            Self::JudgeTimeout => Some("Raise llm.timeout_secs or check the model endpoint."),
            Self::JudgeUnavailable => Some("Check network access and the llm.base_url setting."),
            Self::JudgeRejected => Some("Check the API key environment variable and model name."),
            Self::Cancelled => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::ConfigOutOfRange,
            ErrorCode::WeightBudgetExceeded,
            ErrorCode::PromptTemplateInvalid,
            ErrorCode::LlmSettingsInvalid,
            ErrorCode::InputParseError,
            ErrorCode::EmbeddingDimensionMismatch,
            ErrorCode::JudgeMissing,
            ErrorCode::JudgeRateLimited,
            ErrorCode::JudgeTimeout,
            ErrorCode::JudgeUnavailable,
            ErrorCode::JudgeRejected,
            ErrorCode::Cancelled,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::WeightBudgetExceeded.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::Cancelled.to_string(), "E4001");
    }
}
