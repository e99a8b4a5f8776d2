use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Project file name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "knot.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "KNOT_CONFIG";

/// Default template for the contrastive relatedness judge.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You judge whether two work-tracking records describe related work \
(the same problem, a parent/child split, a follow-up, or a direct dependency).
Answer with exactly one word: RELATED or NOT_RELATED.

{examples}

Now judge this pair.
Record A: {text_a}
Record B: {text_b}
Answer:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// How the canonical member of a duplicate group is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalRule {
    /// First member in caller-supplied input order.
    FirstSeen,
    /// Earliest `created_at`; ties go to the lexicographically smallest id.
    #[default]
    EarliestCreated,
    /// Lexicographically smallest id.
    SmallestId,
}

/// Thresholds, weights and feature toggles for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Gate for pairs where embeddings exist for both objects.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Gate for keyword-only pairs.
    #[serde(default = "default_keyword_overlap_threshold")]
    pub keyword_overlap_threshold: f64,
    /// Run the pairwise scoring stages (fusion, document filter, contrastive).
    #[serde(default = "default_true")]
    pub include_inferred: bool,
    #[serde(default)]
    pub use_semantic_similarity: bool,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_true")]
    pub enable_duplicate_detection: bool,
    #[serde(default)]
    pub duplicate_canonical: CanonicalRule,
    #[serde(default)]
    pub use_project_metadata: bool,
    #[serde(default = "default_project_weight")]
    pub project_weight: f64,
    #[serde(default)]
    pub use_schema_signal: bool,
    #[serde(default = "default_schema_weight")]
    pub schema_weight: f64,
    #[serde(default)]
    pub use_document_threshold: bool,
    #[serde(default = "default_document_threshold")]
    pub document_threshold: f64,
    #[serde(default = "default_min_chunk_matches")]
    pub min_chunk_matches: usize,
    #[serde(default)]
    pub use_contrastive_icl: bool,
    #[serde(default)]
    pub contrastive: ContrastiveConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            keyword_overlap_threshold: default_keyword_overlap_threshold(),
            include_inferred: default_true(),
            use_semantic_similarity: false,
            semantic_weight: default_semantic_weight(),
            enable_duplicate_detection: default_true(),
            duplicate_canonical: CanonicalRule::default(),
            use_project_metadata: false,
            project_weight: default_project_weight(),
            use_schema_signal: false,
            schema_weight: default_schema_weight(),
            use_document_threshold: false,
            document_threshold: default_document_threshold(),
            min_chunk_matches: default_min_chunk_matches(),
            use_contrastive_icl: false,
            contrastive: ContrastiveConfig::default(),
        }
    }
}

/// Example bank, prompt template and model settings for the LLM judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastiveConfig {
    #[serde(default = "default_examples")]
    pub examples: Vec<ContrastiveExample>,
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for ContrastiveConfig {
    fn default() -> Self {
        Self {
            examples: default_examples(),
            prompt_template: default_prompt_template(),
            llm: LlmConfig::default(),
        }
    }
}

/// One worked pair shown to the judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrastiveExample {
    pub text_a: String,
    pub text_b: String,
    pub related: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ContrastiveExample {
    #[must_use]
    pub fn new(text_a: &str, text_b: &str, related: bool, rationale: &str) -> Self {
        Self {
            text_a: text_a.to_string(),
            text_b: text_b.to_string(),
            related,
            rationale: Some(rationale.to_string()),
        }
    }
}

/// Connection and pacing settings for the relatedness judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_llm_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Maximum in-flight judge calls.
    #[serde(default = "default_llm_concurrency")]
    pub concurrency: usize,
    /// Per-record character budget inside the prompt.
    #[serde(default = "default_llm_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_llm_api_key_env(),
            temperature: 0.0,
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
            initial_backoff_ms: default_llm_initial_backoff_ms(),
            max_backoff_ms: default_llm_max_backoff_ms(),
            concurrency: default_llm_concurrency(),
            max_text_chars: default_llm_max_text_chars(),
        }
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A threshold or weight is NaN, infinite, or outside its range.
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Project and schema weights leave a negative budget for semantic+keyword.
    #[error(
        "project_weight ({project_weight}) + schema_weight ({schema_weight}) exceeds 1.0"
    )]
    WeightBudgetExceeded {
        project_weight: f64,
        schema_weight: f64,
    },

    #[error("contrastive prompt template is missing the {0} placeholder")]
    TemplateMissingPlaceholder(&'static str),

    #[error("invalid llm.{field}: {reason}")]
    InvalidLlmSetting {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::OutOfRange { .. } => ErrorCode::ConfigOutOfRange,
            Self::WeightBudgetExceeded { .. } => ErrorCode::WeightBudgetExceeded,
            Self::TemplateMissingPlaceholder(_) => ErrorCode::PromptTemplateInvalid,
            Self::InvalidLlmSetting { .. } => ErrorCode::LlmSettingsInvalid,
        }
    }
}

impl InferenceConfig {
    /// Check every invariant the fusion arithmetic relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint: a threshold or weight outside
    /// `[0, 1]`, a project+schema weight budget above `1.0` when both signals
    /// are enabled, or (when the contrastive stage is enabled) a template
    /// without `{text_a}`/`{text_b}` or zero concurrency/timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("keyword_overlap_threshold", self.keyword_overlap_threshold),
            ("semantic_weight", self.semantic_weight),
            ("project_weight", self.project_weight),
            ("schema_weight", self.schema_weight),
            ("document_threshold", self.document_threshold),
        ] {
            check_range(field, value, 0.0, 1.0)?;
        }

        if self.use_project_metadata
            && self.use_schema_signal
            && self.project_weight + self.schema_weight > 1.0 + f64::EPSILON
        {
            return Err(ConfigError::WeightBudgetExceeded {
                project_weight: self.project_weight,
                schema_weight: self.schema_weight,
            });
        }

        if self.use_contrastive_icl {
            self.contrastive.validate()?;
        }

        Ok(())
    }
}

impl ContrastiveConfig {
    /// # Errors
    ///
    /// Returns an error if the template lacks a record placeholder or the
    /// LLM pacing settings are unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for placeholder in ["{text_a}", "{text_b}"] {
            if !self.prompt_template.contains(placeholder) {
                return Err(ConfigError::TemplateMissingPlaceholder(placeholder));
            }
        }

        let llm = &self.llm;
        if llm.concurrency == 0 {
            return Err(ConfigError::InvalidLlmSetting {
                field: "concurrency",
                reason: "must be at least 1",
            });
        }
        if llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidLlmSetting {
                field: "timeout_secs",
                reason: "must be at least 1",
            });
        }
        if llm.max_text_chars == 0 {
            return Err(ConfigError::InvalidLlmSetting {
                field: "max_text_chars",
                reason: "must be at least 1",
            });
        }
        check_range("llm.temperature", llm.temperature, 0.0, 2.0)
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Load a config file. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(ProjectConfig::default());
    }

    parse_config_file(path)
}

/// Load a config file the caller named explicitly. Unlike [`load_config`],
/// a missing file is an error.
///
/// # Errors
///
/// Returns an error if the file is absent, unreadable, or fails to parse.
pub fn load_required_config(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        anyhow::bail!(
            "{}: Config file not found: {}",
            ErrorCode::ConfigParseError,
            path.display()
        );
    }

    parse_config_file(path)
}

fn parse_config_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("{}: Failed to parse {}", ErrorCode::ConfigParseError, path.display()))
}

/// User-level config location (`$XDG_CONFIG_HOME/knot/config.toml`).
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("knot/config.toml"))
}

/// Pick the config file to load.
///
/// Precedence (highest wins):
/// 1. explicit path (`--config`)
/// 2. `KNOT_CONFIG` value
/// 3. `knot.toml` in `cwd`, when present
/// 4. user config, when present
#[must_use]
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    cwd: &Path,
    user_path: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(value));
    }

    let local = cwd.join(PROJECT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    user_path.filter(|path| path.exists())
}

const fn default_true() -> bool {
    true
}

const fn default_similarity_threshold() -> f64 {
    0.85
}

const fn default_keyword_overlap_threshold() -> f64 {
    0.65
}

const fn default_semantic_weight() -> f64 {
    0.7
}

const fn default_project_weight() -> f64 {
    0.3
}

const fn default_schema_weight() -> f64 {
    0.2
}

const fn default_document_threshold() -> f64 {
    0.25
}

const fn default_min_chunk_matches() -> usize {
    1
}

fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

fn default_examples() -> Vec<ContrastiveExample> {
    vec![
        ContrastiveExample::new(
            "Checkout fails with 502 when cart has more than 50 items",
            "Large carts time out at payment step",
            true,
            "same failure seen from two reports",
        ),
        ContrastiveExample::new(
            "Epic: migrate auth service to OAuth2",
            "Replace session cookies with OAuth2 access tokens in login flow",
            true,
            "child task of the epic",
        ),
        ContrastiveExample::new(
            "Checkout fails with 502 when cart has more than 50 items",
            "Update onboarding copy for the pricing page",
            false,
            "different area and different problem",
        ),
        ContrastiveExample::new(
            "Login button misaligned on mobile Safari",
            "Login audit log missing IP address",
            false,
            "shared word only, unrelated work",
        ),
    ]
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

const fn default_llm_max_tokens() -> u32 {
    8
}

const fn default_llm_timeout_secs() -> u64 {
    30
}

const fn default_llm_max_retries() -> u32 {
    3
}

const fn default_llm_initial_backoff_ms() -> u64 {
    500
}

const fn default_llm_max_backoff_ms() -> u64 {
    8_000
}

const fn default_llm_concurrency() -> usize {
    4
}

const fn default_llm_max_text_chars() -> usize {
    1500
}
