//! Engine configuration
//!
//! Declarative configuration for the research engine: worker-pool sizing,
//! iteration and tool-call budgets, retry bounds, and the model backing each
//! role. Loadable from a TOML file or from environment variables; every
//! field has a default so a bare `EngineConfig::default()` is runnable
//! against local OpenAI-compatible endpoints.
//!
//! Configuration is passed explicitly into each component's constructor.
//! There is no ambient global state, so concurrent runs with different
//! configurations do not interfere.

use crate::types::{ResearchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for a research engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum research workers in flight at once.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Maximum sub-questions produced by one decomposition.
    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: usize,

    /// Maximum supervisor loop iterations before the evidence set is frozen
    /// as-is.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Per-worker tool-call budget.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Retries for the model-backed scoping step.
    #[serde(default = "default_scope_retries")]
    pub scope_retries: u32,

    /// Retries when structured model output fails to parse.
    #[serde(default = "default_structured_retries")]
    pub structured_retries: u32,

    /// Retries for report synthesis after an ungrounded-claim rejection.
    #[serde(default = "default_synthesis_retries")]
    pub synthesis_retries: u32,

    /// Overall run timeout in seconds. `None` means unbounded. On expiry,
    /// in-flight workers are cancelled cooperatively and partial evidence
    /// is kept.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    /// Root directory searched by the `local_file_search` tool.
    #[serde(default = "default_file_search_root")]
    pub file_search_root: PathBuf,

    /// API key for OpenAI-compatible endpoints. Local endpoints (LM Studio,
    /// Ollama) accept any placeholder value.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Override for the OpenAI API base URL.
    #[serde(default)]
    pub openai_api_base: Option<String>,

    /// Model backing each role.
    #[serde(default)]
    pub models: ModelRoleConfig,
}

/// Which model backs which role, as `provider:model` or
/// `provider://host:port/model` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRoleConfig {
    #[serde(default = "default_scope_model")]
    pub scope: String,
    #[serde(default = "default_supervisor_model")]
    pub supervisor: String,
    #[serde(default = "default_research_model")]
    pub research: String,
    #[serde(default = "default_compress_model")]
    pub compress: String,
    #[serde(default = "default_report_model")]
    pub report: String,
}

fn default_worker_pool_size() -> usize {
    3
}

fn default_max_sub_questions() -> usize {
    6
}

fn default_max_iterations() -> u32 {
    3
}

fn default_max_tool_calls() -> u32 {
    8
}

fn default_scope_retries() -> u32 {
    2
}

fn default_structured_retries() -> u32 {
    2
}

fn default_synthesis_retries() -> u32 {
    1
}

fn default_file_search_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_scope_model() -> String {
    "openai:gpt-4o".to_string()
}

fn default_supervisor_model() -> String {
    "openai:gpt-4o".to_string()
}

fn default_research_model() -> String {
    "openai:gpt-4o-mini".to_string()
}

fn default_compress_model() -> String {
    "openai:gpt-4o-mini".to_string()
}

fn default_report_model() -> String {
    "openai:gpt-4o".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            max_sub_questions: default_max_sub_questions(),
            max_iterations: default_max_iterations(),
            max_tool_calls: default_max_tool_calls(),
            scope_retries: default_scope_retries(),
            structured_retries: default_structured_retries(),
            synthesis_retries: default_synthesis_retries(),
            run_timeout_secs: None,
            file_search_root: default_file_search_root(),
            openai_api_key: None,
            openai_api_base: None,
            models: ModelRoleConfig::default(),
        }
    }
}

impl Default for ModelRoleConfig {
    fn default() -> Self {
        Self {
            scope: default_scope_model(),
            supervisor: default_supervisor_model(),
            research: default_research_model(),
            compress: default_compress_model(),
            report: default_report_model(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResearchError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ResearchError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Build configuration from environment variables, loading a `.env`
    /// file first if one is present.
    ///
    /// Recognized variables: `SCOPE_MODEL`, `SUPERVISOR_MODEL`,
    /// `RESEARCH_MODEL`, `COMPRESS_MODEL` (alias `SUMMARIZATION_MODEL`),
    /// `REPORT_MODEL`, `OPENAI_API_KEY`, `OPENAI_API_BASE`,
    /// `WORKER_POOL_SIZE`, `MAX_RESEARCH_ITERATIONS`, `FILE_SEARCH_ROOT`.
    /// Anything unset keeps its default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(v) = std::env::var("SCOPE_MODEL") {
            config.models.scope = v;
        }
        if let Ok(v) = std::env::var("SUPERVISOR_MODEL") {
            config.models.supervisor = v;
        }
        if let Ok(v) = std::env::var("RESEARCH_MODEL") {
            config.models.research = v;
        }
        if let Ok(v) =
            std::env::var("COMPRESS_MODEL").or_else(|_| std::env::var("SUMMARIZATION_MODEL"))
        {
            config.models.compress = v;
        }
        if let Ok(v) = std::env::var("REPORT_MODEL") {
            config.models.report = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_BASE") {
            config.openai_api_base = Some(v);
        }
        if let Some(v) = parse_env("WORKER_POOL_SIZE") {
            config.worker_pool_size = v;
        }
        if let Some(v) = parse_env("MAX_RESEARCH_ITERATIONS") {
            config.max_iterations = v;
        }
        if let Ok(v) = std::env::var("FILE_SEARCH_ROOT") {
            config.file_search_root = PathBuf::from(v);
        }

        config
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring unparseable {}={}", name, raw);
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_pool_size, 3);
        assert_eq!(config.max_sub_questions, 6);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_tool_calls, 8);
        assert_eq!(config.synthesis_retries, 1);
        assert!(config.run_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            worker_pool_size = 5

            [models]
            research = "ollama://localhost:11434/llama3.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.worker_pool_size, 5);
        assert_eq!(config.models.research, "ollama://localhost:11434/llama3.2");
        // Untouched fields fall back to defaults
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.models.report, "openai:gpt-4o");
    }

    #[test]
    fn test_from_file_missing() {
        let result = EngineConfig::from_file("/nonexistent/deepscout.toml");
        assert!(matches!(result, Err(ResearchError::Configuration(_))));
    }
}
