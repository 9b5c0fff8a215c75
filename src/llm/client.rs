//! Model client trait and provider selection
//!
//! All providers implement [`ModelClient`], allowing the engine to swap
//! models per role without changing orchestration code. Providers are
//! described by `provider:model` or `provider://host:port/model` strings,
//! the same scheme used for per-role environment configuration.

use crate::types::{ResearchError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Generic model client trait for provider abstraction.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a completion from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection.
///
/// | Provider | Status | Notes |
/// |----------|--------|-------|
/// | OpenAI | Full | also covers any OpenAI-compatible hosted API |
/// | LM Studio | Full | OpenAI-compatible local server |
/// | Ollama | Full | via its OpenAI-compatible `/v1` endpoint |
/// | Anthropic | Stub | use an OpenAI-compatible router instead |
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API (including compatible hosted endpoints).
    OpenAi {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Anthropic Claude API.
    ///
    /// Not yet implemented; route Claude models through an
    /// OpenAI-compatible gateway in the meantime.
    Anthropic { api_key: String, model: String },

    /// LM Studio local server. Speaks the OpenAI wire format and accepts a
    /// placeholder API key.
    LmStudio { base_url: String, model: String },

    /// Ollama local server, reached through its OpenAI-compatible `/v1`
    /// endpoint.
    Ollama { base_url: String, model: String },
}

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

impl Provider {
    /// Parse a model string into a provider.
    ///
    /// Accepted forms:
    /// - `openai:gpt-4o`
    /// - `anthropic:claude-sonnet-4-5`
    /// - `lmstudio://localhost:1234/qwen/qwen3-4b` (model names may contain
    ///   slashes; the first slash after host:port starts the model name)
    /// - `ollama://192.168.1.11:11434/llama3.2`
    ///
    /// `api_key` and `api_base` apply to the `openai` form; local providers
    /// carry their endpoint in the string itself.
    pub fn parse(
        model_string: &str,
        api_key: Option<&str>,
        api_base: Option<&str>,
    ) -> Result<Self> {
        if let Some((scheme, rest)) = model_string.split_once("://") {
            let (host_port, model) = rest.split_once('/').ok_or_else(|| {
                ResearchError::Configuration(format!(
                    "Local model string must include a model name: {}",
                    model_string
                ))
            })?;
            if model.is_empty() {
                return Err(ResearchError::Configuration(format!(
                    "Local model string must include a model name: {}",
                    model_string
                )));
            }
            let (_, port) = host_port.rsplit_once(':').ok_or_else(|| {
                ResearchError::Configuration(format!(
                    "Local model string must include a port: {}",
                    model_string
                ))
            })?;
            if port.parse::<u16>().is_err() {
                return Err(ResearchError::Configuration(format!(
                    "Invalid port in model string: {}",
                    model_string
                )));
            }

            return match scheme {
                "lmstudio" => Ok(Provider::LmStudio {
                    base_url: format!("http://{}/v1", host_port),
                    model: model.to_string(),
                }),
                "ollama" => Ok(Provider::Ollama {
                    base_url: format!("http://{}/v1", host_port),
                    model: model.to_string(),
                }),
                other => Err(ResearchError::Configuration(format!(
                    "Unsupported local provider: {}",
                    other
                ))),
            };
        }

        let (provider, model) = model_string.split_once(':').ok_or_else(|| {
            ResearchError::Configuration(format!(
                "Invalid model string '{}'. Expected 'provider:model' or 'provider://host:port/model'",
                model_string
            ))
        })?;

        match provider {
            "openai" => Ok(Provider::OpenAi {
                api_key: api_key.unwrap_or_default().to_string(),
                api_base: api_base.unwrap_or(DEFAULT_OPENAI_API_BASE).to_string(),
                model: model.to_string(),
            }),
            "anthropic" => Ok(Provider::Anthropic {
                api_key: api_key.unwrap_or_default().to_string(),
                model: model.to_string(),
            }),
            other => Err(ResearchError::Configuration(format!(
                "Unsupported provider: {}",
                other
            ))),
        }
    }

    /// Create a client instance for this provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not yet implemented (Anthropic).
    pub fn create_client(&self) -> Result<Arc<dyn ModelClient>> {
        match self {
            Provider::OpenAi {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAiCompatibleClient::new(
                api_base.clone(),
                api_key.clone(),
                model.clone(),
            ))),

            Provider::Anthropic { model, .. } => Err(ResearchError::Configuration(format!(
                "Anthropic provider not yet implemented (requested model '{}'). \
                 Route Claude models through an OpenAI-compatible gateway, or use a \
                 local lmstudio:// or ollama:// endpoint.",
                model
            ))),

            Provider::LmStudio { base_url, model } => {
                Ok(Arc::new(super::openai::OpenAiCompatibleClient::new(
                    base_url.clone(),
                    // LM Studio does not verify the key
                    "lm-studio".to_string(),
                    model.clone(),
                )))
            }

            Provider::Ollama { base_url, model } => {
                Ok(Arc::new(super::openai::OpenAiCompatibleClient::new(
                    base_url.clone(),
                    "ollama".to_string(),
                    model.clone(),
                )))
            }
        }
    }

    /// Check if this provider is fully implemented.
    pub fn is_implemented(&self) -> bool {
        !matches!(self, Provider::Anthropic { .. })
    }

    /// Get a human-readable name for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi { .. } => "OpenAI",
            Provider::Anthropic { .. } => "Anthropic",
            Provider::LmStudio { .. } => "LM Studio",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai() {
        let provider = Provider::parse("openai:gpt-4o", Some("sk-test"), None).unwrap();
        match provider {
            Provider::OpenAi {
                api_key,
                api_base,
                model,
            } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(api_base, DEFAULT_OPENAI_API_BASE);
                assert_eq!(model, "gpt-4o");
            }
            other => panic!("Expected OpenAi, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_local_with_slashes_in_model() {
        let provider =
            Provider::parse("lmstudio://localhost:1234/qwen/qwen3-4b-thinking", None, None)
                .unwrap();
        match provider {
            Provider::LmStudio { base_url, model } => {
                assert_eq!(base_url, "http://localhost:1234/v1");
                assert_eq!(model, "qwen/qwen3-4b-thinking");
            }
            other => panic!("Expected LmStudio, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ollama() {
        let provider =
            Provider::parse("ollama://192.168.1.11:11434/gemma3:12b", None, None).unwrap();
        match provider {
            Provider::Ollama { base_url, model } => {
                assert_eq!(base_url, "http://192.168.1.11:11434/v1");
                assert_eq!(model, "gemma3:12b");
            }
            other => panic!("Expected Ollama, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_strings() {
        assert!(Provider::parse("gpt-4o", None, None).is_err());
        assert!(Provider::parse("lmstudio://localhost/model", None, None).is_err());
        assert!(Provider::parse("lmstudio://localhost:1234", None, None).is_err());
        assert!(Provider::parse("ollama://localhost:abc/model", None, None).is_err());
        assert!(Provider::parse("mystery:model", None, None).is_err());
    }

    #[test]
    fn test_anthropic_returns_helpful_error() {
        let provider = Provider::parse("anthropic:claude-sonnet-4-5", Some("key"), None).unwrap();
        assert!(!provider.is_implemented());

        let err = match provider.create_client() {
            Ok(_) => panic!("Expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("not yet implemented"));
        assert!(err.contains("claude-sonnet-4-5"));
    }
}
