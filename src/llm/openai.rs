//! OpenAI-compatible chat-completions client
//!
//! One HTTP client covers every supported endpoint: OpenAI itself, LM
//! Studio, and Ollama all speak this wire format. Transport failures map to
//! retryable model errors; an empty or missing completion maps to a
//! non-retryable empty-output error.

use crate::llm::client::ModelClient;
use crate::types::{ModelErrorKind, ResearchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(api_base: String, api_key: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage<'_>>) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ResearchError::model(
                    ModelErrorKind::Transport,
                    format!("Request to {} failed: {}", url, e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(ResearchError::model(
                ModelErrorKind::Transport,
                format!("{} returned {}: {}", url, status, excerpt),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ResearchError::model(
                ModelErrorKind::Transport,
                format!("Unreadable response from {}: {}", url, e),
            )
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ResearchError::model(
                ModelErrorKind::Empty,
                format!("Model {} returned an empty completion", self.model),
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage {
            role: "user",
            content: prompt,
        }])
        .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
