//! Structured-output inference with bounded retry
//!
//! Model-backed judgment steps (brief generation, decomposition, claim
//! extraction, sufficiency, report synthesis) all need a typed value back
//! from an untyped completion. [`infer_structured`] sends the target type's
//! JSON schema with the prompt, then parses the reply leniently: models wrap
//! JSON in code fences or prose often enough that strict parsing alone
//! would reject usable output.
//!
//! Retry policy per failure kind: transport failures and malformed output
//! retry up to the caller's bound; refusal or empty output does not retry.

use crate::llm::client::ModelClient;
use crate::types::{ModelErrorKind, ResearchError, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Ask `client` for a value of type `T`, retrying transport failures and
/// unparseable output up to `retries` additional attempts.
pub async fn infer_structured<T>(
    client: &dyn ModelClient,
    system: &str,
    prompt: &str,
    retries: u32,
) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(T))
        .map_err(|e| ResearchError::Internal(format!("Schema serialization failed: {}", e)))?;
    let system = format!(
        "{}\n\nRespond with a single JSON object matching this schema:\n{}\n\nDo not include any text outside the JSON object.",
        system, schema
    );

    let mut last_err = ResearchError::model(
        ModelErrorKind::Transport,
        "Structured inference was never attempted".to_string(),
    );

    for attempt in 0..=retries {
        match client.generate_with_system(&system, prompt).await {
            Ok(text) => match parse_json_payload::<T>(&text) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        model = client.model_name(),
                        "Structured output did not parse: {}",
                        e
                    );
                    last_err = ResearchError::model(
                        ModelErrorKind::Malformed,
                        format!("Output of {} did not parse: {}", client.model_name(), e),
                    );
                }
            },
            Err(ResearchError::Model { kind, message }) => {
                if kind == ModelErrorKind::Empty {
                    // Refusal/empty output; retrying the same prompt will not help.
                    return Err(ResearchError::model(kind, message));
                }
                tracing::warn!(attempt, model = client.model_name(), "Model call failed: {}", message);
                last_err = ResearchError::model(kind, message);
            }
            Err(other) => return Err(other),
        }
    }

    Err(last_err)
}

/// Pull a JSON object out of a completion and deserialize it.
///
/// Handles raw JSON, fenced ```json blocks, and JSON embedded in
/// surrounding prose.
fn parse_json_payload<T: DeserializeOwned>(text: &str) -> std::result::Result<T, String> {
    let candidate = extract_json(text).ok_or_else(|| "no JSON object found".to_string())?;
    serde_json::from_str(candidate).map_err(|e| e.to_string())
}

fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // Fenced block first: everything between the fence markers.
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    // Otherwise the widest brace-delimited span.
    let first = trimmed.find('{')?;
    let last = trimmed.rfind('}')?;
    if last < first {
        return None;
    }
    Some(trimmed[first..=last].trim())
}
