//! Scope resolution
//!
//! Turns a raw user request plus any clarifying answers into a structured
//! research brief. The model-backed step may instead decide the request is
//! too vague and ask a clarifying question; the caller then re-invokes with
//! the answer appended to `clarifications`.
//!
//! Criteria-driven downstream logic is unconditional: if the model returns
//! a brief with zero evaluation criteria, a single default criterion is
//! synthesized rather than failing the run.

use crate::llm::{infer_structured, ModelClient};
use crate::types::{Criterion, ResearchBrief, ResearchError, Result};
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

const SCOPE_SYSTEM_PROMPT: &str = "You scope research requests. If the request lacks information \
needed to research it well, ask one clarifying question. Otherwise produce a research brief: a \
precise objective, the criteria a complete answer must satisfy, and any constraints the request \
implies.";

pub const DEFAULT_CRITERION: &str = "directly answers the objective";

#[derive(Debug, Deserialize, JsonSchema)]
struct BriefDraft {
    /// True when the request cannot be scoped without more input.
    #[serde(default)]
    need_clarification: bool,
    /// The clarifying question to ask the user.
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    objective: Option<String>,
    #[serde(default)]
    evaluation_criteria: Vec<CriterionDraft>,
    #[serde(default)]
    constraints: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CriterionDraft {
    text: String,
    #[serde(default)]
    weight: Option<f32>,
}

/// What scoping produced: a brief ready for research, or a question the
/// caller must answer first.
#[derive(Debug, Clone)]
pub enum ScopeOutcome {
    Brief(ResearchBrief),
    NeedsClarification(String),
}

/// Resolves a user request into a research brief.
pub struct ScopeResolver {
    model: Arc<dyn ModelClient>,
    retries: u32,
}

impl ScopeResolver {
    pub fn new(model: Arc<dyn ModelClient>, retries: u32) -> Self {
        Self { model, retries }
    }

    /// Resolve a request into a brief or a clarifying question.
    ///
    /// # Errors
    ///
    /// `Scope` when the request is empty or the model cannot produce a
    /// structurally valid brief within the retry bound.
    pub async fn resolve(
        &self,
        user_request: &str,
        clarifications: &[String],
    ) -> Result<ScopeOutcome> {
        let user_request = user_request.trim();
        if user_request.is_empty() {
            return Err(ResearchError::Scope(
                "Research request is empty".to_string(),
            ));
        }

        let prompt = build_scope_prompt(user_request, clarifications);
        let draft: BriefDraft = infer_structured(
            self.model.as_ref(),
            SCOPE_SYSTEM_PROMPT,
            &prompt,
            self.retries,
        )
        .await
        .map_err(|e| ResearchError::Scope(format!("Brief generation failed: {}", e)))?;

        if draft.need_clarification {
            let question = draft
                .question
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| "Could you describe the research goal in more detail?".to_string());
            return Ok(ScopeOutcome::NeedsClarification(question));
        }

        let objective = draft
            .objective
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| user_request.to_string());

        let mut evaluation_criteria: Vec<Criterion> = draft
            .evaluation_criteria
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| Criterion {
                text: c.text.trim().to_string(),
                weight: c.weight,
            })
            .collect();

        if evaluation_criteria.is_empty() {
            evaluation_criteria.push(Criterion {
                text: DEFAULT_CRITERION.to_string(),
                weight: None,
            });
        }

        Ok(ScopeOutcome::Brief(ResearchBrief {
            objective,
            evaluation_criteria,
            constraints: draft.constraints,
            created_at: Utc::now(),
        }))
    }
}

fn build_scope_prompt(user_request: &str, clarifications: &[String]) -> String {
    let mut prompt = format!("Research request: {}\n", user_request);
    if !clarifications.is_empty() {
        prompt.push_str("\nClarifications provided so far:\n");
        for clarification in clarifications {
            prompt.push_str(&format!("- {}\n", clarification));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedScope(&'static str);

    #[async_trait]
    impl ModelClient for ScriptedScope {
        async fn generate(&self, _p: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
        async fn generate_with_system(&self, _s: &str, _p: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
        fn model_name(&self) -> &str {
            "scripted-scope"
        }
    }

    #[tokio::test]
    async fn test_empty_request_is_scope_error() {
        let resolver = ScopeResolver::new(Arc::new(ScriptedScope("{}")), 2);
        let err = resolver.resolve("   ", &[]).await.unwrap_err();
        assert!(matches!(err, ResearchError::Scope(_)));
    }

    #[tokio::test]
    async fn test_zero_criteria_synthesizes_default() {
        let resolver = ScopeResolver::new(
            Arc::new(ScriptedScope(
                r#"{"need_clarification": false, "objective": "study X", "evaluation_criteria": [], "constraints": []}"#,
            )),
            2,
        );

        let outcome = resolver.resolve("study X", &[]).await.unwrap();
        let ScopeOutcome::Brief(brief) = outcome else {
            panic!("Expected a brief");
        };
        assert_eq!(brief.evaluation_criteria.len(), 1);
        assert_eq!(brief.evaluation_criteria[0].text, DEFAULT_CRITERION);
    }

    #[tokio::test]
    async fn test_clarification_is_surfaced() {
        let resolver = ScopeResolver::new(
            Arc::new(ScriptedScope(
                r#"{"need_clarification": true, "question": "Which market?"}"#,
            )),
            2,
        );

        let outcome = resolver.resolve("research prices", &[]).await.unwrap();
        match outcome {
            ScopeOutcome::NeedsClarification(question) => assert_eq!(question, "Which market?"),
            other => panic!("Expected clarification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_output_becomes_scope_error() {
        let resolver = ScopeResolver::new(Arc::new(ScriptedScope("not json")), 1);
        let err = resolver.resolve("study X", &[]).await.unwrap_err();
        assert!(matches!(err, ResearchError::Scope(_)));
    }

    #[test]
    fn test_prompt_includes_clarifications() {
        let prompt = build_scope_prompt("study X", &["US market only".to_string()]);
        assert!(prompt.contains("study X"));
        assert!(prompt.contains("US market only"));
    }
}
