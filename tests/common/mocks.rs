//! Mock implementations for testing.
//!
//! Deterministic fakes for the model-backed steps and the retrieval tools,
//! so orchestration tests exercise the real coordination machinery without
//! network access or real inference.

use async_trait::async_trait;
use deepscout::{ModelClient, ResearchError, SourceDocument, Tool};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============= Model fakes =============

/// Returns scripted responses in order; repeats the last one when the
/// script runs out.
pub struct ScriptedModelClient {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedModelClient {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            last: Mutex::new("{}".to_string()),
        }
    }

    fn next(&self) -> String {
        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(response) => {
                *self.last.lock().unwrap() = response.clone();
                response
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(&self, _prompt: &str) -> deepscout::Result<String> {
        Ok(self.next())
    }
    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> deepscout::Result<String> {
        Ok(self.next())
    }
    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Always returns the same response.
pub struct StaticModelClient(pub String);

#[async_trait]
impl ModelClient for StaticModelClient {
    async fn generate(&self, _prompt: &str) -> deepscout::Result<String> {
        Ok(self.0.clone())
    }
    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> deepscout::Result<String> {
        Ok(self.0.clone())
    }
    fn model_name(&self) -> &str {
        "static"
    }
}

/// Always fails with a retryable transport error.
pub struct FailingModelClient;

#[async_trait]
impl ModelClient for FailingModelClient {
    async fn generate(&self, _prompt: &str) -> deepscout::Result<String> {
        Err(ResearchError::model(
            deepscout::types::ModelErrorKind::Transport,
            "mock transport failure",
        ))
    }
    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> deepscout::Result<String> {
        Err(ResearchError::model(
            deepscout::types::ModelErrorKind::Transport,
            "mock transport failure",
        ))
    }
    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Research-role fake driven by prompt content: issues one tool call while
/// nothing has been gathered, then declares the research done.
pub struct PromptDrivenResearchModel {
    pub tool: String,
}

impl PromptDrivenResearchModel {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for PromptDrivenResearchModel {
    async fn generate(&self, prompt: &str) -> deepscout::Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> deepscout::Result<String> {
        if prompt.contains("Nothing has been gathered yet") {
            Ok(json!({"done": false, "tool": self.tool, "query": "mock query"}).to_string())
        } else {
            Ok(json!({"done": true}).to_string())
        }
    }

    fn model_name(&self) -> &str {
        "prompt-driven-research"
    }
}

/// Compress-role fake: emits one claim per citation id it finds in the
/// prompt, citing that id.
pub struct PromptCitingCompressModel;

#[async_trait]
impl ModelClient for PromptCitingCompressModel {
    async fn generate(&self, prompt: &str) -> deepscout::Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> deepscout::Result<String> {
        let ids: Vec<String> = prompt
            .lines()
            .filter(|l| l.starts_with("[src-"))
            .filter_map(|l| l.split(']').next())
            .map(|s| s.trim_start_matches('[').to_string())
            .collect();

        let claims: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "text": format!("extracted claim backed by {}", id),
                    "citation_ids": [id],
                    "confidence": 0.9
                })
            })
            .collect();

        Ok(json!({ "claims": claims }).to_string())
    }

    fn model_name(&self) -> &str {
        "prompt-citing-compress"
    }
}

/// Report-role fake: writes one grounded sentence per usable citation id
/// listed in the prompt.
pub struct CitingReportModel;

#[async_trait]
impl ModelClient for CitingReportModel {
    async fn generate(&self, prompt: &str) -> deepscout::Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> deepscout::Result<String> {
        let ids: Vec<String> = prompt
            .lines()
            .find(|l| l.starts_with("Usable citation ids:"))
            .map(|l| {
                l.trim_start_matches("Usable citation ids:")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let body: String = ids
            .iter()
            .map(|id| format!("A finding supported by the evidence[^{}]. ", id))
            .collect();

        Ok(json!({
            "sections": [{"heading": "Findings", "body": body.trim()}]
        })
        .to_string())
    }

    fn model_name(&self) -> &str {
        "citing-report"
    }
}

// ============= Tool fakes =============

/// Returns a fixed document set for every query.
pub struct StaticSearchTool {
    name: String,
    docs: Vec<SourceDocument>,
}

impl StaticSearchTool {
    pub fn new(name: &str, docs: Vec<SourceDocument>) -> Self {
        Self {
            name: name.to_string(),
            docs,
        }
    }
}

#[async_trait]
impl Tool for StaticSearchTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "static mock search"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> deepscout::Result<Vec<SourceDocument>> {
        Ok(self.docs.clone())
    }
}

/// Fails on every call and counts the attempts it absorbed.
pub struct FailingTool {
    name: String,
    pub calls: Arc<AtomicU32>,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> deepscout::Result<Vec<SourceDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ResearchError::ToolUnavailable(
            "mock backend down".to_string(),
        ))
    }
}

/// Records the peak number of concurrent executions.
pub struct ConcurrencyProbeTool {
    name: String,
    docs: Vec<SourceDocument>,
    current: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbeTool {
    pub fn new(name: &str, docs: Vec<SourceDocument>) -> Self {
        Self {
            name: name.to_string(),
            docs,
            current: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for ConcurrencyProbeTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "records concurrent executions"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> deepscout::Result<Vec<SourceDocument>> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(self.docs.clone())
    }
}

/// Cancels the run the moment it is called, then still returns its
/// documents, imitating a timeout landing mid-call.
pub struct CancellingTool {
    name: String,
    docs: Vec<SourceDocument>,
    token: CancellationToken,
}

impl CancellingTool {
    pub fn new(name: &str, docs: Vec<SourceDocument>, token: CancellationToken) -> Self {
        Self {
            name: name.to_string(),
            docs,
            token,
        }
    }
}

#[async_trait]
impl Tool for CancellingTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "cancels the run mid-call"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"query": {"type": "string"}}})
    }
    async fn execute(&self, _args: Value) -> deepscout::Result<Vec<SourceDocument>> {
        self.token.cancel();
        Ok(self.docs.clone())
    }
}

// ============= Fixture helpers =============

/// A scope-model response producing a brief with the given criteria.
pub fn scope_brief_json(objective: &str, criteria: &[&str]) -> String {
    json!({
        "need_clarification": false,
        "objective": objective,
        "evaluation_criteria": criteria
            .iter()
            .map(|c| json!({"text": c}))
            .collect::<Vec<Value>>(),
        "constraints": []
    })
    .to_string()
}

/// A supervisor-model decomposition response.
pub fn decomposition_json(sub_questions: &[&str]) -> String {
    json!({
        "reflection": "mock reflection",
        "sub_questions": sub_questions
    })
    .to_string()
}

/// A supervisor-model sufficiency verdict response.
pub fn sufficiency_json(is_sufficient: bool, missing: &[&str]) -> String {
    json!({
        "is_sufficient": is_sufficient,
        "rationale": "mock rationale",
        "missing_aspects": missing
    })
    .to_string()
}

/// A single web document fixture.
pub fn doc(locator: &str, content: &str) -> SourceDocument {
    SourceDocument {
        source_locator: locator.to_string(),
        content: content.to_string(),
    }
}
