//! Research worker
//!
//! Executes one focused sub-question: repeatedly asks the research model to
//! choose the next tool call, accumulates raw findings, then hands
//! everything to the evidence compressor. A worker never returns raw tool
//! output: every claim in its bundle already carries citation links.
//!
//! Failure policy: a tool call that fails is retried once with the same
//! arguments, then abandoned; the worker reports `failed` only when it
//! produced zero usable claims after exhausting its budget, `partial` when
//! some calls failed but claims were still produced, `ok` otherwise.
//! A cancelled worker compresses and returns whatever it had gathered
//! instead of dropping it.

use crate::evidence::EvidenceCompressor;
use crate::llm::{infer_structured, ModelClient};
use crate::tools::registry::ToolDefinition;
use crate::tools::ToolRegistry;
use crate::types::{FindingBundle, SourceDocument, SubQuestion, WorkerStatus};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const RESEARCH_SYSTEM_PROMPT: &str = "You are a research assistant working on one focused \
sub-question. Based on what has been gathered so far, either choose the single most useful next \
tool call or declare the research done. Prefer stopping once the gathered material answers the \
sub-question; do not repeat a query that already ran.";

/// The research model's choice of next step.
#[derive(Debug, Deserialize, JsonSchema)]
struct ToolDecision {
    /// True when enough material has been gathered.
    done: bool,
    /// Name of the tool to call next. Ignored when `done` is true.
    #[serde(default)]
    tool: Option<String>,
    /// Query to pass to the tool.
    #[serde(default)]
    query: Option<String>,
}

/// Runs a single sub-question against the available tools.
pub struct ResearchWorker {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    compressor: Arc<EvidenceCompressor>,
    max_tool_calls: u32,
    structured_retries: u32,
}

impl ResearchWorker {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        compressor: Arc<EvidenceCompressor>,
        max_tool_calls: u32,
        structured_retries: u32,
    ) -> Self {
        Self {
            model,
            tools,
            compressor,
            max_tool_calls,
            structured_retries,
        }
    }

    /// Research one sub-question to completion, cancellation, or budget
    /// exhaustion. Never fails outright: failures degrade into the bundle's
    /// `worker_status`.
    pub async fn research(
        &self,
        sub_question: &SubQuestion,
        cancel: &CancellationToken,
    ) -> FindingBundle {
        let definitions = self.tools.get_tool_definitions();
        let mut findings: Vec<SourceDocument> = Vec::new();
        let mut tool_call_count: u32 = 0;
        let mut degraded = false;

        while tool_call_count < self.max_tool_calls {
            if cancel.is_cancelled() {
                tracing::info!(sub_question = sub_question.id, "Worker cancelled; compressing partial findings");
                degraded = true;
                break;
            }

            let decision = match self.next_decision(sub_question, &definitions, &findings).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(
                        sub_question = sub_question.id,
                        "Tool selection failed, stopping early: {}",
                        e
                    );
                    degraded = true;
                    break;
                }
            };

            if decision.done {
                break;
            }
            let (Some(tool), Some(query)) = (decision.tool, decision.query) else {
                tracing::warn!(
                    sub_question = sub_question.id,
                    "Model chose to continue without naming a tool call; stopping"
                );
                degraded = true;
                break;
            };

            tool_call_count += 1;
            match self.call_tool_with_retry(&tool, &query, cancel).await {
                Some(docs) => {
                    tracing::debug!(
                        sub_question = sub_question.id,
                        tool = %tool,
                        results = docs.len(),
                        "Tool call succeeded"
                    );
                    findings.extend(docs);
                }
                None => {
                    // Abandoned after retry; its output is simply absent.
                    degraded = true;
                }
            }
        }

        let claims = match self
            .compressor
            .compress(&sub_question.text, &findings)
            .await
        {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(
                    sub_question = sub_question.id,
                    "Compression failed, returning zero claims: {}",
                    e
                );
                degraded = true;
                Vec::new()
            }
        };

        let worker_status = if claims.is_empty() {
            WorkerStatus::Failed
        } else if degraded {
            WorkerStatus::Partial
        } else {
            WorkerStatus::Ok
        };

        FindingBundle {
            sub_question_id: sub_question.id,
            claims,
            raw_tool_call_count: tool_call_count,
            worker_status,
        }
    }

    async fn next_decision(
        &self,
        sub_question: &SubQuestion,
        definitions: &[ToolDefinition],
        findings: &[SourceDocument],
    ) -> crate::types::Result<ToolDecision> {
        let prompt = build_decision_prompt(sub_question, definitions, findings, self.max_tool_calls);
        infer_structured(
            self.model.as_ref(),
            RESEARCH_SYSTEM_PROMPT,
            &prompt,
            self.structured_retries,
        )
        .await
    }

    /// Execute one tool call, retrying once with the same arguments. Returns
    /// `None` when the call is abandoned.
    async fn call_tool_with_retry(
        &self,
        tool: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Option<Vec<SourceDocument>> {
        let args = json!({ "query": query });

        for attempt in 0..2 {
            // Biased so a call that completes in the same poll as a
            // cancellation still delivers its results.
            let result = tokio::select! {
                biased;
                result = self.tools.execute(tool, args.clone()) => result,
                _ = cancel.cancelled() => return None,
            };

            match result {
                Ok(docs) => return Some(docs),
                Err(e) => {
                    if attempt == 0 {
                        tracing::debug!(tool, "Tool call failed, retrying once: {}", e);
                    } else {
                        tracing::warn!(tool, "Tool call failed twice, abandoning: {}", e);
                    }
                }
            }
        }

        None
    }
}

fn build_decision_prompt(
    sub_question: &SubQuestion,
    definitions: &[ToolDefinition],
    findings: &[SourceDocument],
    budget: u32,
) -> String {
    let mut prompt = format!("Sub-question: {}\n\nAvailable tools:\n", sub_question.text);
    for def in definitions {
        prompt.push_str(&format!("- {}: {}\n", def.name, def.description));
    }

    if findings.is_empty() {
        prompt.push_str("\nNothing has been gathered yet.\n");
    } else {
        prompt.push_str(&format!("\nGathered so far ({} documents):\n", findings.len()));
        for doc in findings {
            let preview: String = doc.content.chars().take(200).collect();
            prompt.push_str(&format!("- {}: {}\n", doc.source_locator, preview));
        }
    }

    prompt.push_str(&format!(
        "\nAt most {} tool calls are allowed in total. Choose the next tool call or declare the research done.",
        budget
    ));
    prompt
}
