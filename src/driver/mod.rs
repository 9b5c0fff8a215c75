//! Orchestration driver
//!
//! The top-level state machine sequencing a run: scoping → researching →
//! synthesizing → done, or failed from any phase on an unrecovered error.
//! Owns the run state, the per-run citation store, and the optional overall
//! timeout, which cancels in-flight workers cooperatively while keeping
//! whatever evidence they had already compressed.

use crate::citations::CitationStore;
use crate::config::EngineConfig;
use crate::evidence::EvidenceCompressor;
use crate::llm::{ModelRegistry, ModelRole};
use crate::report::ReportSynthesizer;
use crate::scope::{ScopeOutcome, ScopeResolver};
use crate::supervisor::Supervisor;
use crate::tools::ToolRegistry;
use crate::types::{ReportDraft, ResearchError, Result, RunPhase, RunState};
use crate::worker::ResearchWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives one research run end to end.
pub struct OrchestrationDriver {
    config: EngineConfig,
    models: ModelRegistry,
    tools: Arc<ToolRegistry>,
}

impl OrchestrationDriver {
    pub fn new(config: EngineConfig, models: ModelRegistry, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            models,
            tools,
        }
    }

    /// Build a driver from configuration alone: model clients from the
    /// per-role config, tools from the default registry.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let models = ModelRegistry::from_config(&config)?;
        let tools = Arc::new(ToolRegistry::with_default_tools(
            config.file_search_root.clone(),
        ));
        Ok(Self::new(config, models, tools))
    }

    /// Execute a complete research run.
    ///
    /// Returns the cited report, or the first unrecovered error: `Scope`
    /// for an unresolvable request, `ResearchExhausted` when no evidence
    /// was ever gathered, `UngroundedClaim` when synthesis failed its
    /// retry budget.
    pub async fn run(&self, user_request: &str, clarifications: &[String]) -> Result<ReportDraft> {
        let mut state = RunState::new();
        tracing::info!(run_id = %state.run_id, "Starting research run");

        let cancel = CancellationToken::new();
        let watchdog = self.config.run_timeout_secs.map(|secs| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                tracing::warn!("Run timeout elapsed, cancelling in-flight workers");
                cancel.cancel();
            })
        });

        let result = self
            .execute(&mut state, &cancel, user_request, clarifications)
            .await;

        if let Some(handle) = watchdog {
            handle.abort();
        }

        match result {
            Ok(report) => {
                state.phase = RunPhase::Done;
                tracing::info!(
                    run_id = %state.run_id,
                    sections = report.sections.len(),
                    sources = report.sources.len(),
                    iterations = state.iteration_count,
                    "Research run complete"
                );
                Ok(report)
            }
            Err(e) => {
                state.phase = RunPhase::Failed;
                tracing::error!(run_id = %state.run_id, "Research run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        state: &mut RunState,
        cancel: &CancellationToken,
        user_request: &str,
        clarifications: &[String],
    ) -> Result<ReportDraft> {
        // Scoping
        state.phase = RunPhase::Scoping;
        let resolver = ScopeResolver::new(
            self.models.client_for(ModelRole::Scope)?,
            self.config.scope_retries,
        );
        let brief = match resolver.resolve(user_request, clarifications).await? {
            ScopeOutcome::Brief(brief) => brief,
            ScopeOutcome::NeedsClarification(question) => {
                // An unattended run has nobody to answer; surface the
                // question so the caller can re-run with it answered.
                return Err(ResearchError::Scope(format!(
                    "Clarification required before research can start: {}",
                    question
                )));
            }
        };
        tracing::info!(
            criteria = brief.evaluation_criteria.len(),
            "Scoped research brief: {}",
            brief.objective
        );
        state.brief = Some(brief.clone());

        // Researching
        state.phase = RunPhase::Researching;
        let store = Arc::new(CitationStore::new());
        let compressor = Arc::new(EvidenceCompressor::new(
            self.models.client_for(ModelRole::Compress)?,
            store.clone(),
            self.config.structured_retries,
        ));
        let worker = Arc::new(ResearchWorker::new(
            self.models.client_for(ModelRole::Research)?,
            self.tools.clone(),
            compressor,
            self.config.max_tool_calls,
            self.config.structured_retries,
        ));
        let supervisor = Supervisor::new(
            self.models.client_for(ModelRole::Supervisor)?,
            worker,
            store,
            self.config.worker_pool_size,
            self.config.max_sub_questions,
            self.config.max_iterations,
            self.config.structured_retries,
        );

        let outcome = supervisor.run(&brief, cancel).await?;
        state.evidence = outcome.evidence.clone();
        state.sub_questions = outcome.sub_questions;
        state.iteration_count = outcome.iterations;

        // Synthesizing
        state.phase = RunPhase::Synthesizing;
        let synthesizer = ReportSynthesizer::new(
            self.models.client_for(ModelRole::Report)?,
            self.config.structured_retries,
            self.config.synthesis_retries,
        );
        let report = synthesizer
            .synthesize(&brief, &outcome.evidence, &outcome.unsatisfied_aspects)
            .await?;
        state.report = Some(report.clone());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_with_defaults() {
        let driver = OrchestrationDriver::from_config(EngineConfig::default()).unwrap();
        assert!(driver.tools.has_tool("web_search"));
        assert!(driver.tools.has_tool("local_file_search"));
    }
}
