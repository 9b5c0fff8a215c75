//! # deepscout
//!
//! A deep-research orchestration engine: given a research request, it scopes
//! the task, delegates sub-questions to a bounded pool of research workers
//! under a supervisor, compresses retrieved material into cited claims,
//! iterates until the evidence satisfies the brief's criteria, and
//! synthesizes a final report in which every factual sentence is traceable
//! to a citation.
//!
//! ## Overview
//!
//! A run flows strictly forward (brief, then evidence, then report) with
//! one exception: the supervisor's sufficiency loop, which keeps dispatching
//! targeted sub-questions until the evidence is judged sufficient or the
//! iteration budget runs out. Partial evidence degrades gracefully: the
//! report notes unsatisfied criteria instead of failing, and a run fails
//! outright only when literally nothing was gathered.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deepscout::{EngineConfig, OrchestrationDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads SCOPE_MODEL, RESEARCH_MODEL, REPORT_MODEL, ... from the
//!     // environment; unset roles default to OpenAI models.
//!     let config = EngineConfig::from_env();
//!     let driver = OrchestrationDriver::from_config(config)?;
//!
//!     let report = driver
//!         .run("Compare the two leading deep-research products", &[])
//!         .await?;
//!     println!("{}", report.to_markdown());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Swapping models per role
//!
//! Each model-backed step (scoping, supervision, tool-call selection,
//! claim compression, report writing) resolves its client through a
//! [`ModelRegistry`], so a local Ollama model can drive research while a
//! stronger hosted model writes the report:
//!
//! ```rust,ignore
//! use deepscout::EngineConfig;
//!
//! let mut config = EngineConfig::default();
//! config.models.research = "ollama://localhost:11434/llama3.2".to_string();
//! config.models.report = "openai:gpt-4o".to_string();
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Top-level run state machine
//! - [`supervisor`] - Decomposition, bounded dispatch, sufficiency loop
//! - [`worker`] - Per-sub-question tool-call loop
//! - [`evidence`] - Compression of raw findings into cited claims
//! - [`citations`] - Run-scoped, content-addressed citation store
//! - [`scope`] - Research-brief resolution
//! - [`report`] - Grounded report synthesis
//! - [`llm`] - Model clients and per-role registry
//! - [`tools`] - Web and local-file search capabilities
//! - [`types`] - Data model and error handling

/// Run-scoped citation registry.
pub mod citations;
/// Engine configuration.
pub mod config;
/// Top-level orchestration state machine.
pub mod driver;
/// Evidence compression into cited claims.
pub mod evidence;
/// Model clients, providers, and per-role registry.
pub mod llm;
/// Grounded report synthesis.
pub mod report;
/// Research-brief resolution.
pub mod scope;
/// Decomposition, dispatch, and the sufficiency loop.
pub mod supervisor;
/// Retrieval tools consumed by workers.
pub mod tools;
/// Core types and error handling.
pub mod types;
/// Per-sub-question research worker.
pub mod worker;

// Re-export commonly used types
pub use citations::CitationStore;
pub use config::{EngineConfig, ModelRoleConfig};
pub use driver::OrchestrationDriver;
pub use evidence::EvidenceCompressor;
pub use llm::{ModelClient, ModelRegistry, ModelRole, Provider};
pub use report::ReportSynthesizer;
pub use scope::{ScopeOutcome, ScopeResolver};
pub use supervisor::{Supervisor, SupervisorOutcome};
pub use tools::{Tool, ToolRegistry};
pub use types::{
    Citation, Claim, EvidenceSet, FindingBundle, ReportDraft, ResearchBrief, ResearchError, Result,
    RunPhase, RunState, SourceDocument, SubQuestion, SufficiencyVerdict, WorkerStatus,
};
pub use worker::ResearchWorker;
