use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============= Research Brief Types =============

/// A single evaluation criterion the final report must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

/// Structured research brief produced by the scope resolver.
///
/// Immutable once produced; the supervisor and report synthesizer consume it
/// read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub objective: String,
    pub evaluation_criteria: Vec<Criterion>,
    pub constraints: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ============= Sub-Question Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuestionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One decomposed unit of research work, dispatched to a worker.
///
/// Created and mutated only by the supervisor; workers receive a clone and
/// never write back to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    /// Unique within a run, assigned in decomposition order.
    pub id: u32,
    pub text: String,
    /// Lower value means dispatched earlier.
    pub priority: u32,
    pub status: SubQuestionStatus,
}

impl SubQuestion {
    pub fn new(id: u32, text: impl Into<String>, priority: u32) -> Self {
        Self {
            id,
            text: text.into(),
            priority,
            status: SubQuestionStatus::Pending,
        }
    }
}

// ============= Evidence Types =============

/// A uniquely identified reference to a source and the snippet retrieved
/// from it. Created once per unique `(source_locator, content)` pair per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Content-addressed id, stable for identical lookups within a run.
    pub id: String,
    pub source_locator: String,
    pub retrieved_snippet: String,
    pub retrieved_at: DateTime<Utc>,
}

/// A compressed, cited assertion derived from raw retrieved content.
///
/// `supporting_citation_ids` is non-empty by construction: the compressor
/// drops candidate claims it cannot tie to at least one citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub supporting_citation_ids: Vec<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Every tool call that was attempted produced usable output.
    Ok,
    /// Some tool calls failed, but at least one claim was produced.
    Partial,
    /// Zero usable claims after exhausting the tool-call budget.
    Failed,
}

/// Everything a worker hands back for one sub-question attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingBundle {
    pub sub_question_id: u32,
    pub claims: Vec<Claim>,
    pub raw_tool_call_count: u32,
    pub worker_status: WorkerStatus,
}

/// Merged evidence across all finding bundles. Append-only while the
/// supervisor loop runs; frozen before report synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub claims: Vec<Claim>,
    pub citation_index: HashMap<String, Citation>,
}

impl EvidenceSet {
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Append a bundle's claims and index their citations.
    ///
    /// Merging is commutative and associative: claims append, citations
    /// dedup by id, so bundles may arrive in any order.
    pub fn merge_bundle(&mut self, bundle: &FindingBundle, citations: &[Citation]) {
        for citation in citations {
            self.citation_index
                .entry(citation.id.clone())
                .or_insert_with(|| citation.clone());
        }
        self.claims.extend(bundle.claims.iter().cloned());
    }
}

// ============= Tool Types =============

/// One raw retrieval result: where it came from and what was retrieved.
/// Workers accumulate these and hand them to the evidence compressor; they
/// never leave a worker uncompressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source_locator: String,
    pub content: String,
}

// ============= Sufficiency Types =============

/// The supervisor's per-iteration judgment of the gathered evidence.
/// Transient; not persisted beyond the loop iteration that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SufficiencyVerdict {
    pub is_sufficient: bool,
    pub rationale: String,
    #[serde(default)]
    pub missing_aspects: Vec<String>,
}

// ============= Report Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    /// Body text with inline `[^citation-id]` markers.
    pub body: String,
}

/// Terminal artifact of a run: the cited report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDraft {
    pub sections: Vec<ReportSection>,
    /// Every citation referenced by the sections, in first-use order.
    pub sources: Vec<Citation>,
    /// Criteria the final sufficiency check judged unsatisfied, so partial
    /// evidence never silently reads as complete.
    pub unsatisfied_criteria: Vec<String>,
}

impl ReportDraft {
    /// Render the draft as Markdown with a trailing sources list and, when
    /// the evidence fell short, a coverage-notes section.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str("## ");
            out.push_str(&section.heading);
            out.push_str("\n\n");
            out.push_str(&section.body);
            out.push_str("\n\n");
        }
        if !self.unsatisfied_criteria.is_empty() {
            out.push_str("## Coverage notes\n\n");
            out.push_str("The gathered evidence did not satisfy the following criteria:\n\n");
            for criterion in &self.unsatisfied_criteria {
                out.push_str("- ");
                out.push_str(criterion);
                out.push('\n');
            }
            out.push('\n');
        }
        if !self.sources.is_empty() {
            out.push_str("## Sources\n\n");
            for citation in &self.sources {
                out.push_str(&format!("[^{}]: {}\n", citation.id, citation.source_locator));
            }
        }
        out
    }
}

// ============= Run State Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Scoping,
    Researching,
    Synthesizing,
    Done,
    Failed,
}

/// Top-level mutable record owned by the orchestration driver. Phase moves
/// monotonically forward; only the researching phase loops internally.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub brief: Option<ResearchBrief>,
    pub evidence: EvidenceSet,
    pub sub_questions: Vec<SubQuestion>,
    pub iteration_count: u32,
    pub report: Option<ReportDraft>,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            phase: RunPhase::Scoping,
            brief: None,
            evidence: EvidenceSet::default(),
            sub_questions: Vec::new(),
            iteration_count: 0,
            report: None,
            started_at: Utc::now(),
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

// ============= Error Types =============

/// How a model invocation failed; decides the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Provider or network failure. Retryable.
    Transport,
    /// Output did not parse against the expected structure. Retryable up to
    /// a bounded count, then treated as a zero-output failure.
    Malformed,
    /// Refusal or empty output. Not retryable; treated as zero claims.
    Empty,
}

impl ModelErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelErrorKind::Transport | ModelErrorKind::Malformed)
    }
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelErrorKind::Transport => write!(f, "transport"),
            ModelErrorKind::Malformed => write!(f, "malformed"),
            ModelErrorKind::Empty => write!(f, "empty"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Scope error: {0}")]
    Scope(String),

    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Model invocation error ({kind}): {message}")]
    Model {
        kind: ModelErrorKind,
        message: String,
    },

    #[error("Research exhausted: {0}")]
    ResearchExhausted(String),

    #[error("Ungrounded claim: {0}")]
    UngroundedClaim(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResearchError {
    pub fn model(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        ResearchError::Model {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResearchError>;
