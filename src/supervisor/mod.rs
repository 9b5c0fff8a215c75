//! Research supervisor
//!
//! Decomposes a research brief into sub-questions, dispatches them to a
//! bounded pool of research workers, merges finding bundles into the
//! evidence set, and decides each iteration whether the gathered evidence
//! satisfies the brief's criteria or more targeted research is needed.
//!
//! The sufficiency loop moves through `decomposing → dispatching → merging
//! → evaluating` and either re-enters `dispatching` with follow-up
//! sub-questions or finishes. The loop always terminates in `done`; worker
//! failures are absorbed during merging, and only a run that produced zero
//! evidence across every iteration surfaces `ResearchExhausted`.

use crate::citations::CitationStore;
use crate::llm::{infer_structured, ModelClient};
use crate::types::{
    Citation, EvidenceSet, FindingBundle, ResearchBrief, ResearchError, Result, SubQuestion,
    SubQuestionStatus, SufficiencyVerdict, WorkerStatus,
};
use crate::worker::ResearchWorker;
use futures::stream::{FuturesUnordered, StreamExt};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

const DECOMPOSE_SYSTEM_PROMPT: &str = "You are a research supervisor. Reflect briefly on the \
research objective, then break it into independent sub-questions that can be researched in \
parallel. Use one sub-question for narrow tasks; split only along genuinely independent aspects.";

const SUFFICIENCY_SYSTEM_PROMPT: &str = "You are a research supervisor judging whether gathered \
evidence is sufficient. Evidence is sufficient only if every evaluation criterion is satisfied by \
at least one claim. List the missing aspects precisely; each becomes a follow-up research task.";

#[derive(Debug, Deserialize, JsonSchema)]
struct Decomposition {
    /// Short reflection on how to split the work.
    #[serde(default)]
    reflection: Option<String>,
    sub_questions: Vec<String>,
}

/// Everything the supervisor hands back to the driver when the loop ends.
#[derive(Debug)]
pub struct SupervisorOutcome {
    pub evidence: EvidenceSet,
    pub sub_questions: Vec<SubQuestion>,
    pub iterations: u32,
    /// Aspects the final sufficiency check judged missing. Empty when the
    /// evidence was judged sufficient.
    pub unsatisfied_aspects: Vec<String>,
}

/// Coordinates decomposition, dispatch, merging, and the sufficiency loop.
pub struct Supervisor {
    model: Arc<dyn ModelClient>,
    worker: Arc<ResearchWorker>,
    store: Arc<CitationStore>,
    worker_pool_size: usize,
    max_sub_questions: usize,
    max_iterations: u32,
    structured_retries: u32,
}

impl Supervisor {
    pub fn new(
        model: Arc<dyn ModelClient>,
        worker: Arc<ResearchWorker>,
        store: Arc<CitationStore>,
        worker_pool_size: usize,
        max_sub_questions: usize,
        max_iterations: u32,
        structured_retries: u32,
    ) -> Self {
        Self {
            model,
            worker,
            store,
            worker_pool_size,
            max_sub_questions,
            max_iterations,
            structured_retries,
        }
    }

    /// Decompose the brief into 1..=max sub-questions with unique text.
    ///
    /// Degrades to a single sub-question carrying the objective verbatim if
    /// the model produces nothing usable; decomposition failure never kills
    /// a run on its own.
    pub async fn plan(&self, brief: &ResearchBrief) -> Vec<SubQuestion> {
        let prompt = build_decompose_prompt(brief, self.max_sub_questions);

        let texts = match infer_structured::<Decomposition>(
            self.model.as_ref(),
            DECOMPOSE_SYSTEM_PROMPT,
            &prompt,
            self.structured_retries,
        )
        .await
        {
            Ok(decomposition) => {
                if let Some(reflection) = &decomposition.reflection {
                    tracing::debug!("Decomposition reflection: {}", reflection);
                }
                decomposition.sub_questions
            }
            Err(e) => {
                tracing::warn!("Decomposition failed, falling back to the objective: {}", e);
                Vec::new()
            }
        };

        let mut questions = Vec::new();
        let mut seen = HashSet::new();
        for text in texts {
            let text = text.trim().to_string();
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }
            let id = questions.len() as u32 + 1;
            questions.push(SubQuestion::new(id, text, id));
            if questions.len() >= self.max_sub_questions {
                break;
            }
        }

        if questions.is_empty() {
            questions.push(SubQuestion::new(1, brief.objective.clone(), 1));
        }

        questions
    }

    /// Dispatch every pending sub-question through a bounded work-stealing
    /// pool: at most `worker_pool_size` in flight, and the next pending
    /// question starts the moment a slot frees up.
    pub async fn dispatch(
        &self,
        questions: &mut [SubQuestion],
        cancel: &CancellationToken,
    ) -> Vec<FindingBundle> {
        let semaphore = Arc::new(Semaphore::new(self.worker_pool_size));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel::<u32>();
        let mut tasks = FuturesUnordered::new();

        let mut pending: Vec<SubQuestion> = questions
            .iter()
            .filter(|q| q.status == SubQuestionStatus::Pending)
            .cloned()
            .collect();
        // Lower priority value dispatches first
        pending.sort_by_key(|q| q.priority);

        for question in pending {
            let semaphore = semaphore.clone();
            let worker = self.worker.clone();
            let cancel = cancel.clone();
            let started_tx = started_tx.clone();

            tasks.push(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // Pool torn down; report the attempt as failed.
                        return FindingBundle {
                            sub_question_id: question.id,
                            claims: Vec::new(),
                            raw_tool_call_count: 0,
                            worker_status: WorkerStatus::Failed,
                        };
                    }
                };
                let _ = started_tx.send(question.id);
                worker.research(&question, &cancel).await
            });
        }
        drop(started_tx);

        let mut bundles = Vec::new();
        loop {
            tokio::select! {
                Some(id) = started_rx.recv() => {
                    if let Some(q) = questions.iter_mut().find(|q| q.id == id) {
                        if q.status == SubQuestionStatus::Pending {
                            q.status = SubQuestionStatus::InProgress;
                        }
                    }
                }
                maybe_bundle = tasks.next() => {
                    let Some(bundle) = maybe_bundle else { break };
                    if let Some(q) = questions
                        .iter_mut()
                        .find(|q| q.id == bundle.sub_question_id)
                    {
                        q.status = if bundle.worker_status == WorkerStatus::Failed {
                            SubQuestionStatus::Failed
                        } else {
                            SubQuestionStatus::Completed
                        };
                    }
                    bundles.push(bundle);
                }
            }
        }

        bundles
    }

    /// Run the sufficiency loop to completion and return the frozen
    /// evidence set.
    ///
    /// # Errors
    ///
    /// `ResearchExhausted` only when zero claims were gathered across every
    /// iteration; any other worker-level failure degrades into partial
    /// evidence.
    pub async fn run(
        &self,
        brief: &ResearchBrief,
        cancel: &CancellationToken,
    ) -> Result<SupervisorOutcome> {
        let mut questions = self.plan(brief).await;
        tracing::info!(count = questions.len(), "Decomposed brief into sub-questions");

        let mut evidence = EvidenceSet::default();
        let mut unsatisfied_aspects: Vec<String> = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            tracing::info!(iteration = iterations, max = self.max_iterations, "Dispatching research workers");

            let mut bundles = self.dispatch(&mut questions, cancel).await;
            // Bundles complete in arbitrary order; merge by sub-question id
            // so rendered claim order is reproducible across runs.
            bundles.sort_by_key(|b| b.sub_question_id);
            self.merge(&mut evidence, &bundles);

            tracing::info!(
                iteration = iterations,
                claims = evidence.claims.len(),
                citations = evidence.citation_index.len(),
                "Merged finding bundles"
            );

            if cancel.is_cancelled() {
                tracing::warn!("Run cancelled; freezing evidence as-is");
                unsatisfied_aspects = criteria_texts(brief);
                break;
            }

            let verdict = match self.evaluate_sufficiency(brief, &evidence).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    // Cannot judge; freeze rather than loop blindly, and
                    // leave every criterion marked unverified.
                    tracing::warn!("Sufficiency evaluation failed, freezing evidence: {}", e);
                    unsatisfied_aspects = criteria_texts(brief);
                    break;
                }
            };
            if verdict.is_sufficient {
                tracing::info!(iteration = iterations, "Evidence judged sufficient: {}", verdict.rationale);
                unsatisfied_aspects.clear();
                break;
            }

            tracing::info!(
                iteration = iterations,
                missing = verdict.missing_aspects.len(),
                "Evidence insufficient: {}",
                verdict.rationale
            );
            unsatisfied_aspects = verdict.missing_aspects.clone();

            if iterations >= self.max_iterations {
                tracing::warn!("Iteration budget exhausted; freezing evidence as-is");
                break;
            }

            self.add_follow_up_questions(&mut questions, &verdict.missing_aspects);
            // Failed attempts become eligible again now that the verdict
            // asked for more evidence.
            for question in questions.iter_mut() {
                if question.status == SubQuestionStatus::Failed {
                    question.status = SubQuestionStatus::Pending;
                }
            }

            if !questions
                .iter()
                .any(|q| q.status == SubQuestionStatus::Pending)
            {
                tracing::info!("No dispatchable sub-questions remain; ending loop");
                break;
            }
        }

        if evidence.is_empty() {
            return Err(ResearchError::ResearchExhausted(format!(
                "No evidence gathered for '{}' after {} iteration(s)",
                brief.objective, iterations
            )));
        }

        Ok(SupervisorOutcome {
            evidence,
            sub_questions: questions,
            iterations,
            unsatisfied_aspects,
        })
    }

    /// Fold bundles into the evidence set. Order-independent: claims
    /// append and citations dedup by content-addressed id.
    fn merge(&self, evidence: &mut EvidenceSet, bundles: &[FindingBundle]) {
        for bundle in bundles {
            let citation_ids: Vec<String> = bundle
                .claims
                .iter()
                .flat_map(|c| c.supporting_citation_ids.iter().cloned())
                .collect();
            let citations: Vec<Citation> = self.store.resolve(&citation_ids);
            evidence.merge_bundle(bundle, &citations);
        }
    }

    async fn evaluate_sufficiency(
        &self,
        brief: &ResearchBrief,
        evidence: &EvidenceSet,
    ) -> Result<SufficiencyVerdict> {
        if evidence.is_empty() {
            return Ok(SufficiencyVerdict {
                is_sufficient: false,
                rationale: "No evidence has been gathered yet".to_string(),
                missing_aspects: criteria_texts(brief),
            });
        }

        let prompt = build_sufficiency_prompt(brief, evidence);
        infer_structured(
            self.model.as_ref(),
            SUFFICIENCY_SYSTEM_PROMPT,
            &prompt,
            self.structured_retries,
        )
        .await
    }

    /// Add one new sub-question per missing aspect, suppressing duplicates
    /// of existing question text (case-insensitive).
    fn add_follow_up_questions(&self, questions: &mut Vec<SubQuestion>, missing_aspects: &[String]) {
        let mut seen: HashSet<String> =
            questions.iter().map(|q| q.text.to_lowercase()).collect();
        let mut next_id = questions.iter().map(|q| q.id).max().unwrap_or(0) + 1;

        for aspect in missing_aspects {
            let text = aspect.trim().to_string();
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }
            tracing::debug!(id = next_id, "Adding follow-up sub-question: {}", text);
            questions.push(SubQuestion::new(next_id, text, next_id));
            next_id += 1;
        }
    }
}

fn criteria_texts(brief: &ResearchBrief) -> Vec<String> {
    brief
        .evaluation_criteria
        .iter()
        .map(|c| c.text.clone())
        .collect()
}

fn build_decompose_prompt(brief: &ResearchBrief, max_sub_questions: usize) -> String {
    let mut prompt = format!(
        "Research objective: {}\n\nEvaluation criteria:\n",
        brief.objective
    );
    for criterion in &brief.evaluation_criteria {
        prompt.push_str(&format!("- {}\n", criterion.text));
    }
    if !brief.constraints.is_empty() {
        prompt.push_str("\nConstraints:\n");
        for constraint in &brief.constraints {
            prompt.push_str(&format!("- {}\n", constraint));
        }
    }
    prompt.push_str(&format!(
        "\nProduce between 1 and {} sub-questions.",
        max_sub_questions
    ));
    prompt
}

fn build_sufficiency_prompt(brief: &ResearchBrief, evidence: &EvidenceSet) -> String {
    let mut prompt = format!(
        "Research objective: {}\n\nEvaluation criteria:\n",
        brief.objective
    );
    for criterion in &brief.evaluation_criteria {
        prompt.push_str(&format!("- {}\n", criterion.text));
    }
    prompt.push_str("\nGathered claims:\n");
    for claim in &evidence.claims {
        prompt.push_str(&format!(
            "- {} (sources: {})\n",
            claim.text,
            claim.supporting_citation_ids.join(", ")
        ));
    }
    prompt.push_str("\nIs this evidence sufficient to satisfy every criterion?");
    prompt
}
