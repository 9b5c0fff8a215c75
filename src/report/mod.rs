//! Report synthesis
//!
//! Consumes the frozen evidence set and the research brief and produces the
//! final report. Grounding is enforced at the output boundary: every
//! factual sentence must carry at least one `[^id]` marker resolving in the
//! evidence's citation index, and a draft that violates this is rejected
//! and re-synthesized up to the configured retry bound before the run fails
//! with `UngroundedClaim`.
//!
//! Section ordering follows the brief's evaluation criteria where
//! applicable; the model falls back to topical grouping otherwise.

use crate::llm::{infer_structured, ModelClient};
use crate::types::{
    Citation, EvidenceSet, ReportDraft, ReportSection, ResearchBrief, ResearchError, Result,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

const REPORT_SYSTEM_PROMPT: &str = "You write research reports from cited claims. Structure the \
report into sections ordered by the evaluation criteria; group remaining material topically. \
Every factual sentence must end with at least one citation marker of the form [^id], placed \
before the sentence-ending punctuation, using only the ids listed. Never state a fact you cannot \
mark with one of the given ids.";

#[derive(Debug, Deserialize, JsonSchema)]
struct SectionDraft {
    heading: String,
    body: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReportSections {
    sections: Vec<SectionDraft>,
}

/// Produces the final cited report from frozen evidence.
pub struct ReportSynthesizer {
    model: Arc<dyn ModelClient>,
    structured_retries: u32,
    synthesis_retries: u32,
}

impl ReportSynthesizer {
    pub fn new(model: Arc<dyn ModelClient>, structured_retries: u32, synthesis_retries: u32) -> Self {
        Self {
            model,
            structured_retries,
            synthesis_retries,
        }
    }

    /// Synthesize the report.
    ///
    /// # Errors
    ///
    /// `UngroundedClaim` when every attempt produced a sentence that could
    /// not be mapped to a citation; model errors propagate as-is.
    pub async fn synthesize(
        &self,
        brief: &ResearchBrief,
        evidence: &EvidenceSet,
        unsatisfied_criteria: &[String],
    ) -> Result<ReportDraft> {
        if evidence.is_empty() {
            return Err(ResearchError::UngroundedClaim(
                "No evidence available to ground a report".to_string(),
            ));
        }

        let mut prompt = build_report_prompt(brief, evidence);
        let mut last_rejection = String::new();

        for attempt in 0..=self.synthesis_retries {
            let drafted: ReportSections = infer_structured(
                self.model.as_ref(),
                REPORT_SYSTEM_PROMPT,
                &prompt,
                self.structured_retries,
            )
            .await?;

            match validate_grounding(&drafted.sections, &evidence.citation_index) {
                Ok(source_ids) => {
                    let sources = source_ids
                        .iter()
                        .filter_map(|id| evidence.citation_index.get(id).cloned())
                        .collect::<Vec<Citation>>();

                    return Ok(ReportDraft {
                        sections: drafted
                            .sections
                            .into_iter()
                            .map(|s| ReportSection {
                                heading: s.heading,
                                body: s.body,
                            })
                            .collect(),
                        sources,
                        unsatisfied_criteria: unsatisfied_criteria.to_vec(),
                    });
                }
                Err(rejection) => {
                    tracing::warn!(attempt, "Rejected ungrounded draft: {}", rejection);
                    last_rejection = rejection;
                    // Feed the rejection back so the retry can fix it.
                    prompt = format!(
                        "{}\n\nYour previous draft was rejected: {}\nEvery factual sentence must carry a [^id] marker from the list above.",
                        build_report_prompt(brief, evidence),
                        last_rejection
                    );
                }
            }
        }

        Err(ResearchError::UngroundedClaim(last_rejection))
    }
}

fn build_report_prompt(brief: &ResearchBrief, evidence: &EvidenceSet) -> String {
    let mut prompt = format!(
        "Research objective: {}\n\nEvaluation criteria, in report order:\n",
        brief.objective
    );
    for criterion in &brief.evaluation_criteria {
        prompt.push_str(&format!("- {}\n", criterion.text));
    }

    prompt.push_str("\nClaims:\n");
    for claim in &evidence.claims {
        prompt.push_str(&format!(
            "- {} [{}]\n",
            claim.text,
            claim.supporting_citation_ids.join(", ")
        ));
    }

    let mut ids: Vec<&String> = evidence.citation_index.keys().collect();
    ids.sort();
    prompt.push_str("\nUsable citation ids: ");
    prompt.push_str(
        &ids.iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    prompt.push_str("\n\nWrite the report sections.");
    prompt
}

/// Check that every factual sentence carries at least one resolvable
/// marker. Returns cited ids in first-use order.
fn validate_grounding(
    sections: &[SectionDraft],
    citation_index: &HashMap<String, Citation>,
) -> std::result::Result<Vec<String>, String> {
    let mut source_ids = Vec::new();

    for section in sections {
        for sentence in split_sentences(&section.body) {
            let markers = extract_markers(&sentence);

            if markers.is_empty() {
                if sentence.chars().any(|c| c.is_alphabetic()) {
                    return Err(format!(
                        "Uncited sentence in section '{}': {}",
                        section.heading,
                        sentence.trim()
                    ));
                }
                continue;
            }

            for marker in markers {
                if !citation_index.contains_key(&marker) {
                    return Err(format!(
                        "Unknown citation id '{}' in section '{}'",
                        marker, section.heading
                    ));
                }
                if !source_ids.contains(&marker) {
                    source_ids.push(marker);
                }
            }
        }
    }

    Ok(source_ids)
}

/// Split a body into sentence units. A trailing fragment consisting only of
/// markers and punctuation is folded into the sentence before it, so
/// `claim.[^id]` and `claim[^id].` both validate.
fn split_sentences(body: &str) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in body.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '\n') {
            pieces.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }

    let mut sentences: Vec<String> = Vec::new();
    for piece in pieces {
        let mut rest = piece.as_str();

        // Markers rendered after the terminator belong to the sentence
        // they follow.
        if !sentences.is_empty() {
            loop {
                let trimmed = rest.trim_start();
                let leading_ws = rest.len() - trimmed.len();
                if trimmed.starts_with("[^") {
                    if let Some(end) = trimmed.find(']') {
                        let (head, tail) = rest.split_at(leading_ws + end + 1);
                        let last = sentences.len() - 1;
                        sentences[last].push_str(head);
                        rest = tail;
                        continue;
                    }
                }
                break;
            }
        }

        if rest.trim().is_empty() {
            continue;
        }
        sentences.push(rest.to_string());
    }

    sentences
}

/// Pull `[^id]` markers out of a text span.
fn extract_markers(text: &str) -> Vec<String> {
    let mut markers = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("[^") {
        let after = &rest[start + 2..];
        match after.find(']') {
            Some(end) => {
                let id = after[..end].trim();
                if !id.is_empty() {
                    markers.push(id.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    markers
}
