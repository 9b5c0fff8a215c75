//! Evidence compression
//!
//! Reduces a worker's raw tool output into a compact set of claims, each
//! tied to one or more citation-store entries. A candidate claim the model
//! cannot tie to a registered citation is dropped here and never reaches
//! the evidence set; grounding is enforced at the point of creation, not
//! only at render time.
//!
//! Compression is deterministic with respect to citation identity: ids are
//! content-addressed, so compressing the same raw outputs against the same
//! store yields claims citing the same ids regardless of arrival order.

use crate::citations::CitationStore;
use crate::llm::{infer_structured, ModelClient};
use crate::types::{Citation, Claim, ModelErrorKind, ResearchError, Result, SourceDocument};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

const COMPRESS_SYSTEM_PROMPT: &str = "You extract factual claims from retrieved source material. \
Each claim must be a single self-contained statement supported by the listed sources. \
Reference sources only by the ids given; never invent ids. \
Assign a confidence between 0.0 and 1.0 reflecting how directly the sources support the claim.";

#[derive(Debug, Deserialize, JsonSchema)]
struct CandidateClaim {
    text: String,
    citation_ids: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CandidateClaimList {
    claims: Vec<CandidateClaim>,
}

/// Turns raw `(source_locator, content)` pairs into cited claims, using the
/// citation store to register and deduplicate sources.
pub struct EvidenceCompressor {
    model: Arc<dyn ModelClient>,
    store: Arc<CitationStore>,
    parse_retries: u32,
}

impl EvidenceCompressor {
    pub fn new(model: Arc<dyn ModelClient>, store: Arc<CitationStore>, parse_retries: u32) -> Self {
        Self {
            model,
            store,
            parse_retries,
        }
    }

    /// Compress raw outputs into claims.
    ///
    /// Refusal or empty model output degrades to zero claims rather than an
    /// error; transport and parse failures propagate after the bounded
    /// retries inside [`infer_structured`].
    pub async fn compress(
        &self,
        sub_question: &str,
        raw_outputs: &[SourceDocument],
    ) -> Result<Vec<Claim>> {
        if raw_outputs.is_empty() {
            return Ok(Vec::new());
        }

        let citations = self.register_sources(raw_outputs);
        let known_ids: HashSet<&str> = citations.iter().map(|c| c.id.as_str()).collect();

        let prompt = build_compress_prompt(sub_question, &citations);

        let extracted: CandidateClaimList = match infer_structured(
            self.model.as_ref(),
            COMPRESS_SYSTEM_PROMPT,
            &prompt,
            self.parse_retries,
        )
        .await
        {
            Ok(list) => list,
            Err(ResearchError::Model {
                kind: ModelErrorKind::Empty,
                message,
            }) => {
                tracing::warn!("Compression model returned nothing usable: {}", message);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut claims = Vec::new();
        for candidate in extracted.claims {
            let supporting: Vec<String> = candidate
                .citation_ids
                .iter()
                .filter(|id| known_ids.contains(id.as_str()))
                .cloned()
                .collect();

            if supporting.is_empty() {
                tracing::debug!("Dropping uncited candidate claim: {}", candidate.text);
                continue;
            }

            claims.push(Claim {
                text: candidate.text,
                supporting_citation_ids: supporting,
                confidence: candidate.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            });
        }

        Ok(claims)
    }

    /// Register every raw output, keeping first-seen order and collapsing
    /// duplicates to their winning citation.
    fn register_sources(&self, raw_outputs: &[SourceDocument]) -> Vec<Citation> {
        let mut seen = HashSet::new();
        let mut citations = Vec::new();
        for doc in raw_outputs {
            let citation = self.store.register(&doc.source_locator, &doc.content);
            if seen.insert(citation.id.clone()) {
                citations.push(citation);
            }
        }
        citations
    }
}

fn build_compress_prompt(sub_question: &str, citations: &[Citation]) -> String {
    let mut prompt = format!("Research question: {}\n\nSources:\n", sub_question);
    for citation in citations {
        prompt.push_str(&format!(
            "[{}] {}\n{}\n\n",
            citation.id, citation.source_locator, citation.retrieved_snippet
        ));
    }
    prompt.push_str("Extract the claims relevant to the research question.");
    prompt
}
