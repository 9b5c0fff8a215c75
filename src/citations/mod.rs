//! Run-scoped citation store
//!
//! Append-only registry mapping a content-addressed id to the source it was
//! retrieved from. Registration is idempotent per `(source_locator,
//! content)` pair: two lookups of the same source within a run resolve to
//! the same citation, no matter which worker got there first. There is no
//! deletion; the store lives exactly as long as the run that owns it.

use crate::types::Citation;
use chrono::Utc;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Derive the content-addressed citation id for a `(locator, content)`
/// pair. Stable across workers and across repeated compressions within a
/// run.
pub fn citation_id(source_locator: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_locator.as_bytes());
    // Separator prevents ambiguity between locator and content bytes
    hasher.update([0x1f]);
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    format!("src-{}", hex::encode(&digest[..8]))
}

/// Thread-safe citation registry shared by all workers of a run.
#[derive(Default)]
pub struct CitationStore {
    citations: RwLock<HashMap<String, Citation>>,
}

impl CitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, returning the winning citation.
    ///
    /// Idempotent: if the same `(source_locator, content)` pair was already
    /// registered, by this worker or any other, the existing citation is
    /// returned unchanged. Under a race the first successful registration
    /// wins and later duplicates observe it.
    pub fn register(&self, source_locator: &str, content: &str) -> Citation {
        let id = citation_id(source_locator, content);

        {
            let citations = self.citations.read();
            if let Some(existing) = citations.get(&id) {
                return existing.clone();
            }
        }

        let mut citations = self.citations.write();
        citations
            .entry(id.clone())
            .or_insert_with(|| Citation {
                id,
                source_locator: source_locator.to_string(),
                retrieved_snippet: content.to_string(),
                retrieved_at: Utc::now(),
            })
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Citation> {
        self.citations.read().get(id).cloned()
    }

    /// Resolve a set of ids, silently skipping any that are unknown.
    pub fn resolve(&self, ids: &[String]) -> Vec<Citation> {
        let citations = self.citations.read();
        ids.iter().filter_map(|id| citations.get(id).cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.citations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.read().is_empty()
    }
}
