//! Local file search tool
//!
//! Scans text files under a configured root directory for a query string
//! and returns a snippet around the first match in each file. Hidden
//! directories and files larger than [`MAX_FILE_BYTES`] are skipped, as is
//! anything that is not valid UTF-8.

use crate::tools::registry::Tool;
use crate::types::{ResearchError, Result, SourceDocument};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Files above this size are not scanned.
const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Characters of context returned around a match.
const SNIPPET_WINDOW: usize = 400;

/// Local file search rooted at a fixed directory.
pub struct LocalFileSearchTool {
    root: PathBuf,
}

impl LocalFileSearchTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn scan(&self, query: &str, max_results: usize) -> Result<Vec<SourceDocument>> {
        if !self.root.is_dir() {
            return Err(ResearchError::ToolUnavailable(format!(
                "File search root is not a directory: {}",
                self.root.display()
            )));
        }

        let needle = query.to_lowercase();
        let mut results = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            if results.len() >= max_results {
                break;
            }

            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                if results.len() >= max_results {
                    break;
                }

                let path = entry.path();
                let name = entry.file_name();
                if name.to_string_lossy().starts_with('.') {
                    continue;
                }

                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                if let Ok(metadata) = entry.metadata().await {
                    if metadata.len() > MAX_FILE_BYTES {
                        continue;
                    }
                }

                let Ok(content) = tokio::fs::read_to_string(&path).await else {
                    continue;
                };

                if let Some(snippet) = snippet_around_match(&content, &needle) {
                    results.push(SourceDocument {
                        source_locator: path.display().to_string(),
                        content: snippet,
                    });
                }
            }
        }

        Ok(results)
    }
}

/// Return a context window around the first case-insensitive match, or
/// `None` if the file does not match.
fn snippet_around_match(content: &str, needle: &str) -> Option<String> {
    let haystack = content.to_lowercase();
    let pos = haystack.find(needle)?;

    let start = pos.saturating_sub(SNIPPET_WINDOW / 2);
    let end = (pos + needle.len() + SNIPPET_WINDOW / 2).min(content.len());

    // Snap to char boundaries
    let start = (0..=start).rev().find(|&i| content.is_char_boundary(i))?;
    let end = (end..=content.len()).find(|&i| content.is_char_boundary(i))?;

    Some(content[start..end].trim().to_string())
}

#[async_trait]
impl Tool for LocalFileSearchTool {
    fn name(&self) -> &str {
        "local_file_search"
    }

    fn description(&self) -> &str {
        "Search local text files under the configured root for a query string"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to look for (case-insensitive)"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of files to return (default: 10)",
                    "default": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Vec<SourceDocument>> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ResearchError::InvalidInput("Missing 'query' parameter".to_string()))?;

        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(10);

        self.scan(query, max_results).await
    }
}
