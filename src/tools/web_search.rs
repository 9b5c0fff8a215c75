//! Web search tool implementation using daedra
//!
//! This module provides web search capabilities via the daedra crate,
//! which uses DuckDuckGo as the search backend.

use crate::tools::registry::Tool;
use crate::types::{ResearchError, Result, SourceDocument};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Web search tool powered by daedra
pub struct WebSearchTool;

impl WebSearchTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information using DuckDuckGo"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)",
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

        let num_results = args
            .get("num_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(10);

        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => Ok(response
                .data
                .iter()
                .map(|r| SourceDocument {
                    source_locator: r.url.clone(),
                    content: format!("{}\n{}", r.title, r.description),
                })
                .collect()),
            Err(e) => Err(ResearchError::ToolUnavailable(format!(
                "Search failed: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_search_tool_definition() {
        let tool = WebSearchTool::new();
        assert_eq!(tool.name(), "web_search");
        assert!(!tool.description().is_empty());

        let schema = tool.parameters_schema();
        assert!(schema.is_object());
        assert!(schema.get("properties").is_some());
    }

    #[tokio::test]
    async fn test_search_missing_query() {
        let tool = WebSearchTool::new();
        let result = tool.execute(json!({})).await;
        assert!(result.is_err());
    }
}
