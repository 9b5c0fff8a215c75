use crate::types::{ResearchError, Result, SourceDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Description of a tool, offered to the research model when it chooses its
/// next call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Vec<SourceDocument>>;
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the two research capabilities: web search and
    /// local file search rooted at `file_search_root`.
    pub fn with_default_tools(file_search_root: impl Into<std::path::PathBuf>) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(crate::tools::web_search::WebSearchTool::new()));
        registry.register(Arc::new(crate::tools::file_search::LocalFileSearchTool::new(
            file_search_root,
        )));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        // Stable ordering keeps prompts reproducible across runs
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<Vec<SourceDocument>> {
        if let Some(tool) = self.tools.get(name) {
            tool.execute(args).await
        } else {
            Err(ResearchError::ToolUnavailable(format!(
                "Tool not found: {}",
                name
            )))
        }
    }

    /// Get a list of all registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Check if a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tool_names().len(), 0);
    }

    #[test]
    fn test_registry_with_default_tools() {
        let registry = ToolRegistry::with_default_tools(".");

        assert!(registry.has_tool("web_search"));
        assert!(registry.has_tool("local_file_search"));
    }

    #[test]
    fn test_get_tool_definitions() {
        let registry = ToolRegistry::with_default_tools(".");
        let definitions = registry.get_tool_definitions();

        assert_eq!(definitions.len(), 2);
        for def in &definitions {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert!(def.parameters.is_object());
        }
        // Sorted by name
        assert_eq!(definitions[0].name, "local_file_search");
        assert_eq!(definitions[1].name, "web_search");
    }

    #[tokio::test]
    async fn test_nonexistent_tool() {
        let registry = ToolRegistry::new();

        let result = registry.execute("nonexistent_tool", serde_json::json!({})).await;
        assert!(matches!(result, Err(ResearchError::ToolUnavailable(_))));
    }
}
