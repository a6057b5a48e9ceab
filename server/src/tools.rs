use docsearch_core::{format_result, search, Index, QuerySpec, SearchError, CONTENT_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid tool registration: {0}")]
    Registration(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}

pub type ToolFn = fn(&Index, Value) -> Result<Value, ToolError>;

#[derive(Clone, Copy)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: ToolFn,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Name -> handler table, filled once at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry with every tool the server exposes.
    pub fn with_builtin_tools() -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Tool {
            name: "search_documentation",
            description: "Search the documentation. Returns up to 5 text blocks of the form '--- SOURCE: <file> ---' followed by the matching content.",
            handler: search_documentation,
        })?;
        registry.register(Tool {
            name: "search",
            description: "Ranked search with explicit query text, field boosts, top_k, snippet_length and keyword filters. Returns structured results.",
            handler: structured_search,
        })?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if tool.name.trim().is_empty() {
            return Err(ToolError::Registration("tool name must not be empty".into()));
        }
        if self.tools.contains_key(tool.name) {
            return Err(ToolError::Registration(format!("duplicate tool '{}'", tool.name)));
        }
        tracing::debug!(tool = tool.name, "registered tool");
        self.tools.insert(tool.name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> { self.tools.get(name) }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| ToolInfo { name: t.name, description: t.description }).collect()
    }

    pub fn call(&self, name: &str, index: &Index, args: Value) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        (tool.handler)(index, args)
    }
}

#[derive(Deserialize)]
struct SearchDocumentationArgs {
    query: String,
}

fn search_documentation(index: &Index, args: Value) -> Result<Value, ToolError> {
    let args: SearchDocumentationArgs = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    let spec = QuerySpec::new(args.query).with_boost(CONTENT_FIELD, 1.0);
    let blocks: Vec<String> = search(index, &spec)?.iter().map(format_result).collect();
    Ok(Value::from(blocks))
}

fn structured_search(index: &Index, args: Value) -> Result<Value, ToolError> {
    let spec: QuerySpec = serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    let results = search(index, &spec)?;
    serde_json::to_value(results).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
