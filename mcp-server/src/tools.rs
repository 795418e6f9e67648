//! MCP Tools implementation
use crate::error::{McpError, McpResult};
use crate::protocol::{Tool, ToolInput, ToolResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for MCP tool implementations
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Get tool name
    fn name(&self) -> &str;

    /// Get tool description
    fn description(&self) -> &str;

    /// Get input schema (JSON Schema)
    fn input_schema(&self) -> Value;

    /// Execute the tool.
    ///
    /// Problems the caller should see as a tool outcome (remote 404, server
    /// unreachable) belong in an error [`ToolResult`]; return
    /// [`McpError::InvalidParams`] for arguments the tool cannot accept.
    async fn execute(&self, input: ToolInput) -> McpResult<ToolResult>;
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolsRegistry {
    tools: HashMap<String, Arc<dyn McpTool>>,
}

impl ToolsRegistry {
    /// Create an empty tools registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn McpTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all available tools, sorted by name
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .values()
            .map(|t| Tool {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Execute a tool by name
    pub async fn execute(&self, input: ToolInput) -> McpResult<ToolResult> {
        match self.tools.get(&input.name) {
            Some(tool) => tool.execute(input).await,
            None => Err(McpError::UnknownTool(input.name)),
        }
    }
}

/// Deserialize tool arguments, reporting mismatches as invalid params
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> McpResult<T> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| McpError::InvalidParams(e.to_string()))
}
