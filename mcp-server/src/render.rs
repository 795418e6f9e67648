//! Response rendering utilities for MCP tools
//!
//! Turns a [`ToolResult`] into the wire form of a `tools/call` result: a text
//! block for the model plus the structured payload.

use crate::protocol::{CallToolResult, Content, ToolResult};

/// Text shown to the model. Falls back to pretty JSON when a successful
/// result carries no pre-rendered summary.
pub fn render_result(result: &ToolResult) -> String {
    if let Some(rendered) = &result.rendered {
        return rendered.clone();
    }
    if result.is_error() {
        return result.error.clone().unwrap_or_else(|| "Tool execution failed".to_string());
    }
    result
        .data
        .as_ref()
        .and_then(|data| serde_json::to_string_pretty(data).ok())
        .unwrap_or_else(|| "{}".to_string())
}

/// Build the `tools/call` result sent to the client
pub fn to_call_result(result: ToolResult) -> CallToolResult {
    let text = render_result(&result);
    CallToolResult {
        content: vec![Content::Text { text }],
        is_error: result.is_error(),
        structured_content: result.data,
    }
}
