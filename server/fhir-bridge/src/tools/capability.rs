use crate::summaries::capability_statement;
use crate::tools::fhir_failure;
use async_trait::async_trait;
use fhir_client::FhirClient;
use mcp_server::{McpResult, McpTool, ToolInput, ToolResult};
use serde_json::{json, Value};
use std::sync::Arc;

/// Capability statement tool
pub struct CapabilityStatementTool {
    client: Arc<FhirClient>,
}

impl CapabilityStatementTool {
    pub fn new(client: Arc<FhirClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl McpTool for CapabilityStatementTool {
    fn name(&self) -> &str {
        "get_capability_statement"
    }

    fn description(&self) -> &str {
        "Get FHIR server capabilities"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: ToolInput) -> McpResult<ToolResult> {
        match self.client.capabilities().await {
            Ok(statement) => {
                let text = capability_statement(&statement);
                Ok(ToolResult::success(statement).with_rendered(text))
            }
            Err(e) => Ok(fhir_failure("Error retrieving capability statement", &e)),
        }
    }
}
