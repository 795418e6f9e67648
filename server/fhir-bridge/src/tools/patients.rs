use crate::summaries::patient_details;
use crate::tools::fhir_failure;
use async_trait::async_trait;
use fhir_client::{FhirClient, ResourceType};
use mcp_server::{parse_arguments, McpError, McpResult, McpTool, ToolInput, ToolResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GetPatientArgs {
    #[serde(default)]
    patient_id: Option<String>,
}

/// Get Patient tool
pub struct GetPatientTool {
    client: Arc<FhirClient>,
}

impl GetPatientTool {
    pub fn new(client: Arc<FhirClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl McpTool for GetPatientTool {
    fn name(&self) -> &str {
        "get_patient"
    }

    fn description(&self) -> &str {
        "Get a specific patient by their ID"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["patient_id"],
            "properties": {
                "patient_id": {"type": "string", "description": "The patient ID to retrieve"}
            }
        })
    }

    async fn execute(&self, input: ToolInput) -> McpResult<ToolResult> {
        let args: GetPatientArgs = parse_arguments(input.arguments)?;
        let patient_id = args
            .patient_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| McpError::InvalidParams("Patient ID is required".to_string()))?;

        debug!(patient_id = %patient_id, "Reading patient");
        match self.client.read(&ResourceType::Patient, &patient_id).await {
            Ok(patient) => {
                let text = patient_details(&patient);
                Ok(ToolResult::success(patient).with_rendered(text))
            }
            Err(e) if e.status() == Some(404) => {
                let mut result = fhir_failure("Error retrieving patient", &e);
                result.error = Some(format!("Patient with ID {} not found", patient_id));
                Ok(result)
            }
            Err(e) => Ok(fhir_failure("Error retrieving patient", &e)),
        }
    }
}
