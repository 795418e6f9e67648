//! Healthcare tools exposed over MCP
//!
//! Remote problems (404, unreachable server, malformed payloads) become error
//! tool results with a readable message. Only bad arguments surface as
//! JSON-RPC errors.

pub mod capability;
pub mod conditions;
pub mod patients;
pub mod quality;
pub mod search;

use fhir_client::FhirError;
use mcp_server::{McpError, McpResult, ToolResult};
use serde_json::{json, Map, Value};
use tracing::warn;

pub use capability::CapabilityStatementTool;
pub use conditions::FindPatientsWithConditionsTool;
pub use patients::GetPatientTool;
pub use quality::AssessDataQualityTool;
pub use search::SearchTool;

/// Error result for a failed FHIR call, carrying status and OperationOutcome
pub(crate) fn fhir_failure(context: &str, err: &FhirError) -> ToolResult {
    warn!(error = %err, "{}", context);
    let outcome = match err {
        FhirError::Remote { outcome: Some(outcome), .. } => serde_json::to_value(outcome).ok(),
        _ => None,
    };
    ToolResult::error(format!("{}: {}", context, err)).with_data(json!({
        "status": err.status(),
        "outcome": outcome,
    }))
}

/// Tool arguments as an object; `null` counts as no arguments
pub(crate) fn argument_object(arguments: Value) -> McpResult<Map<String, Value>> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(McpError::InvalidParams(format!(
            "arguments must be an object, got {}",
            other
        ))),
    }
}

/// Render a scalar argument as a query parameter value
pub(crate) fn query_value(name: &str, value: &Value) -> McpResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(McpError::InvalidParams(format!(
            "'{}' must be a string, number or boolean",
            name
        ))),
    }
}

/// Positive `_count`, defaulting when absent
pub(crate) fn count_argument(arguments: &Map<String, Value>, default: u32) -> McpResult<u32> {
    let Some(value) = arguments.get("_count") else {
        return Ok(default);
    };
    let count = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count
        .filter(|&c| c > 0)
        .and_then(|c| u32::try_from(c).ok())
        .ok_or_else(|| McpError::InvalidParams(format!("'_count' must be a positive integer, got {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(json!({}), Some(10))]
    #[case(json!({"_count": 25}), Some(25))]
    #[case(json!({"_count": "7"}), Some(7))]
    #[case(json!({"_count": 0}), None)]
    #[case(json!({"_count": -3}), None)]
    #[case(json!({"_count": "many"}), None)]
    fn test_count_argument(#[case] arguments: Value, #[case] expected: Option<u32>) {
        let arguments = argument_object(arguments).unwrap();
        assert_eq!(count_argument(&arguments, 10).ok(), expected);
    }

    #[test]
    fn test_arguments_must_be_an_object() {
        assert!(argument_object(Value::Null).unwrap().is_empty());
        assert!(matches!(argument_object(json!([1])), Err(McpError::InvalidParams(_))));
    }

    #[test]
    fn test_remote_failure_keeps_outcome() {
        let err = FhirError::Remote {
            status: 404,
            outcome: Some(fhir_client::OperationOutcome::single("error", "not-found", "gone")),
        };
        let result = fhir_failure("Error retrieving patient", &err);
        assert!(result.is_error());
        assert!(result.error.as_deref().unwrap().contains("gone"));
        let data = result.data.unwrap();
        assert_eq!(data["status"], 404);
        assert_eq!(data["outcome"]["issue"][0]["code"], "not-found");
    }
}
