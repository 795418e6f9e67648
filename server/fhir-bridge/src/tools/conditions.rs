//! Patients referenced by Condition records
//!
//! Useful on servers where Patient searches come back empty but clinical data
//! still points at patients.

use crate::tools::{argument_object, count_argument, fhir_failure, query_value};
use async_trait::async_trait;
use data_quality::{parse_reference, ReferenceTarget};
use fhir_client::{Bundle, FhirClient, ResourceType};
use mcp_server::{McpResult, McpTool, ToolInput, ToolResult};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Conditions fetched when the caller gives no `_count`
pub const DEFAULT_CONDITION_COUNT: u32 = 100;

/// Patient ids listed before the remainder is summarised
const LISTED_IDS: usize = 20;

pub struct FindPatientsWithConditionsTool {
    client: Arc<FhirClient>,
}

impl FindPatientsWithConditionsTool {
    pub fn new(client: Arc<FhirClient>) -> Self {
        Self { client }
    }
}

/// Sorted unique ids of the patients named in `Condition.subject`
pub fn subject_patient_ids(bundle: &Bundle) -> BTreeSet<String> {
    let no_contained = HashSet::new();
    bundle
        .resources()
        .filter_map(|condition| condition.pointer("/subject/reference").and_then(Value::as_str))
        .filter_map(|reference| match parse_reference(reference, &no_contained) {
            ReferenceTarget::Resource {
                resource_type: ResourceType::Patient,
                id,
            } => Some(id),
            _ => None,
        })
        .collect()
}

fn summarize(patient_ids: &BTreeSet<String>) -> String {
    let mut lines = vec![format!("Found {} unique patients with conditions", patient_ids.len())];
    if patient_ids.is_empty() {
        lines.push("No patient IDs found in condition records".to_string());
        return lines.join("\n");
    }

    lines.push(String::new());
    lines.push("Patient IDs:".to_string());
    lines.extend(patient_ids.iter().take(LISTED_IDS).map(|id| format!("- {}", id)));
    if patient_ids.len() > LISTED_IDS {
        lines.push(format!("... and {} more", patient_ids.len() - LISTED_IDS));
    }
    lines.join("\n")
}

#[async_trait]
impl McpTool for FindPatientsWithConditionsTool {
    fn name(&self) -> &str {
        "find_patients_with_conditions"
    }

    fn description(&self) -> &str {
        "Find unique patient IDs from condition records (useful when patient records are missing)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "description": "Condition code to filter by (optional)"},
                "_count": {"type": "integer", "description": "Number of results", "default": DEFAULT_CONDITION_COUNT}
            }
        })
    }

    async fn execute(&self, input: ToolInput) -> McpResult<ToolResult> {
        let arguments = argument_object(input.arguments)?;
        let mut query = Vec::new();
        if let Some(code) = arguments.get("code").filter(|code| !code.is_null()) {
            query.push(("code".to_string(), query_value("code", code)?));
        }
        let count = count_argument(&arguments, DEFAULT_CONDITION_COUNT)?;
        query.push(("_count".to_string(), count.to_string()));

        let bundle = match self.client.search(&ResourceType::Condition, &query).await {
            Ok(bundle) => bundle,
            Err(e) => return Ok(fhir_failure("Error searching conditions", &e)),
        };

        let patient_ids = subject_patient_ids(&bundle);
        let data = json!({
            "conditionsScanned": bundle.resources().count(),
            "patientIds": patient_ids,
        });
        Ok(ToolResult::success(data).with_rendered(summarize(&patient_ids)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(references: &[&str]) -> Bundle {
        serde_json::from_value(json!({
            "resourceType": "Bundle",
            "entry": references
                .iter()
                .map(|r| json!({"resource": {"resourceType": "Condition", "subject": {"reference": r}}}))
                .collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[test]
    fn test_unique_sorted_patient_ids() {
        let bundle = bundle(&[
            "Patient/b",
            "Patient/a",
            "http://example.org/fhir/Patient/b/_history/2",
            "Group/g1",
            "not a reference",
        ]);
        let ids: Vec<_> = subject_patient_ids(&bundle).into_iter().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_summary_lists_first_twenty() {
        let ids: BTreeSet<String> = (0..25).map(|i| format!("p{:02}", i)).collect();
        let text = summarize(&ids);
        assert!(text.starts_with("Found 25 unique patients with conditions"));
        assert!(text.contains("- p19"));
        assert!(!text.contains("- p20"));
        assert!(text.ends_with("... and 5 more"));
    }

    #[test]
    fn test_summary_without_patients() {
        assert_eq!(
            summarize(&BTreeSet::new()),
            "Found 0 unique patients with conditions\nNo patient IDs found in condition records"
        );
    }
}
