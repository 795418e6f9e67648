//! Thin search tools
//!
//! Each one forwards its arguments as query parameters to a single search on
//! one resource type and summarises the first page. They differ only in the
//! table values built by the constructors below.

use crate::summaries::{
    care_plan_line, condition_line, diagnostic_report_line, medication_request_line, observation_line, patient_line,
    search_page,
};
use crate::tools::{argument_object, count_argument, fhir_failure, query_value};
use async_trait::async_trait;
use fhir_client::{FhirClient, ResourceType};
use mcp_server::{McpResult, McpTool, ToolInput, ToolResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// `_count` sent when the caller gives none
pub const DEFAULT_COUNT: u32 = 10;

/// One documented search parameter
#[derive(Debug, Clone, Copy)]
pub struct SearchParam {
    pub name: &'static str,
    pub description: &'static str,
}

const fn param(name: &'static str, description: &'static str) -> SearchParam {
    SearchParam { name, description }
}

const PATIENT: SearchParam = param("patient", "Patient ID");

const PATIENT_SEARCH: &[SearchParam] = &[param("name", "Patient name"), param("family", "Patient family name")];
const OBSERVATION_SEARCH: &[SearchParam] = &[PATIENT];
const CONDITION_SEARCH: &[SearchParam] = &[
    PATIENT,
    param("code", "Condition code (e.g., SNOMED code)"),
    param("clinical-status", "Clinical status (active, resolved, etc.)"),
];
const MEDICATION_REQUEST_SEARCH: &[SearchParam] = &[
    PATIENT,
    param("status", "Status (active, completed, etc.)"),
    param("intent", "Intent (order, plan, etc.)"),
];
const DIAGNOSTIC_REPORT_SEARCH: &[SearchParam] = &[
    PATIENT,
    param("status", "Report status"),
    param("category", "Category of report"),
];
const CARE_PLAN_SEARCH: &[SearchParam] = &[
    PATIENT,
    param("status", "Plan status (active, completed, etc.)"),
    param("category", "Category of care plan"),
];

pub struct SearchTool {
    client: Arc<FhirClient>,
    name: &'static str,
    description: &'static str,
    resource_type: ResourceType,
    params: &'static [SearchParam],
    /// Plural noun used in summaries ("observations")
    noun: &'static str,
    heading: &'static str,
    shown: usize,
    line: fn(&Value) -> String,
    /// Forward only `_count`, ignoring other arguments
    unfiltered: bool,
}

impl SearchTool {
    pub fn patients(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_patients",
            description: "Search for patients in the FHIR server",
            resource_type: ResourceType::Patient,
            params: PATIENT_SEARCH,
            noun: "patients",
            heading: "Patients found",
            shown: 10,
            line: patient_line,
            unfiltered: false,
        }
    }

    pub fn all_patients(client: Arc<FhirClient>) -> Self {
        Self {
            name: "search_all_patients",
            description: "Get all patients (no filters)",
            params: &[],
            unfiltered: true,
            ..Self::patients(client)
        }
    }

    pub fn observations(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_observations",
            description: "Search for observations",
            resource_type: ResourceType::Observation,
            params: OBSERVATION_SEARCH,
            noun: "observations",
            heading: "Observations",
            shown: 5,
            line: observation_line,
            unfiltered: false,
        }
    }

    pub fn conditions(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_conditions",
            description: "Search for conditions/diagnoses (e.g., diabetes)",
            resource_type: ResourceType::Condition,
            params: CONDITION_SEARCH,
            noun: "conditions",
            heading: "Conditions",
            shown: 10,
            line: condition_line,
            unfiltered: false,
        }
    }

    pub fn medication_requests(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_medication_requests",
            description: "Search for medication requests/prescriptions (e.g., diabetes medications)",
            resource_type: ResourceType::MedicationRequest,
            params: MEDICATION_REQUEST_SEARCH,
            noun: "medication requests",
            heading: "Medication Requests",
            shown: 10,
            line: medication_request_line,
            unfiltered: false,
        }
    }

    pub fn diagnostic_reports(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_diagnostic_reports",
            description: "Search for diagnostic reports (e.g., lab results, HbA1c tests)",
            resource_type: ResourceType::DiagnosticReport,
            params: DIAGNOSTIC_REPORT_SEARCH,
            noun: "diagnostic reports",
            heading: "Diagnostic Reports",
            shown: 10,
            line: diagnostic_report_line,
            unfiltered: false,
        }
    }

    pub fn care_plans(client: Arc<FhirClient>) -> Self {
        Self {
            client,
            name: "search_care_plans",
            description: "Search for care plans (e.g., diabetes management plans)",
            resource_type: ResourceType::CarePlan,
            params: CARE_PLAN_SEARCH,
            noun: "care plans",
            heading: "Care Plans",
            shown: 10,
            line: care_plan_line,
            unfiltered: false,
        }
    }

    /// Query parameters for one call; `_count` always comes last
    fn query(&self, arguments: &Map<String, Value>) -> McpResult<Vec<(String, String)>> {
        let mut query = Vec::new();
        if !self.unfiltered {
            for (name, value) in arguments {
                if name == "_count" || value.is_null() {
                    continue;
                }
                query.push((name.clone(), query_value(name, value)?));
            }
        }
        query.push(("_count".to_string(), count_argument(arguments, DEFAULT_COUNT)?.to_string()));
        Ok(query)
    }
}

#[async_trait]
impl McpTool for SearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in self.params {
            properties.insert(p.name.to_string(), json!({"type": "string", "description": p.description}));
        }
        properties.insert(
            "_count".to_string(),
            json!({"type": "integer", "description": "Number of results", "default": DEFAULT_COUNT}),
        );
        json!({"type": "object", "properties": properties})
    }

    async fn execute(&self, input: ToolInput) -> McpResult<ToolResult> {
        let arguments = argument_object(input.arguments)?;
        let query = self.query(&arguments)?;
        debug!(tool = self.name, resource_type = %self.resource_type, params = query.len(), "Searching");

        let bundle = match self.client.search(&self.resource_type, &query).await {
            Ok(bundle) => bundle,
            Err(e) => return Ok(fhir_failure(&format!("Error searching {}", self.noun), &e)),
        };

        let text = search_page(self.noun, self.heading, &bundle, self.shown, self.line);
        let entries: Vec<&Value> = bundle.resources().collect();
        let data = json!({
            "resourceType": self.resource_type,
            "total": bundle.total,
            "returned": entries.len(),
            "entries": entries,
        });
        Ok(ToolResult::success(data).with_rendered(text))
    }
}
