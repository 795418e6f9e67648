//! OperationOutcome: the structured error payload returned by FHIR servers
use serde::{Deserialize, Serialize};

/// FHIR OperationOutcome (only the parts used for diagnostics)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    #[serde(default)]
    pub issue: Vec<OutcomeIssue>,
}

/// One issue inside an OperationOutcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeIssue {
    #[serde(default = "unknown")]
    pub severity: String,
    #[serde(default = "unknown")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<OutcomeDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// CodeableConcept-like details, reduced to its text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl OperationOutcome {
    /// Parse an OperationOutcome out of an arbitrary JSON document.
    ///
    /// Returns `None` unless the document declares `resourceType: OperationOutcome`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if value.get("resourceType").and_then(|v| v.as_str()) != Some("OperationOutcome") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Build a single-issue outcome
    pub fn single(severity: &str, code: &str, text: impl Into<String>) -> Self {
        Self {
            issue: vec![OutcomeIssue {
                severity: severity.to_string(),
                code: code.to_string(),
                details: Some(OutcomeDetails { text: Some(text.into()) }),
                diagnostics: None,
            }],
        }
    }

    /// One-line human readable summary of all issues
    pub fn summary(&self) -> String {
        if self.issue.is_empty() {
            return "no issue details".to_string();
        }
        self.issue
            .iter()
            .map(OutcomeIssue::describe)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl OutcomeIssue {
    /// `severity/code: text`, preferring details.text over diagnostics
    pub fn describe(&self) -> String {
        let text = self
            .details
            .as_ref()
            .and_then(|d| d.text.as_deref())
            .or(self.diagnostics.as_deref())
            .unwrap_or("No details");
        format!("{}/{}: {}", self.severity, self.code, text)
    }
}
