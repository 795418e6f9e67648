//! Data-quality assessment tool
//!
//! Wraps one [`Assessor`] run in an envelope carrying the run id, server and
//! timestamp. Those never reach the scoring code, which stays deterministic.

use crate::summaries::quality_report;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data_quality::{Assessor, QualityReport};
use fhir_client::ResourceType;
use mcp_server::{parse_arguments, McpError, McpResult, McpTool, ToolInput, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssessArgs {
    #[serde(default, rename = "resourceTypes")]
    resource_types: Option<Vec<String>>,
    #[serde(default)]
    resource_type: Option<String>,
}

impl AssessArgs {
    /// Requested types in argument order; empty means the rubric's table
    fn tracked(&self) -> McpResult<Vec<ResourceType>> {
        self.resource_types
            .iter()
            .flatten()
            .chain(self.resource_type.iter())
            .map(|name| {
                name.trim()
                    .parse::<ResourceType>()
                    .map_err(|e| McpError::InvalidParams(e.to_string()))
            })
            .collect()
    }
}

/// Result of one assessment run, as returned to the client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentEnvelope {
    pub run_id: Uuid,
    pub server_url: String,
    pub assessed_at: DateTime<Utc>,
    pub report: QualityReport,
}

pub struct AssessDataQualityTool {
    assessor: Assessor,
    server_url: String,
}

impl AssessDataQualityTool {
    pub fn new(assessor: Assessor, server_url: impl Into<String>) -> Self {
        Self {
            assessor,
            server_url: server_url.into(),
        }
    }
}

#[async_trait]
impl McpTool for AssessDataQualityTool {
    fn name(&self) -> &str {
        "assess_data_quality"
    }

    fn description(&self) -> &str {
        "Assess the data quality and integrity of the FHIR server: samples each resource type, \
         cross-checks references between the samples and returns a 0-100 score with the issues found"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "resourceTypes": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Resource types to assess (optional, defaults to the standard clinical types)"
                },
                "resource_type": {
                    "type": "string",
                    "description": "Single resource type to assess (optional)"
                }
            }
        })
    }

    async fn execute(&self, input: ToolInput) -> McpResult<ToolResult> {
        let args: AssessArgs = parse_arguments(input.arguments)?;
        let mut tracked = args.tracked()?;
        if tracked.is_empty() {
            tracked = self.assessor.rubric().default_types();
        }

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, types = tracked.len(), "📊 Starting data quality assessment");

        let report = self.assessor.assess(&tracked).await;
        let envelope = AssessmentEnvelope {
            run_id,
            server_url: self.server_url.clone(),
            assessed_at: Utc::now(),
            report,
        };

        info!(run_id = %run_id, score = envelope.report.score, rating = ?envelope.report.rating, "Assessment complete");
        let text = quality_report(&envelope);
        Ok(ToolResult::success(serde_json::to_value(&envelope)?).with_rendered(text))
    }
}
