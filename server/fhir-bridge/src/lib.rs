//! FHIR MCP Bridge
//!
//! Exposes a FHIR R4 server to AI agents as a set of MCP tools over stdio:
//! patient lookup, clinical searches, the capability statement and a
//! data-quality assessment that samples the server and checks reference
//! integrity between resource types.
//!
//! # Architecture
//!
//! ```text
//! stdin/stdout (JSON-RPC) -> mcp_server::Server -> tools::* -> fhir_client::FhirClient -> FHIR server
//!                                                  \-> data_quality::Assessor
//! ```

pub mod config;
pub mod error;
pub mod summaries;
pub mod tools;

pub use config::{BridgeConfig, LogFormat};
pub use error::{BridgeError, BridgeResult};

use data_quality::{Assessor, QualityRubric};
use fhir_client::{FhirClient, ResourceFetcher};
use mcp_server::{Server, ToolsRegistry};
use std::sync::Arc;
use tools::{AssessDataQualityTool, CapabilityStatementTool, FindPatientsWithConditionsTool, GetPatientTool, SearchTool};

/// Name reported in `initialize`
pub const SERVER_NAME: &str = "fhir-mcp-bridge";

/// Register every healthcare tool against one FHIR client
pub fn build_registry(client: Arc<FhirClient>, rubric: QualityRubric) -> ToolsRegistry {
    let fetcher: Arc<dyn ResourceFetcher> = client.clone();
    let assessor = Assessor::new(fetcher, rubric);

    let mut registry = ToolsRegistry::new();
    registry.register(Arc::new(GetPatientTool::new(client.clone())));
    registry.register(Arc::new(SearchTool::patients(client.clone())));
    registry.register(Arc::new(SearchTool::all_patients(client.clone())));
    registry.register(Arc::new(SearchTool::observations(client.clone())));
    registry.register(Arc::new(SearchTool::conditions(client.clone())));
    registry.register(Arc::new(SearchTool::medication_requests(client.clone())));
    registry.register(Arc::new(SearchTool::diagnostic_reports(client.clone())));
    registry.register(Arc::new(SearchTool::care_plans(client.clone())));
    registry.register(Arc::new(CapabilityStatementTool::new(client.clone())));
    registry.register(Arc::new(FindPatientsWithConditionsTool::new(client.clone())));
    registry.register(Arc::new(AssessDataQualityTool::new(assessor, client.base_url())));
    registry
}

/// Build the MCP server for a configuration, validating it on the way
pub fn build_server(config: &BridgeConfig) -> BridgeResult<Server> {
    let rubric = config.rubric()?;
    let client = Arc::new(FhirClient::new(config.client_config()?)?);
    let registry = build_registry(client, rubric);
    Ok(Server::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), registry))
}
