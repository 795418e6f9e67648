//! FHIR REST client for the FHIR MCP bridge
//!
//! Issues authenticated, paginated reads and searches against a FHIR R4 server
//! and normalises every outcome into plain data.
//!
//! # Key Features
//!
//! - **Sampling**: bounded, paginated fetches of one resource type ([`ResourceFetcher`])
//! - **Failure as data**: timeouts, transport errors and non-2xx answers become
//!   [`FetchOutcome`] values, carrying the server's OperationOutcome when present
//! - **Pass-through calls**: read by id, single-page search, capability statement
//! - **Log hygiene**: one log line per request, with search values masked
//!
//! # Example
//!
//! ```no_run
//! use fhir_client::{FhirClient, FhirClientConfig, ResourceFetcher, ResourceType, SampleRequest};
//!
//! # async fn run() -> Result<(), fhir_client::FhirError> {
//! let config = FhirClientConfig::new("https://hapi.fhir.org/baseR4")?;
//! let client = FhirClient::new(config)?;
//!
//! let sample = client.fetch(SampleRequest::new(ResourceType::Patient, 50)).await;
//! println!("{} patients, outcome {:?}", sample.returned_count(), sample.fetch_outcome());
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod client;
pub mod config;
pub mod error;
pub mod outcome;
pub mod redact;
pub mod resource_type;
pub mod sample;

pub use bundle::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use outcome::*;
pub use resource_type::*;
pub use sample::*;
