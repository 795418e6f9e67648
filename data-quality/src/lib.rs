//! Data quality assessment for FHIR servers
//!
//! Samples each tracked resource type, cross-checks the references between the
//! sampled instances and turns the result into a deterministic 0-100 score with
//! an ordered issue list.
//!
//! ```text
//! Assessor::assess
//!   -> plan_samples      (sampling)
//!   -> ResourceFetcher   (one bounded fetch per type, concurrently)
//!   -> extract_edges     (references)
//!   -> resolve           (integrity)
//!   -> score             (scoring)
//!   => QualityReport
//! ```
//!
//! Everything except [`Assessor`] is pure and synchronous.

pub mod error;
pub mod integrity;
pub mod orchestrator;
pub mod references;
pub mod report;
pub mod rubric;
pub mod sampling;
pub mod scoring;

pub use error::*;
pub use integrity::*;
pub use orchestrator::*;
pub use references::*;
pub use report::*;
pub use rubric::*;
pub use sampling::*;
pub use scoring::*;
