//! Quality rubric: the static tables driving sampling and scoring
//!
//! Every constant the assessment depends on lives here so the rubric can be
//! audited, overridden from a YAML file, and tested in isolation.

use crate::error::{RubricError, RubricResult};
use fhir_client::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Fraction of full credit given to a type that was fetched successfully but is empty
pub const DEFAULT_EMPTY_CREDIT: f64 = 0.5;
/// Points removed from the referencing type per orphaned reference
pub const DEFAULT_ORPHAN_PENALTY: f64 = 5.0;
/// Points removed from the referencing type per malformed reference
pub const DEFAULT_MALFORMED_PENALTY: f64 = 10.0;
/// Points removed from a type whose fetch stopped part-way through pagination
pub const DEFAULT_PARTIAL_FAILURE_PENALTY: f64 = 10.0;
/// Sample size for types that are not in the rubric table
pub const DEFAULT_SAMPLE_SIZE: u32 = 10;
/// Weight for types that are not in the rubric table
pub const DEFAULT_WEIGHT: f64 = 10.0;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 3;
pub const DEFAULT_SAMPLE_TIMEOUT_SECS: u64 = 60;

const WEIGHT_TOTAL: f64 = 100.0;
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One row of the rubric table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedResource {
    pub resource_type: ResourceType,
    /// Instances requested when sampling this type
    pub sample_size: u32,
    /// Contribution to the overall score
    pub weight: f64,
}

impl TrackedResource {
    pub fn new(resource_type: ResourceType, sample_size: u32, weight: f64) -> Self {
        Self {
            resource_type,
            sample_size,
            weight,
        }
    }
}

/// Sampling budgets and scoring weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityRubric {
    /// Tracked types in fetch priority order. Weights sum to 100.
    pub resources: Vec<TrackedResource>,
    pub empty_credit: f64,
    pub orphan_penalty: f64,
    pub malformed_penalty: f64,
    pub partial_failure_penalty: f64,
    pub default_sample_size: u32,
    pub default_weight: f64,
    pub max_concurrent_fetches: usize,
    pub sample_timeout_secs: u64,
}

impl Default for QualityRubric {
    fn default() -> Self {
        Self {
            resources: vec![
                TrackedResource::new(ResourceType::Patient, 50, 30.0),
                TrackedResource::new(ResourceType::Observation, 30, 20.0),
                TrackedResource::new(ResourceType::Condition, 30, 20.0),
                TrackedResource::new(ResourceType::MedicationRequest, 20, 15.0),
                TrackedResource::new(ResourceType::DiagnosticReport, 20, 10.0),
                TrackedResource::new(ResourceType::CarePlan, 10, 5.0),
            ],
            empty_credit: DEFAULT_EMPTY_CREDIT,
            orphan_penalty: DEFAULT_ORPHAN_PENALTY,
            malformed_penalty: DEFAULT_MALFORMED_PENALTY,
            partial_failure_penalty: DEFAULT_PARTIAL_FAILURE_PENALTY,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
            default_weight: DEFAULT_WEIGHT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            sample_timeout_secs: DEFAULT_SAMPLE_TIMEOUT_SECS,
        }
    }
}

impl QualityRubric {
    /// Parse and validate a rubric from YAML
    pub fn from_yaml_str(yaml: &str) -> RubricResult<Self> {
        let rubric: QualityRubric = serde_yaml::from_str(yaml)?;
        rubric.validate()?;
        Ok(rubric)
    }

    /// Read, parse and validate a rubric file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> RubricResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Types tracked when the caller does not name any, in priority order
    pub fn default_types(&self) -> Vec<ResourceType> {
        self.resources.iter().map(|r| r.resource_type.clone()).collect()
    }

    fn row(&self, resource_type: &ResourceType) -> Option<&TrackedResource> {
        self.resources.iter().find(|r| &r.resource_type == resource_type)
    }

    /// Position of the type in the priority list, if it is tabled
    pub fn priority(&self, resource_type: &ResourceType) -> Option<usize> {
        self.resources.iter().position(|r| &r.resource_type == resource_type)
    }

    pub fn sample_size_for(&self, resource_type: &ResourceType) -> u32 {
        self.row(resource_type).map_or(self.default_sample_size, |r| r.sample_size)
    }

    pub fn weight_for(&self, resource_type: &ResourceType) -> f64 {
        self.row(resource_type).map_or(self.default_weight, |r| r.weight)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_secs(self.sample_timeout_secs)
    }

    /// Check the rubric invariants
    pub fn validate(&self) -> RubricResult<()> {
        if self.resources.is_empty() {
            return Err(RubricError::Invalid("resource table is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for row in &self.resources {
            if !seen.insert(&row.resource_type) {
                return Err(RubricError::Invalid(format!(
                    "{} appears more than once in the resource table",
                    row.resource_type
                )));
            }
            if row.sample_size == 0 {
                return Err(RubricError::Invalid(format!("{} has a sample size of 0", row.resource_type)));
            }
            if !(row.weight.is_finite() && row.weight > 0.0) {
                return Err(RubricError::Invalid(format!(
                    "{} must have a positive weight, got {}",
                    row.resource_type, row.weight
                )));
            }
        }

        let total: f64 = self.resources.iter().map(|r| r.weight).sum();
        if (total - WEIGHT_TOTAL).abs() > WEIGHT_TOLERANCE {
            return Err(RubricError::Invalid(format!("weights must sum to 100, got {}", total)));
        }

        if !(0.0..=1.0).contains(&self.empty_credit) {
            return Err(RubricError::Invalid(format!(
                "emptyCredit must be between 0 and 1, got {}",
                self.empty_credit
            )));
        }
        for (name, value) in [
            ("orphanPenalty", self.orphan_penalty),
            ("malformedPenalty", self.malformed_penalty),
            ("partialFailurePenalty", self.partial_failure_penalty),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RubricError::Invalid(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        if self.default_sample_size == 0 {
            return Err(RubricError::Invalid("defaultSampleSize must be at least 1".to_string()));
        }
        if !(self.default_weight.is_finite() && self.default_weight > 0.0) {
            return Err(RubricError::Invalid("defaultWeight must be positive".to_string()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(RubricError::Invalid("maxConcurrentFetches must be at least 1".to_string()));
        }
        if self.sample_timeout_secs == 0 {
            return Err(RubricError::Invalid("sampleTimeoutSecs must be at least 1".to_string()));
        }
        Ok(())
    }
}
