//! Sampling strategy: how many instances of each type to fetch, and in which order
use crate::rubric::QualityRubric;
use fhir_client::{ResourceType, SampleRequest};
use std::collections::HashSet;

/// Budget for one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSample {
    pub resource_type: ResourceType,
    pub requested_count: u32,
}

impl PlannedSample {
    pub fn request(&self) -> SampleRequest {
        SampleRequest::new(self.resource_type.clone(), self.requested_count)
    }
}

/// Ordered, duplicate-free list of samples to take in one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingPlan {
    samples: Vec<PlannedSample>,
}

impl SamplingPlan {
    pub fn iter(&self) -> impl Iterator<Item = &PlannedSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn resource_types(&self) -> Vec<ResourceType> {
        self.samples.iter().map(|s| s.resource_type.clone()).collect()
    }

    pub fn requested_count(&self, resource_type: &ResourceType) -> Option<u32> {
        self.samples
            .iter()
            .find(|s| &s.resource_type == resource_type)
            .map(|s| s.requested_count)
    }
}

/// Plan one sample per tracked type.
///
/// Types in the rubric table come first, in table order; untabled types follow
/// in the order the caller gave them. Duplicates are dropped, so the same input
/// set always yields the same plan.
pub fn plan_samples(rubric: &QualityRubric, tracked: &[ResourceType]) -> SamplingPlan {
    let mut seen = HashSet::new();
    let mut unique: Vec<&ResourceType> = tracked.iter().filter(|t| seen.insert(*t)).collect();

    // stable: untabled types keep caller order
    unique.sort_by_key(|t| rubric.priority(t).unwrap_or(usize::MAX));

    SamplingPlan {
        samples: unique
            .into_iter()
            .map(|resource_type| PlannedSample {
                resource_type: resource_type.clone(),
                requested_count: rubric.sample_size_for(resource_type),
            })
            .collect(),
    }
}
