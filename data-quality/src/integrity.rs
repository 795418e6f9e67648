//! Reference resolution against the samples of one run
//!
//! The check is sampled, not exhaustive: an orphaned finding means the target
//! was not among the sampled instances of its type, which can be a false
//! positive when the target lives outside the fetched pages.

use crate::references::{ReferenceEdge, ReferenceTarget};
use fhir_client::{ResourceSample, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Resolution outcome of one reference edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Target observed in this run's samples
    Resolved,
    /// Target type not sampled this run
    Unverifiable,
    /// Target type sampled, target id absent
    Orphaned,
    /// Reference could not be parsed
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityFinding {
    pub kind: FindingKind,
    #[serde(flatten)]
    pub edge: ReferenceEdge,
}

impl IntegrityFinding {
    /// Whether the finding counts against the referencing type
    pub fn is_violation(&self) -> bool {
        matches!(self.kind, FindingKind::Orphaned | FindingKind::Malformed)
    }
}

/// Ids observed per sampled resource type
#[derive(Debug, Default)]
pub struct SampleIndex {
    ids: HashMap<ResourceType, HashSet<String>>,
}

impl SampleIndex {
    /// Index every type whose fetch produced evidence (success or partial failure)
    pub fn new(samples: &[ResourceSample]) -> Self {
        let mut ids: HashMap<ResourceType, HashSet<String>> = HashMap::new();
        for sample in samples.iter().filter(|s| s.fetch_outcome().is_sampled()) {
            ids.entry(sample.resource_type().clone())
                .or_default()
                .extend(sample.instances().iter().filter_map(|i| i.id.clone()));
        }
        Self { ids }
    }

    pub fn is_sampled(&self, resource_type: &ResourceType) -> bool {
        self.ids.contains_key(resource_type)
    }

    /// `None` when the type was not sampled
    pub fn contains(&self, resource_type: &ResourceType, id: &str) -> Option<bool> {
        self.ids.get(resource_type).map(|ids| ids.contains(id))
    }

    pub fn classify(&self, edge: &ReferenceEdge) -> FindingKind {
        match &edge.target {
            ReferenceTarget::Malformed { .. } => FindingKind::Malformed,
            ReferenceTarget::Local { found: true, .. } => FindingKind::Resolved,
            ReferenceTarget::Local { found: false, .. } => FindingKind::Orphaned,
            ReferenceTarget::Untyped { .. } => FindingKind::Unverifiable,
            ReferenceTarget::Resource { resource_type, id } => match self.contains(resource_type, id) {
                None => FindingKind::Unverifiable,
                Some(true) => FindingKind::Resolved,
                Some(false) => FindingKind::Orphaned,
            },
        }
    }
}

/// Resolve every edge against the union of this run's samples, preserving edge order
pub fn resolve(edges: &[ReferenceEdge], samples: &[ResourceSample]) -> Vec<IntegrityFinding> {
    let index = SampleIndex::new(samples);
    edges
        .iter()
        .map(|edge| IntegrityFinding {
            kind: index.classify(edge),
            edge: edge.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::{extract_edges, instance_edges};
    use fhir_client::{FetchFailure, ResourceInstance};
    use rstest::rstest;
    use serde_json::json;

    fn patients(ids: &[&str]) -> ResourceSample {
        let instances = ids
            .iter()
            .map(|id| ResourceInstance::from_resource(&json!({"resourceType": "Patient", "id": id})).unwrap())
            .collect();
        ResourceSample::success(ResourceType::Patient, instances, 50)
    }

    fn observation_referencing(reference: &str) -> ResourceSample {
        let instance = ResourceInstance::from_resource(&json!({
            "resourceType": "Observation",
            "id": "o1",
            "subject": {"reference": reference}
        }))
        .unwrap();
        ResourceSample::success(ResourceType::Observation, vec![instance], 30)
    }

    fn kinds(reference: &str, others: Vec<ResourceSample>) -> FindingKind {
        let observations = observation_referencing(reference);
        let edges = extract_edges(&observations);
        let mut samples = vec![observations];
        samples.extend(others);
        let findings = resolve(&edges, &samples);
        assert_eq!(findings.len(), 1);
        findings[0].kind
    }

    #[rstest]
    #[case("Patient/123", &["123"], FindingKind::Resolved)]
    #[case("Patient/123", &["456"], FindingKind::Orphaned)]
    #[case("http://example.org/fhir/Patient/123/_history/1", &["123"], FindingKind::Resolved)]
    #[case("Practitioner/p1", &["123"], FindingKind::Unverifiable)]
    #[case("urn:uuid:2f1c", &["123"], FindingKind::Unverifiable)]
    #[case("", &["123"], FindingKind::Malformed)]
    #[case("123", &[], FindingKind::Malformed)]
    fn test_resolution(#[case] reference: &str, #[case] patient_ids: &[&str], #[case] expected: FindingKind) {
        assert_eq!(kinds(reference, vec![patients(patient_ids)]), expected);
    }

    #[test]
    fn test_unsampled_type_is_unverifiable_not_orphaned() {
        assert_eq!(kinds("Patient/123", vec![]), FindingKind::Unverifiable);
    }

    #[test]
    fn test_failed_type_counts_as_unsampled() {
        let failed = ResourceSample::failure(ResourceType::Patient, FetchFailure::timeout("Request timed out"), 50);
        assert_eq!(kinds("Patient/123", vec![failed]), FindingKind::Unverifiable);
    }

    #[test]
    fn test_empty_successful_type_is_sampled() {
        assert_eq!(kinds("Patient/123", vec![patients(&[])]), FindingKind::Orphaned);
    }

    #[test]
    fn test_malformed_regardless_of_sampling() {
        assert_eq!(kinds("Patient/", vec![patients(&["123"])]), FindingKind::Malformed);
        assert_eq!(kinds("Patient/", vec![]), FindingKind::Malformed);
    }

    #[test]
    fn test_local_reference_resolution() {
        let instance = ResourceInstance::from_resource(&json!({
            "resourceType": "MedicationRequest",
            "id": "mr1",
            "contained": [{"resourceType": "Medication", "id": "med1"}],
            "medicationReference": {"reference": "#med1"},
            "reasonReference": [{"reference": "#missing"}]
        }))
        .unwrap();
        let edges = instance_edges(&instance);
        let findings = resolve(&edges, &[]);

        let by_field: HashMap<&str, FindingKind> =
            findings.iter().map(|f| (f.edge.field.as_str(), f.kind)).collect();
        assert_eq!(by_field["medicationReference"], FindingKind::Resolved);
        assert_eq!(by_field["reasonReference[0]"], FindingKind::Orphaned);
    }

    #[test]
    fn test_self_referencing_sample_resolves() {
        let instance = ResourceInstance::from_resource(&json!({
            "resourceType": "Patient",
            "id": "a",
            "link": [{"other": {"reference": "Patient/b"}}]
        }))
        .unwrap();
        let b = ResourceInstance::from_resource(&json!({"resourceType": "Patient", "id": "b"})).unwrap();
        let sample = ResourceSample::success(ResourceType::Patient, vec![instance, b], 50);
        let findings = resolve(&extract_edges(&sample), &[sample]);
        assert_eq!(findings[0].kind, FindingKind::Resolved);
        assert!(!findings[0].is_violation());
    }
}
