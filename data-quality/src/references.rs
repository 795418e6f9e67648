//! Reference extraction and parsing
//!
//! Any JSON object carrying a `reference` key is treated as a FHIR Reference,
//! whatever field it sits in, so custom extensions are covered as well. Every
//! such object yields exactly one [`ReferenceEdge`]; references that cannot be
//! parsed are kept as [`ReferenceTarget::Malformed`] rather than dropped.

use fhir_client::{ResourceInstance, ResourceSample, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

const MAX_ID_LEN: usize = 64;
const CONTAINED: &str = "contained";
const HISTORY: &str = "_history";

/// Where a reference points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReferenceTarget {
    /// A typed `Type/id` pointer, relative or absolute
    Resource { resource_type: ResourceType, id: String },
    /// `#` (the containing resource) or `#id` (a contained resource)
    Local { id: Option<String>, found: bool },
    /// `urn:uuid:` or `urn:oid:` identifiers that carry no type
    Untyped { uri: String },
    Malformed { reason: String },
}

/// One reference field of one fetched instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEdge {
    pub source_type: ResourceType,
    pub source_id: Option<String>,
    /// Dotted path with array indices, e.g. `performer[0]`
    pub field: String,
    /// The reference value as found; non-string values are rendered as JSON
    pub reference: String,
    pub target: ReferenceTarget,
}

impl ReferenceEdge {
    pub fn is_malformed(&self) -> bool {
        matches!(self.target, ReferenceTarget::Malformed { .. })
    }
}

/// Parse one reference string.
///
/// `contained` holds the ids of the resources contained in the referencing
/// instance and decides whether a `#id` reference is found.
pub fn parse_reference(raw: &str, contained: &HashSet<&str>) -> ReferenceTarget {
    if raw.trim().is_empty() {
        return malformed("reference is empty");
    }
    if raw.trim() != raw {
        return malformed("reference has surrounding whitespace");
    }

    if let Some(local) = raw.strip_prefix('#') {
        if local.is_empty() {
            return ReferenceTarget::Local { id: None, found: true };
        }
        if !is_valid_id(local) {
            return malformed(format!("invalid local id '{}'", local));
        }
        return ReferenceTarget::Local {
            id: Some(local.to_string()),
            found: contained.contains(local),
        };
    }

    for scheme in ["urn:uuid:", "urn:oid:"] {
        if let Some(value) = raw.strip_prefix(scheme) {
            if value.is_empty() {
                return malformed(format!("'{}' identifier is empty", scheme.trim_end_matches(':')));
            }
            return ReferenceTarget::Untyped { uri: raw.to_string() };
        }
    }

    if raw.contains('?') {
        return malformed("conditional references cannot be resolved");
    }

    let absolute_path = ["http://", "https://"]
        .iter()
        .find_map(|scheme| raw.strip_prefix(scheme));

    match absolute_path {
        Some(rest) => {
            let Some((host, path)) = rest.split_once('/') else {
                return malformed("absolute reference has no resource path");
            };
            if host.is_empty() {
                return malformed("absolute reference has no host");
            }
            let segments: Vec<&str> = path.split('/').collect();
            match segments.as_slice() {
                [.., resource_type, id, HISTORY, version] => typed(resource_type, id, Some(*version)),
                [.., resource_type, id] => typed(resource_type, id, None),
                _ => malformed("absolute reference has no Type/id path"),
            }
        }
        None if raw.contains(':') => malformed("unsupported reference scheme"),
        None => {
            let segments: Vec<&str> = raw.split('/').collect();
            match segments.as_slice() {
                [resource_type, id] => typed(resource_type, id, None),
                [resource_type, id, HISTORY, version] => typed(resource_type, id, Some(*version)),
                [_] => malformed("reference is missing the resource type segment"),
                _ => malformed("reference does not have the form Type/id"),
            }
        }
    }
}

/// Extract every reference edge of every instance in the sample
pub fn extract_edges(sample: &ResourceSample) -> Vec<ReferenceEdge> {
    sample.instances().iter().flat_map(instance_edges).collect()
}

/// Extract the reference edges of one instance
pub fn instance_edges(instance: &ResourceInstance) -> Vec<ReferenceEdge> {
    let contained = contained_ids(&instance.fields);
    let mut found = Vec::new();
    for (key, value) in instance.fields.iter().filter(|(key, _)| key.as_str() != CONTAINED) {
        collect_references(value, key.clone(), &mut found);
    }

    found
        .into_iter()
        .map(|(field, value)| {
            let (reference, target) = match value {
                Value::String(raw) => (raw.clone(), parse_reference(raw, &contained)),
                other => (other.to_string(), malformed("reference is not a string")),
            };
            ReferenceEdge {
                source_type: instance.resource_type.clone(),
                source_id: instance.id.clone(),
                field,
                reference,
                target,
            }
        })
        .collect()
}

fn collect_references<'a>(value: &'a Value, path: String, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(object) => {
            if let Some(reference) = object.get("reference") {
                out.push((path.clone(), reference));
            }
            for (key, child) in object.iter().filter(|(key, _)| key.as_str() != "reference") {
                collect_references(child, format!("{}.{}", path, key), out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_references(item, format!("{}[{}]", path, index), out);
            }
        }
        _ => {}
    }
}

fn contained_ids(fields: &Map<String, Value>) -> HashSet<&str> {
    fields
        .get(CONTAINED)
        .and_then(Value::as_array)
        .map(|resources| {
            resources
                .iter()
                .filter_map(|r| r.get("id").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn typed(resource_type: &str, id: &str, version: Option<&str>) -> ReferenceTarget {
    if resource_type.is_empty() {
        return malformed("reference is missing the resource type segment");
    }
    let Ok(parsed) = resource_type.parse::<ResourceType>() else {
        return malformed(format!("'{}' is not a resource type", resource_type));
    };
    if !is_valid_id(id) {
        return malformed(format!("'{}' is not a valid resource id", id));
    }
    if let Some(version) = version {
        if !is_valid_id(version) {
            return malformed(format!("'{}' is not a valid version id", version));
        }
    }
    ReferenceTarget::Resource {
        resource_type: parsed,
        id: id.to_string(),
    }
}

fn is_valid_id(id: &str) -> bool {
    (1..=MAX_ID_LEN).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn malformed(reason: impl Into<String>) -> ReferenceTarget {
    ReferenceTarget::Malformed { reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn patient(id: &str) -> ReferenceTarget {
        ReferenceTarget::Resource {
            resource_type: ResourceType::Patient,
            id: id.to_string(),
        }
    }

    fn instance(value: Value) -> ResourceInstance {
        ResourceInstance::from_resource(&value).unwrap()
    }

    #[rstest]
    #[case("Patient/123")]
    #[case("Patient/123/_history/2")]
    #[case("http://example.org/fhir/Patient/123")]
    #[case("https://example.org/Patient/123/_history/7")]
    fn test_typed_forms_parse_to_same_target(#[case] raw: &str) {
        assert_eq!(parse_reference(raw, &HashSet::new()), patient("123"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("123")]
    #[case("/123")]
    #[case("Patient/")]
    #[case("patient/123")]
    #[case("Patient/12 3")]
    #[case("Patient/123/extra")]
    #[case("Patient//123")]
    #[case("Patient?identifier=abc")]
    #[case("http://example.org")]
    #[case("ftp://example.org/Patient/1")]
    #[case("urn:uuid:")]
    fn test_malformed_references(#[case] raw: &str) {
        let target = parse_reference(raw, &HashSet::new());
        assert!(matches!(target, ReferenceTarget::Malformed { .. }), "{:?} parsed as {:?}", raw, target);
    }

    #[test]
    fn test_long_id_is_malformed() {
        let raw = format!("Patient/{}", "a".repeat(65));
        assert!(matches!(parse_reference(&raw, &HashSet::new()), ReferenceTarget::Malformed { .. }));
    }

    #[test]
    fn test_untyped_identifiers() {
        let target = parse_reference("urn:uuid:7b8c9a5e-1f2d-4c3b-9a8e-0d1c2b3a4f5e", &HashSet::new());
        assert!(matches!(target, ReferenceTarget::Untyped { .. }));
        let target = parse_reference("urn:oid:1.2.3.4", &HashSet::new());
        assert!(matches!(target, ReferenceTarget::Untyped { .. }));
    }

    #[test]
    fn test_local_references() {
        let contained: HashSet<&str> = ["med1"].into_iter().collect();
        assert_eq!(
            parse_reference("#med1", &contained),
            ReferenceTarget::Local {
                id: Some("med1".to_string()),
                found: true
            }
        );
        assert_eq!(
            parse_reference("#med2", &contained),
            ReferenceTarget::Local {
                id: Some("med2".to_string()),
                found: false
            }
        );
        assert_eq!(parse_reference("#", &contained), ReferenceTarget::Local { id: None, found: true });
    }

    #[test]
    fn test_unknown_but_valid_type_is_typed() {
        let target = parse_reference("Substance/abc", &HashSet::new());
        assert_eq!(
            target,
            ReferenceTarget::Resource {
                resource_type: ResourceType::Other("Substance".to_string()),
                id: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_every_reference_object_yields_one_edge() {
        let observation = instance(json!({
            "resourceType": "Observation",
            "id": "o1",
            "subject": {"reference": "Patient/1", "display": "Jane"},
            "performer": [{"reference": "Practitioner/p1"}, {"reference": ""}],
            "extension": [
                {"url": "http://example.org/ext", "valueString": "x"},
                {"url": "http://example.org/source", "valueReference": {"reference": 42}}
            ],
            "note": [{"text": "reference in prose: Patient/2"}]
        }));

        let edges = instance_edges(&observation);
        let fields: Vec<&str> = edges.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(edges.len(), 4);
        assert!(fields.contains(&"subject"));
        assert!(fields.contains(&"performer[0]"));
        assert!(fields.contains(&"performer[1]"));
        assert!(fields.contains(&"extension[1].valueReference"));

        let subject = edges.iter().find(|e| e.field == "subject").unwrap();
        assert_eq!(subject.target, patient("1"));
        assert_eq!(subject.source_type, ResourceType::Observation);
        assert_eq!(subject.source_id.as_deref(), Some("o1"));

        let numeric = edges.iter().find(|e| e.field == "extension[1].valueReference").unwrap();
        assert!(numeric.is_malformed());
        assert_eq!(numeric.reference, "42");
        assert_eq!(edges.iter().filter(|e| e.is_malformed()).count(), 2);
    }

    #[test]
    fn test_nested_reference_inside_reference() {
        let condition = instance(json!({
            "resourceType": "Condition",
            "id": "c1",
            "subject": {
                "reference": "Patient/1",
                "identifier": {"assigner": {"reference": "Organization/org1"}}
            }
        }));

        let edges = instance_edges(&condition);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.field == "subject.identifier.assigner"));
    }

    #[test]
    fn test_contained_resources_are_not_walked() {
        let request = instance(json!({
            "resourceType": "MedicationRequest",
            "id": "mr1",
            "contained": [{"resourceType": "Medication", "id": "med1", "manufacturer": {"reference": "Organization/x"}}],
            "medicationReference": {"reference": "#med1"},
            "subject": {"reference": "Patient/1"}
        }));

        let edges = instance_edges(&request);
        assert_eq!(edges.len(), 2);
        let medication = edges.iter().find(|e| e.field == "medicationReference").unwrap();
        assert_eq!(
            medication.target,
            ReferenceTarget::Local {
                id: Some("med1".to_string()),
                found: true
            }
        );
    }

    #[test]
    fn test_extract_edges_covers_all_instances() {
        let sample = ResourceSample::success(
            ResourceType::Condition,
            vec![
                instance(json!({"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/1"}})),
                instance(json!({"resourceType": "Condition", "id": "c2", "subject": {"reference": "Patient/2"}})),
                instance(json!({"resourceType": "Condition", "id": "c3"})),
            ],
            30,
        );
        assert_eq!(extract_edges(&sample).len(), 2);
    }
}
