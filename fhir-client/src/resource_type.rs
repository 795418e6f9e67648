//! FHIR resource type vocabulary
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a resource type name accepted as `Other`
const MAX_TYPE_NAME_LEN: usize = 64;

/// A named category of clinical or administrative record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Patient,
    Observation,
    Condition,
    MedicationRequest,
    DiagnosticReport,
    CarePlan,
    Encounter,
    Practitioner,
    PractitionerRole,
    Organization,
    Location,
    Procedure,
    Immunization,
    AllergyIntolerance,
    Medication,
    Specimen,
    Device,
    Group,
    RelatedPerson,
    CareTeam,
    Goal,
    ServiceRequest,
    DocumentReference,
    /// Any other syntactically valid resource type name
    Other(String),
}

impl ResourceType {
    /// FHIR name of the resource type, as used in URLs and `resourceType` fields
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Observation => "Observation",
            ResourceType::Condition => "Condition",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::CarePlan => "CarePlan",
            ResourceType::Encounter => "Encounter",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::PractitionerRole => "PractitionerRole",
            ResourceType::Organization => "Organization",
            ResourceType::Location => "Location",
            ResourceType::Procedure => "Procedure",
            ResourceType::Immunization => "Immunization",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Medication => "Medication",
            ResourceType::Specimen => "Specimen",
            ResourceType::Device => "Device",
            ResourceType::Group => "Group",
            ResourceType::RelatedPerson => "RelatedPerson",
            ResourceType::CareTeam => "CareTeam",
            ResourceType::Goal => "Goal",
            ResourceType::ServiceRequest => "ServiceRequest",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::Other(name) => name,
        }
    }

    /// Whether `name` has the shape of a FHIR resource type name
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_uppercase() => {}
            _ => return false,
        }
        name.len() <= MAX_TYPE_NAME_LEN && chars.all(|c| c.is_ascii_alphabetic())
    }
}

/// Error returned when a string is not a resource type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid resource type name: '{0}'")]
pub struct InvalidResourceType(pub String);

impl FromStr for ResourceType {
    type Err = InvalidResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let resource_type = match s {
            "Patient" => ResourceType::Patient,
            "Observation" => ResourceType::Observation,
            "Condition" => ResourceType::Condition,
            "MedicationRequest" => ResourceType::MedicationRequest,
            "DiagnosticReport" => ResourceType::DiagnosticReport,
            "CarePlan" => ResourceType::CarePlan,
            "Encounter" => ResourceType::Encounter,
            "Practitioner" => ResourceType::Practitioner,
            "PractitionerRole" => ResourceType::PractitionerRole,
            "Organization" => ResourceType::Organization,
            "Location" => ResourceType::Location,
            "Procedure" => ResourceType::Procedure,
            "Immunization" => ResourceType::Immunization,
            "AllergyIntolerance" => ResourceType::AllergyIntolerance,
            "Medication" => ResourceType::Medication,
            "Specimen" => ResourceType::Specimen,
            "Device" => ResourceType::Device,
            "Group" => ResourceType::Group,
            "RelatedPerson" => ResourceType::RelatedPerson,
            "CareTeam" => ResourceType::CareTeam,
            "Goal" => ResourceType::Goal,
            "ServiceRequest" => ResourceType::ServiceRequest,
            "DocumentReference" => ResourceType::DocumentReference,
            other if Self::is_valid_name(other) => ResourceType::Other(other.to_string()),
            other => return Err(InvalidResourceType(other.to_string())),
        };
        Ok(resource_type)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Patient", ResourceType::Patient)]
    #[case("MedicationRequest", ResourceType::MedicationRequest)]
    #[case("CarePlan", ResourceType::CarePlan)]
    #[case("Questionnaire", ResourceType::Other("Questionnaire".to_string()))]
    fn test_parse_known_and_other(#[case] input: &str, #[case] expected: ResourceType) {
        assert_eq!(input.parse::<ResourceType>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("patient")]
    #[case("Patient/123")]
    #[case("Care Plan")]
    #[case("Obs3rvation")]
    fn test_parse_rejects_invalid_names(#[case] input: &str) {
        assert!(input.parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_other_round_trips_through_display() {
        let parsed: ResourceType = "Questionnaire".parse().unwrap();
        assert_eq!(parsed.to_string(), "Questionnaire");
    }

    #[test]
    fn test_serde_uses_fhir_name() {
        let json = serde_json::to_string(&ResourceType::DiagnosticReport).unwrap();
        assert_eq!(json, "\"DiagnosticReport\"");

        let back: ResourceType = serde_json::from_str("\"Condition\"").unwrap();
        assert_eq!(back, ResourceType::Condition);

        assert!(serde_json::from_str::<ResourceType>("\"not a type\"").is_err());
    }
}
