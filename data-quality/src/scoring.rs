//! Quality Scoring Engine
//!
//! [`score`] is pure: the same samples, findings and rubric always produce the
//! same report. Each tracked type is scored on its own, then the type scores
//! are combined by the rubric weights.
//!
//! Per-type rubric:
//! - outright fetch failure scores 0
//! - a successful fetch with no entries gets `emptyCredit` of full marks
//! - otherwise full marks minus a penalty per orphaned or malformed reference
//!   made by the type's instances, floored at 0
//! - a partial failure is scored as above, minus `partialFailurePenalty`

use crate::integrity::{FindingKind, IntegrityFinding};
use crate::references::ReferenceTarget;
use crate::report::{
    IssueCategory, QualityIssue, QualityRating, QualityReport, ReferenceSummary, ResourceAssessment,
};
use crate::rubric::QualityRubric;
use fhir_client::{FetchOutcome, ResourceSample, ResourceType};
use std::collections::BTreeMap;

const FULL_MARKS: f64 = 100.0;

/// Score one run. Sections follow the order of `samples`.
pub fn score(samples: &[ResourceSample], findings: &[IntegrityFinding], rubric: &QualityRubric) -> QualityReport {
    let mut sections = Vec::with_capacity(samples.len());
    let mut retrieval = Vec::new();
    let mut partial = Vec::new();
    let mut orphaned = Vec::new();
    let mut malformed = Vec::new();
    let mut empty = Vec::new();

    for sample in samples {
        let resource_type = sample.resource_type();
        let own: Vec<&IntegrityFinding> = findings
            .iter()
            .filter(|f| &f.edge.source_type == resource_type)
            .collect();

        let mut references = ReferenceSummary::default();
        for finding in &own {
            references.record(finding.kind);
        }

        let type_score = type_score(sample, &references, rubric);

        match sample.fetch_outcome() {
            FetchOutcome::Failure { failure } => retrieval.push(QualityIssue::new(
                IssueCategory::RetrievalFailure,
                resource_type.clone(),
                format!("Could not retrieve {}: {}", resource_type, failure),
            )),
            FetchOutcome::PartialFailure { failure } => partial.push(QualityIssue::new(
                IssueCategory::PartialRetrieval,
                resource_type.clone(),
                format!(
                    "Retrieval of {} stopped after {} of {} requested instances: {}",
                    resource_type,
                    sample.returned_count(),
                    sample.requested_count(),
                    failure
                ),
            )),
            FetchOutcome::Success if sample.returned_count() == 0 => empty.push(QualityIssue::new(
                IssueCategory::EmptyResource,
                resource_type.clone(),
                format!("No {} resources were returned by the server", resource_type),
            )),
            FetchOutcome::Success => {}
        }

        orphaned.extend(orphan_issues(resource_type, &own));
        if let Some(issue) = malformed_issue(resource_type, &own) {
            malformed.push(issue);
        }

        sections.push(ResourceAssessment {
            resource_type: resource_type.clone(),
            fetch_outcome: sample.fetch_outcome().clone(),
            requested_count: sample.requested_count(),
            returned_count: sample.returned_count(),
            score: one_decimal(type_score),
            weight: rubric.weight_for(resource_type),
            references,
            findings: own.into_iter().filter(|f| f.is_violation()).cloned().collect(),
        });
    }

    let overall = overall_score(samples, &sections, rubric);

    let mut issues = retrieval;
    issues.extend(partial);
    issues.extend(orphaned);
    issues.extend(malformed);
    issues.extend(empty);

    QualityReport {
        score: overall,
        rating: QualityRating::from_score(overall),
        resource_types: sections,
        issues,
    }
}

fn type_score(sample: &ResourceSample, references: &ReferenceSummary, rubric: &QualityRubric) -> f64 {
    let obtained = || {
        if sample.returned_count() == 0 {
            return FULL_MARKS * rubric.empty_credit;
        }
        let penalty = f64::from(references.orphaned) * rubric.orphan_penalty
            + f64::from(references.malformed) * rubric.malformed_penalty;
        (FULL_MARKS - penalty).max(0.0)
    };

    match sample.fetch_outcome() {
        FetchOutcome::Failure { .. } => 0.0,
        FetchOutcome::Success => obtained(),
        FetchOutcome::PartialFailure { .. } => (obtained() - rubric.partial_failure_penalty).max(0.0),
    }
}

/// Weighted mean of the unrounded type scores, rounded and clamped to [0, 100]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn overall_score(samples: &[ResourceSample], sections: &[ResourceAssessment], rubric: &QualityRubric) -> u8 {
    let (weighted, total_weight) = samples
        .iter()
        .zip(sections)
        .fold((0.0_f64, 0.0_f64), |(sum, weights), (sample, section)| {
            let score = type_score(sample, &section.references, rubric);
            (sum + section.weight * score, weights + section.weight)
        });

    if total_weight <= 0.0 {
        return 0;
    }
    (weighted / total_weight).round().clamp(0.0, FULL_MARKS) as u8
}

/// One issue per referenced target, so each line reads on its own
fn orphan_issues(resource_type: &ResourceType, findings: &[&IntegrityFinding]) -> Vec<QualityIssue> {
    let mut by_target: BTreeMap<String, Vec<&IntegrityFinding>> = BTreeMap::new();
    for finding in findings.iter().copied().filter(|f| f.kind == FindingKind::Orphaned) {
        let target = match &finding.edge.target {
            ReferenceTarget::Resource { resource_type, .. } => resource_type.to_string(),
            _ => "contained".to_string(),
        };
        by_target.entry(target).or_default().push(finding);
    }

    by_target
        .into_iter()
        .map(|(target, group)| {
            let noun = if group.len() == 1 { "reference" } else { "references" };
            let description = if target == "contained" {
                format!(
                    "{} {} {} to contained resources that do not exist {}",
                    group.len(),
                    resource_type,
                    noun,
                    examples(&group)
                )
            } else {
                format!(
                    "{} {} {} to {} not found in the sampled {} data {}",
                    group.len(),
                    resource_type,
                    noun,
                    target,
                    target,
                    examples(&group)
                )
            };
            QualityIssue::new(IssueCategory::OrphanedReference, resource_type.clone(), description)
        })
        .collect()
}

fn malformed_issue(resource_type: &ResourceType, findings: &[&IntegrityFinding]) -> Option<QualityIssue> {
    let group: Vec<&IntegrityFinding> = findings
        .iter()
        .copied()
        .filter(|f| f.kind == FindingKind::Malformed)
        .collect();
    if group.is_empty() {
        return None;
    }
    let noun = if group.len() == 1 { "reference" } else { "references" };
    Some(QualityIssue::new(
        IssueCategory::MalformedReference,
        resource_type.clone(),
        format!(
            "{} malformed {} {} could not be parsed {}",
            group.len(),
            resource_type,
            noun,
            examples(&group)
        ),
    ))
}

const EXAMPLE_LIMIT: usize = 3;

/// `(e.g. subject "Patient/9", ...)` for the first few findings
fn examples(group: &[&IntegrityFinding]) -> String {
    let shown: Vec<String> = group
        .iter()
        .take(EXAMPLE_LIMIT)
        .map(|f| format!("{} \"{}\"", f.edge.field, f.edge.reference))
        .collect();
    let more = group.len().saturating_sub(EXAMPLE_LIMIT);
    if more > 0 {
        format!("(e.g. {}, and {} more)", shown.join(", "), more)
    } else {
        format!("(e.g. {})", shown.join(", "))
    }
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::resolve;
    use crate::references::extract_edges;
    use fhir_client::{FetchFailure, ResourceInstance};
    use serde_json::{json, Value};

    fn sample(resource_type: ResourceType, resources: Vec<Value>) -> ResourceSample {
        let instances = resources
            .iter()
            .map(|r| ResourceInstance::from_resource(r).unwrap())
            .collect();
        ResourceSample::success(resource_type, instances, 10)
    }

    fn patients(n: usize) -> ResourceSample {
        sample(
            ResourceType::Patient,
            (0..n).map(|i| json!({"resourceType": "Patient", "id": i.to_string()})).collect(),
        )
    }

    fn run(samples: &[ResourceSample], rubric: &QualityRubric) -> QualityReport {
        let edges: Vec<_> = samples.iter().flat_map(extract_edges).collect();
        let findings = resolve(&edges, samples);
        score(samples, &findings, rubric)
    }

    #[test]
    fn test_clean_samples_score_100() {
        let rubric = QualityRubric::default();
        let conditions = sample(
            ResourceType::Condition,
            vec![json!({"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/1"}})],
        );
        let report = run(&[patients(3), conditions], &rubric);

        assert_eq!(report.score, 100);
        assert_eq!(report.rating, QualityRating::Excellent);
        assert!(report.issues.is_empty());
        assert_eq!(report.section(&ResourceType::Condition).unwrap().references.resolved, 1);
    }

    #[test]
    fn test_all_failures_score_zero() {
        let rubric = QualityRubric::default();
        let samples: Vec<_> = [ResourceType::Patient, ResourceType::Observation]
            .into_iter()
            .map(|t| ResourceSample::failure(t, FetchFailure::timeout("Request timed out"), 10))
            .collect();
        let report = run(&samples, &rubric);

        assert_eq!(report.score, 0);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues.iter().all(|i| i.category == IssueCategory::RetrievalFailure));
        assert_eq!(report.issues[0].description, "Could not retrieve Patient: Request timed out");
    }

    #[test]
    fn test_orphans_penalize_the_referencing_type() {
        let rubric = QualityRubric::default();
        let observations = sample(
            ResourceType::Observation,
            vec![
                json!({"resourceType": "Observation", "id": "o1", "subject": {"reference": "Patient/9"}}),
                json!({"resourceType": "Observation", "id": "o2", "subject": {"reference": "Patient/8"}}),
            ],
        );
        let report = run(&[patients(2), observations], &rubric);

        let section = report.section(&ResourceType::Observation).unwrap();
        assert_eq!(section.references.orphaned, 2);
        assert_eq!(section.score, 90.0);
        assert_eq!(section.findings.len(), 2);
        assert_eq!(report.section(&ResourceType::Patient).unwrap().score, 100.0);
        // (30 * 100 + 20 * 90) / 50
        assert_eq!(report.score, 96);

        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.category, IssueCategory::OrphanedReference);
        assert!(issue.description.starts_with("2 Observation references to Patient"));
        assert!(issue.description.contains("subject \"Patient/9\""));
    }

    #[test]
    fn test_penalty_is_floored_at_zero() {
        let rubric = QualityRubric::default();
        let observations = sample(
            ResourceType::Observation,
            (0..15)
                .map(|i| json!({"resourceType": "Observation", "id": format!("o{}", i), "subject": {"reference": "bad"}}))
                .collect(),
        );
        let report = run(&[observations], &rubric);
        assert_eq!(report.section(&ResourceType::Observation).unwrap().score, 0.0);
        assert_eq!(report.score, 0);
        assert!(report.issues[0].description.contains("and 12 more"));
    }

    #[test]
    fn test_empty_type_gets_partial_credit() {
        let rubric = QualityRubric::default();
        let report = run(&[sample(ResourceType::CarePlan, vec![])], &rubric);
        assert_eq!(report.score, 50);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, IssueCategory::EmptyResource);
    }

    #[test]
    fn test_partial_failure_is_penalized() {
        let rubric = QualityRubric::default();
        let instances = vec![ResourceInstance::from_resource(&json!({"resourceType": "Patient", "id": "1"})).unwrap()];
        let partial = ResourceSample::new(
            ResourceType::Patient,
            instances,
            FetchOutcome::PartialFailure {
                failure: FetchFailure::timeout("Request timed out"),
            },
            50,
        );
        let report = run(&[partial], &rubric);
        assert_eq!(report.score, 90);
        assert_eq!(report.issues[0].category, IssueCategory::PartialRetrieval);
        assert!(report.issues[0].description.contains("after 1 of 50"));
    }

    #[test]
    fn test_issue_order() {
        let rubric = QualityRubric::default();
        let samples = vec![
            patients(1),
            sample(
                ResourceType::Condition,
                vec![json!({"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/x"}, "encounter": {"reference": ""}})],
            ),
            sample(ResourceType::CarePlan, vec![]),
            ResourceSample::failure(ResourceType::DiagnosticReport, FetchFailure::timeout("Request timed out"), 20),
        ];
        let report = run(&samples, &rubric);
        let categories: Vec<_> = report.issues.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                IssueCategory::RetrievalFailure,
                IssueCategory::OrphanedReference,
                IssueCategory::MalformedReference,
                IssueCategory::EmptyResource,
            ]
        );
    }

    #[test]
    fn test_no_samples_scores_zero() {
        let report = score(&[], &[], &QualityRubric::default());
        assert_eq!(report.score, 0);
        assert!(report.resource_types.is_empty());
        assert_eq!(report.rating, QualityRating::Poor);
    }
}
