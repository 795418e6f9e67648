//! Assessment Scenario Tests
//!
//! Full runs of the orchestrator against a mocked fetcher:
//! 1. Every planned type is fetched exactly once with its planned budget
//! 2. Degraded servers still produce a complete report
//! 3. References to unsampled types never cost points

use async_trait::async_trait;
use data_quality::*;
use fhir_client::*;
use mockall::mock;
use mockall::predicate::eq;
use serde_json::{json, Value};
use std::sync::Arc;

mock! {
    pub Fetcher {}

    #[async_trait]
    impl ResourceFetcher for Fetcher {
        async fn fetch(&self, request: SampleRequest) -> ResourceSample;
    }
}

fn instances(resources: Vec<Value>) -> Vec<ResourceInstance> {
    resources
        .iter()
        .map(|r| ResourceInstance::from_resource(r).unwrap())
        .collect()
}

fn patients(n: usize) -> Vec<ResourceInstance> {
    instances(
        (1..=n)
            .map(|i| json!({"resourceType": "Patient", "id": i.to_string()}))
            .collect(),
    )
}

fn timed_out(request: &SampleRequest) -> ResourceSample {
    ResourceSample::failure(
        request.resource_type.clone(),
        FetchFailure::timeout("Request timed out"),
        request.max_count,
    )
}

fn assessor(fetcher: MockFetcher) -> Assessor {
    Assessor::new(Arc::new(fetcher), QualityRubric::default())
}

// ============================================================================
// Planning and fetching
// ============================================================================

#[tokio::test]
async fn test_each_type_fetched_once_with_planned_budget() {
    let mut fetcher = MockFetcher::new();
    for (resource_type, budget) in [
        (ResourceType::Patient, 50),
        (ResourceType::Observation, 30),
        (ResourceType::CarePlan, 10),
    ] {
        let expected = SampleRequest::new(resource_type, budget);
        fetcher
            .expect_fetch()
            .with(eq(expected))
            .times(1)
            .returning(|request| ResourceSample::success(request.resource_type, Vec::new(), request.max_count));
    }

    let report = assessor(fetcher)
        .assess(&[ResourceType::CarePlan, ResourceType::Patient, ResourceType::Observation])
        .await;

    assert_eq!(report.resource_types.len(), 3, "one section per tracked type");
    assert_eq!(report.section(&ResourceType::Patient).unwrap().requested_count, 50);
}

#[tokio::test]
async fn test_duplicate_types_are_fetched_once() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .times(1)
        .returning(|request| ResourceSample::success(request.resource_type, patients(2), request.max_count));

    let report = assessor(fetcher)
        .assess(&[ResourceType::Patient, ResourceType::Patient])
        .await;
    assert_eq!(report.resource_types.len(), 1);
}

// ============================================================================
// Degraded servers
// ============================================================================

#[tokio::test]
async fn test_partial_failure_scenario() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(3).returning(|request| match request.resource_type {
        ResourceType::Patient => ResourceSample::success(ResourceType::Patient, patients(10), request.max_count),
        ResourceType::Observation => timed_out(&request),
        _ => ResourceSample::success(request.resource_type, Vec::new(), request.max_count),
    });

    let report = assessor(fetcher)
        .assess(&[ResourceType::Patient, ResourceType::Observation, ResourceType::Condition])
        .await;

    assert_eq!(report.resource_types.len(), 3, "all three types are reported");
    assert!(report.score > 0 && report.score < 100, "score {} should be degraded", report.score);
    // (30 * 100 + 20 * 0 + 20 * 50) / 70
    assert_eq!(report.score, 57);
    assert_eq!(report.rating, QualityRating::Fair);

    let failures: Vec<_> = report.issues.iter().filter(|i| i.category.is_failure()).collect();
    assert_eq!(failures.len(), 1, "exactly one failure-class issue");
    assert_eq!(failures[0].resource_type, ResourceType::Observation);
    assert_eq!(report.issues[0].category, IssueCategory::RetrievalFailure);
    assert_eq!(report.issues_in(IssueCategory::EmptyResource).count(), 1);
}

#[tokio::test]
async fn test_all_failures_score_zero_with_one_issue_each() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(6).returning(|request| timed_out(&request));

    let rubric = QualityRubric::default();
    let report = Assessor::new(Arc::new(fetcher), rubric.clone())
        .assess(&rubric.default_types())
        .await;

    assert_eq!(report.score, 0);
    assert_eq!(report.rating, QualityRating::Poor);
    assert_eq!(report.issues.len(), 6);
    assert!(report
        .issues
        .iter()
        .all(|i| i.category == IssueCategory::RetrievalFailure));
}

#[tokio::test]
async fn test_clean_server_scores_100() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(2).returning(|request| match request.resource_type {
        ResourceType::Patient => ResourceSample::success(ResourceType::Patient, patients(3), request.max_count),
        _ => ResourceSample::success(
            ResourceType::Observation,
            instances(vec![
                json!({"resourceType": "Observation", "id": "o1", "subject": {"reference": "Patient/1"}}),
                json!({"resourceType": "Observation", "id": "o2", "subject": {"reference": "Patient/3"}}),
            ]),
            request.max_count,
        ),
    });

    let report = assessor(fetcher)
        .assess(&[ResourceType::Patient, ResourceType::Observation])
        .await;

    assert_eq!(report.score, 100);
    assert!(report.issues.is_empty());
    assert_eq!(report.section(&ResourceType::Observation).unwrap().references.resolved, 2);
}

// ============================================================================
// Reference integrity
// ============================================================================

#[tokio::test]
async fn test_reference_to_unsampled_type_does_not_penalize() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(1).returning(|request| {
        ResourceSample::success(
            ResourceType::Observation,
            instances(vec![json!({
                "resourceType": "Observation",
                "id": "o1",
                "performer": [{"reference": "Practitioner/p1"}]
            })]),
            request.max_count,
        )
    });

    let report = assessor(fetcher).assess(&[ResourceType::Observation]).await;

    let section = report.section(&ResourceType::Observation).unwrap();
    assert_eq!(section.references.unverifiable, 1);
    assert_eq!(section.references.orphaned, 0);
    assert_eq!(report.score, 100);
}

#[tokio::test]
async fn test_orphaned_and_malformed_references_are_reported() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(2).returning(|request| match request.resource_type {
        ResourceType::Patient => {
            ResourceSample::success(ResourceType::Patient, instances(vec![json!({"resourceType": "Patient", "id": "456"})]), request.max_count)
        }
        _ => ResourceSample::success(
            ResourceType::Condition,
            instances(vec![
                json!({"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/123"}}),
                json!({"resourceType": "Condition", "id": "c2", "subject": {"reference": "Patient/456"}}),
                json!({"resourceType": "Condition", "id": "c3", "subject": {"reference": "/456"}}),
            ]),
            request.max_count,
        ),
    });

    let report = assessor(fetcher)
        .assess(&[ResourceType::Patient, ResourceType::Condition])
        .await;

    let section = report.section(&ResourceType::Condition).unwrap();
    assert_eq!(section.references.total, 3);
    assert_eq!(section.references.resolved, 1);
    assert_eq!(section.references.orphaned, 1);
    assert_eq!(section.references.malformed, 1);
    assert_eq!(section.findings.len(), 2, "only violations are listed");
    // 100 - 5 - 10
    assert_eq!(section.score, 85.0);

    let categories: Vec<_> = report.issues.iter().map(|i| i.category).collect();
    assert_eq!(
        categories,
        vec![IssueCategory::OrphanedReference, IssueCategory::MalformedReference]
    );
}

#[tokio::test]
async fn test_report_serializes_for_tool_output() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(1).returning(|request| timed_out(&request));

    let report = assessor(fetcher).assess(&[ResourceType::Patient]).await;
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["score"], 0);
    assert_eq!(value["rating"], "poor");
    assert_eq!(value["resourceTypes"][0]["resourceType"], "Patient");
    assert_eq!(value["resourceTypes"][0]["fetchOutcome"]["status"], "failure");
    assert_eq!(value["issues"][0]["category"], "retrieval-failure");
}
