//! Assessment Orchestrator
//!
//! Drives one run: plan the samples, fetch them with bounded concurrency,
//! resolve references across the full sample set, then score. A failing type
//! never stops the run; every run reaches [`AssessmentPhase::Done`].

use crate::integrity::resolve;
use crate::references::extract_edges;
use crate::report::QualityReport;
use crate::rubric::QualityRubric;
use crate::sampling::{plan_samples, SamplingPlan};
use crate::scoring::score;
use fhir_client::{FetchFailure, ResourceFetcher, ResourceSample, ResourceType};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of one assessment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentPhase {
    NotStarted,
    Fetching { remaining: usize },
    Resolving,
    Scoring,
    Done,
}

impl fmt::Display for AssessmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentPhase::NotStarted => f.write_str("not-started"),
            AssessmentPhase::Fetching { remaining } => write!(f, "fetching ({} remaining)", remaining),
            AssessmentPhase::Resolving => f.write_str("resolving"),
            AssessmentPhase::Scoring => f.write_str("scoring"),
            AssessmentPhase::Done => f.write_str("done"),
        }
    }
}

/// Runs assessments against one fetcher with one rubric.
///
/// Holds no per-run state, so one instance can serve concurrent runs.
#[derive(Clone)]
pub struct Assessor {
    fetcher: Arc<dyn ResourceFetcher>,
    rubric: QualityRubric,
}

impl Assessor {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, rubric: QualityRubric) -> Self {
        Self { fetcher, rubric }
    }

    pub fn rubric(&self) -> &QualityRubric {
        &self.rubric
    }

    /// Assess the given types; an empty list yields an empty report scored 0
    #[instrument(name = "assess", skip_all, fields(types = tracked.len()))]
    pub async fn assess(&self, tracked: &[ResourceType]) -> QualityReport {
        let mut phase = AssessmentPhase::NotStarted;
        let plan = plan_samples(&self.rubric, tracked);

        transition(&mut phase, AssessmentPhase::Fetching { remaining: plan.len() });
        let samples = self.fetch_all(&plan, &mut phase).await;

        transition(&mut phase, AssessmentPhase::Resolving);
        let edges: Vec<_> = samples.iter().flat_map(extract_edges).collect();
        let findings = resolve(&edges, &samples);

        transition(&mut phase, AssessmentPhase::Scoring);
        let report = score(&samples, &findings, &self.rubric);

        transition(&mut phase, AssessmentPhase::Done);
        info!(
            score = report.score,
            types = report.resource_types.len(),
            references = edges.len(),
            issues = report.issues.len(),
            "Data quality assessment complete"
        );
        report
    }

    /// Fetch every planned sample, at most `maxConcurrentFetches` at a time.
    ///
    /// Samples come back in plan order whatever the completion order.
    async fn fetch_all(&self, plan: &SamplingPlan, phase: &mut AssessmentPhase) -> Vec<ResourceSample> {
        let limit = self.rubric.max_concurrent_fetches.max(1);
        let timeout = self.rubric.sample_timeout();

        let requests: Vec<_> = plan.iter().map(|planned| planned.request()).collect();
        let mut pending = stream::iter(requests.into_iter().enumerate().map(|(index, request)| {
            async move {
                let resource_type = request.resource_type.clone();
                let requested = request.max_count;
                let sample = match tokio::time::timeout(timeout, self.fetcher.fetch(request)).await {
                    Ok(sample) => sample,
                    Err(_) => {
                        warn!(resource_type = %resource_type, timeout_secs = timeout.as_secs(), "Sample fetch timed out");
                        ResourceSample::failure(
                            resource_type,
                            FetchFailure::timeout(format!("Sampling timed out after {}s", timeout.as_secs())),
                            requested,
                        )
                    }
                };
                (index, sample)
            }
        }))
        .buffer_unordered(limit);

        let mut fetched = Vec::with_capacity(plan.len());
        let mut remaining = plan.len();
        while let Some((index, sample)) = pending.next().await {
            debug!(
                resource_type = %sample.resource_type(),
                returned = sample.returned_count(),
                sampled = sample.fetch_outcome().is_sampled(),
                "Sample fetched"
            );
            remaining = remaining.saturating_sub(1);
            transition(phase, AssessmentPhase::Fetching { remaining });
            fetched.push((index, sample));
        }

        fetched.sort_by_key(|(index, _)| *index);
        fetched.into_iter().map(|(_, sample)| sample).collect()
    }
}

fn transition(phase: &mut AssessmentPhase, next: AssessmentPhase) {
    debug!(from = %phase, to = %next, "Assessment phase");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fhir_client::{FailureKind, FetchOutcome, ResourceInstance, SampleRequest};
    use serde_json::json;
    use std::time::Duration;

    /// Answers instantly except for one type, which never returns in time
    struct SlowFor(ResourceType);

    #[async_trait]
    impl ResourceFetcher for SlowFor {
        async fn fetch(&self, request: SampleRequest) -> ResourceSample {
            if request.resource_type == self.0 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let instance = ResourceInstance::from_resource(&json!({
                "resourceType": request.resource_type.as_str(),
                "id": "1"
            }))
            .unwrap();
            ResourceSample::success(request.resource_type, vec![instance], request.max_count)
        }
    }

    /// Completes in reverse plan order
    struct ReverseDelay;

    #[async_trait]
    impl ResourceFetcher for ReverseDelay {
        async fn fetch(&self, request: SampleRequest) -> ResourceSample {
            let delay = match request.resource_type {
                ResourceType::Patient => 30,
                ResourceType::Observation => 20,
                _ => 10,
            };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            ResourceSample::success(request.resource_type, Vec::new(), request.max_count)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out_for_that_type_only() {
        let assessor = Assessor::new(Arc::new(SlowFor(ResourceType::Observation)), QualityRubric::default());
        let report = assessor
            .assess(&[ResourceType::Patient, ResourceType::Observation, ResourceType::Condition])
            .await;

        assert_eq!(report.resource_types.len(), 3);
        let observation = report.section(&ResourceType::Observation).unwrap();
        match &observation.fetch_outcome {
            FetchOutcome::Failure { failure } => assert_eq!(failure.kind, FailureKind::Timeout),
            other => panic!("expected timeout failure, got {:?}", other),
        }
        assert_eq!(report.section(&ResourceType::Patient).unwrap().fetch_outcome, FetchOutcome::Success);
        assert_eq!(report.section(&ResourceType::Condition).unwrap().fetch_outcome, FetchOutcome::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sections_follow_plan_order() {
        let assessor = Assessor::new(Arc::new(ReverseDelay), QualityRubric::default());
        let report = assessor
            .assess(&[ResourceType::Condition, ResourceType::Patient, ResourceType::Observation])
            .await;

        let order: Vec<_> = report.resource_types.iter().map(|s| s.resource_type.clone()).collect();
        assert_eq!(
            order,
            vec![ResourceType::Patient, ResourceType::Observation, ResourceType::Condition]
        );
    }

    #[tokio::test]
    async fn test_empty_run_reaches_done_with_zero_score() {
        let assessor = Assessor::new(Arc::new(ReverseDelay), QualityRubric::default());
        let report = assessor.assess(&[]).await;
        assert_eq!(report.score, 0);
        assert!(report.resource_types.is_empty());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AssessmentPhase::Fetching { remaining: 2 }.to_string(), "fetching (2 remaining)");
        assert_eq!(AssessmentPhase::Done.to_string(), "done");
    }
}
