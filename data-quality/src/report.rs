//! Quality report types
use crate::integrity::{FindingKind, IntegrityFinding};
use fhir_client::{FetchOutcome, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final artifact of one assessment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Overall score in [0, 100]
    pub score: u8,
    pub rating: QualityRating,
    /// One section per tracked type, in plan order
    pub resource_types: Vec<ResourceAssessment>,
    /// Ordered issue list: failures, orphaned references, malformed references, empty types
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn section(&self, resource_type: &ResourceType) -> Option<&ResourceAssessment> {
        self.resource_types.iter().find(|s| &s.resource_type == resource_type)
    }

    pub fn issues_in(&self, category: IssueCategory) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssessment {
    pub resource_type: ResourceType,
    pub fetch_outcome: FetchOutcome,
    pub requested_count: u32,
    pub returned_count: u32,
    /// The type's own rubric score, one decimal
    pub score: f64,
    pub weight: f64,
    pub references: ReferenceSummary,
    /// Orphaned and malformed findings only
    pub findings: Vec<IntegrityFinding>,
}

/// Resolution counts for the references of one type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub total: u32,
    pub resolved: u32,
    pub unverifiable: u32,
    pub orphaned: u32,
    pub malformed: u32,
}

impl ReferenceSummary {
    pub fn record(&mut self, kind: FindingKind) {
        self.total = self.total.saturating_add(1);
        let counter = match kind {
            FindingKind::Resolved => &mut self.resolved,
            FindingKind::Unverifiable => &mut self.unverifiable,
            FindingKind::Orphaned => &mut self.orphaned,
            FindingKind::Malformed => &mut self.malformed,
        };
        *counter = counter.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueSeverity::Error => "ERROR",
            IssueSeverity::Warning => "WARNING",
            IssueSeverity::Information => "INFO",
        };
        f.write_str(label)
    }
}

/// Issue categories, declared in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    RetrievalFailure,
    PartialRetrieval,
    OrphanedReference,
    MalformedReference,
    EmptyResource,
}

impl IssueCategory {
    pub fn severity(self) -> IssueSeverity {
        match self {
            IssueCategory::RetrievalFailure | IssueCategory::MalformedReference => IssueSeverity::Error,
            IssueCategory::PartialRetrieval | IssueCategory::OrphanedReference => IssueSeverity::Warning,
            IssueCategory::EmptyResource => IssueSeverity::Information,
        }
    }

    /// Retrieval failures, complete or partial
    pub fn is_failure(self) -> bool {
        matches!(self, IssueCategory::RetrievalFailure | IssueCategory::PartialRetrieval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub resource_type: ResourceType,
    pub description: String,
}

impl QualityIssue {
    pub fn new(category: IssueCategory, resource_type: ResourceType, description: impl Into<String>) -> Self {
        Self {
            severity: category.severity(),
            category,
            resource_type,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => QualityRating::Excellent,
            60..=79 => QualityRating::Good,
            40..=59 => QualityRating::Fair,
            _ => QualityRating::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityRating::Excellent => "EXCELLENT",
            QualityRating::Good => "GOOD",
            QualityRating::Fair => "FAIR",
            QualityRating::Poor => "POOR",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QualityRating::Excellent => "This server has high-quality, well-connected data",
            QualityRating::Good => "This server has decent data with some issues",
            QualityRating::Fair => "This server has significant data quality issues",
            QualityRating::Poor => "This server has major data quality problems",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.description())
    }
}
