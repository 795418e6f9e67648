//! Resource samples: the outcome of one bounded fetch for one resource type
use crate::error::FhirError;
use crate::outcome::OperationOutcome;
use crate::resource_type::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// What to fetch for one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRequest {
    pub resource_type: ResourceType,
    /// Search parameters, forwarded verbatim
    pub params: Vec<(String, String)>,
    /// Upper bound on instances returned
    pub max_count: u32,
}

impl SampleRequest {
    pub fn new(resource_type: ResourceType, max_count: u32) -> Self {
        Self {
            resource_type,
            params: Vec::new(),
            max_count,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// One fetched resource instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInstance {
    pub id: Option<String>,
    pub resource_type: ResourceType,
    /// Every other top-level field of the resource
    pub fields: Map<String, Value>,
}

impl ResourceInstance {
    /// Split a raw resource into id, type and remaining fields.
    ///
    /// Returns `None` when the value is not an object or carries no valid `resourceType`.
    pub fn from_resource(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let resource_type = object
            .get("resourceType")
            .and_then(Value::as_str)?
            .parse::<ResourceType>()
            .ok()?;
        let id = object.get("id").and_then(Value::as_str).map(str::to_string);
        let fields = object
            .iter()
            .filter(|(key, _)| key.as_str() != "resourceType" && key.as_str() != "id")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self {
            id,
            resource_type,
            fields,
        })
    }

    /// `Type/id` when the instance has an id
    pub fn reference(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| format!("{}/{}", self.resource_type, id))
    }
}

/// Broad class of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Remote,
    InvalidResponse,
}

/// Why a fetch (or part of it) failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub reason: String,
    /// Structured payload supplied by the remote server, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
}

impl FetchFailure {
    pub fn timeout(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            status: None,
            reason: reason.into(),
            outcome: None,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl From<FhirError> for FetchFailure {
    fn from(err: FhirError) -> Self {
        let reason = err.to_string();
        match err {
            FhirError::Timeout(_) => Self::timeout(reason),
            FhirError::Transport(_) | FhirError::Configuration(_) => Self {
                kind: FailureKind::Transport,
                status: None,
                reason,
                outcome: None,
            },
            FhirError::Remote { status, outcome } => Self {
                kind: FailureKind::Remote,
                status: Some(status),
                reason,
                outcome,
            },
            FhirError::InvalidResponse(_) => Self {
                kind: FailureKind::InvalidResponse,
                status: None,
                reason,
                outcome: None,
            },
        }
    }
}

/// Result of fetching one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FetchOutcome {
    Success,
    /// Some pages were read before a later page failed
    PartialFailure { failure: FetchFailure },
    Failure { failure: FetchFailure },
}

impl FetchOutcome {
    /// Whether the fetch produced usable evidence about the resource type
    pub fn is_sampled(&self) -> bool {
        !matches!(self, FetchOutcome::Failure { .. })
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Success => None,
            FetchOutcome::PartialFailure { failure } | FetchOutcome::Failure { failure } => Some(failure),
        }
    }
}

/// One fetched batch for a resource type. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    resource_type: ResourceType,
    instances: Vec<ResourceInstance>,
    fetch_outcome: FetchOutcome,
    requested_count: u32,
    returned_count: u32,
}

impl ResourceSample {
    pub fn new(
        resource_type: ResourceType,
        instances: Vec<ResourceInstance>,
        fetch_outcome: FetchOutcome,
        requested_count: u32,
    ) -> Self {
        let returned_count = u32::try_from(instances.len()).unwrap_or(u32::MAX);
        Self {
            resource_type,
            instances,
            fetch_outcome,
            requested_count,
            returned_count,
        }
    }

    /// A successful sample
    pub fn success(resource_type: ResourceType, instances: Vec<ResourceInstance>, requested_count: u32) -> Self {
        Self::new(resource_type, instances, FetchOutcome::Success, requested_count)
    }

    /// A sample whose fetch failed outright
    pub fn failure(resource_type: ResourceType, failure: FetchFailure, requested_count: u32) -> Self {
        Self::new(resource_type, Vec::new(), FetchOutcome::Failure { failure }, requested_count)
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn instances(&self) -> &[ResourceInstance] {
        &self.instances
    }

    pub fn fetch_outcome(&self) -> &FetchOutcome {
        &self.fetch_outcome
    }

    pub fn requested_count(&self) -> u32 {
        self.requested_count
    }

    pub fn returned_count(&self) -> u32 {
        self.returned_count
    }
}
