//! Remote Resource Client
//!
//! Every HTTP interaction with the FHIR server goes through [`FhirClient`]. The
//! sampling entry point ([`ResourceFetcher::fetch`]) never returns an error:
//! timeouts, transport problems and non-2xx answers are folded into the
//! [`FetchOutcome`] of the returned [`ResourceSample`].

use crate::bundle::Bundle;
use crate::config::FhirClientConfig;
use crate::error::{FhirError, FhirResult};
use crate::outcome::OperationOutcome;
use crate::redact::loggable_url;
use crate::resource_type::ResourceType;
use crate::sample::{FetchFailure, FetchOutcome, ResourceInstance, ResourceSample, SampleRequest};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Media type requested from the server
pub const FHIR_JSON: &str = "application/fhir+json";

/// Largest `_count` requested per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Source of resource samples
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch up to `request.max_count` instances of one resource type.
    ///
    /// Never fails: problems are reported through the sample's fetch outcome.
    async fn fetch(&self, request: SampleRequest) -> ResourceSample;
}

/// HTTP client bound to one FHIR server
pub struct FhirClient {
    http: reqwest::Client,
    config: FhirClientConfig,
}

impl FhirClient {
    /// Create a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: FhirClientConfig) -> FhirResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fhir-mcp-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FhirError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(base_url = %config.display_base_url(), "FHIR client initialized");
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FhirClientConfig {
        &self.config
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> String {
        self.config.display_base_url()
    }

    /// Read one resource by id (`GET [base]/[type]/[id]`)
    pub async fn read(&self, resource_type: &ResourceType, id: &str) -> FhirResult<Value> {
        let url = self.endpoint(&[resource_type.as_str(), id])?;
        self.get_json(url).await
    }

    /// Run one search and return the first page (`GET [base]/[type]?params`)
    pub async fn search(&self, resource_type: &ResourceType, params: &[(String, String)]) -> FhirResult<Bundle> {
        let mut url = self.endpoint(&[resource_type.as_str()])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        into_bundle(self.get_json(url).await?)
    }

    /// Fetch the server's CapabilityStatement (`GET [base]/metadata`)
    pub async fn capabilities(&self) -> FhirResult<Value> {
        let url = self.endpoint(&["metadata"])?;
        self.get_json(url).await
    }

    fn endpoint(&self, segments: &[&str]) -> FhirResult<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FhirError::Configuration("FHIR base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sample_url(&self, request: &SampleRequest) -> FhirResult<Url> {
        let mut url = self.endpoint(&[request.resource_type.as_str()])?;
        let page_size = request.max_count.min(MAX_PAGE_SIZE).to_string();
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in request.params.iter().filter(|(name, _)| name != "_count") {
                query.append_pair(name, value);
            }
            query.append_pair("_count", &page_size);
        }
        Ok(url)
    }

    /// Resolve a `next` link. The bearer token is only ever sent to the
    /// configured server, so links to another origin are refused.
    fn next_page_url(&self, link: &str) -> FhirResult<Url> {
        let next = Url::parse(link)
            .or_else(|_| self.config.base_url.join(link))
            .map_err(|e| FhirError::InvalidResponse(format!("Invalid next link '{}': {}", link, e)))?;
        if next.origin() != self.config.base_url.origin() {
            return Err(FhirError::InvalidResponse(format!(
                "Next link points outside the FHIR server: {}",
                loggable_url(&next)
            )));
        }
        Ok(next)
    }

    /// Issue one GET and decode the JSON body, mapping every failure mode to [`FhirError`]
    async fn get_json(&self, url: Url) -> FhirResult<Value> {
        let target = loggable_url(&url);
        let started = Instant::now();

        let mut request = self.http.get(url).header(ACCEPT, FHIR_JSON);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = "GET", target = %target, error = %e, "FHIR request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(method = "GET", target = %target, status = status.as_u16(), error = %e, "Failed to read FHIR response body");
            FhirError::from(e)
        })?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let parsed = serde_json::from_str::<Value>(&body);

        if !status.is_success() {
            let outcome = parsed.ok().and_then(|v| OperationOutcome::from_value(&v));
            warn!(
                method = "GET",
                target = %target,
                status = status.as_u16(),
                elapsed_ms,
                "FHIR request returned an error status"
            );
            return Err(FhirError::Remote {
                status: status.as_u16(),
                outcome,
            });
        }

        let value = parsed.map_err(|e| {
            warn!(method = "GET", target = %target, status = status.as_u16(), "FHIR response is not JSON");
            FhirError::InvalidResponse(format!("Response is not valid JSON: {}", e))
        })?;

        if let Some(outcome) = OperationOutcome::from_value(&value) {
            warn!(method = "GET", target = %target, status = status.as_u16(), "FHIR server answered with an OperationOutcome");
            return Err(FhirError::Remote {
                status: status.as_u16(),
                outcome: Some(outcome),
            });
        }

        let entries = value
            .get("entry")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(
            method = "GET",
            target = %target,
            status = status.as_u16(),
            entries,
            elapsed_ms,
            "FHIR request"
        );
        Ok(value)
    }

    async fn fetch_sample(&self, request: SampleRequest) -> ResourceSample {
        let requested = request.max_count;
        let resource_type = request.resource_type.clone();
        let limit = usize::try_from(requested).unwrap_or(usize::MAX);

        if requested == 0 {
            return ResourceSample::success(resource_type, Vec::new(), 0);
        }

        let mut url = match self.sample_url(&request) {
            Ok(url) => url,
            Err(e) => return ResourceSample::failure(resource_type, e.into(), requested),
        };

        let mut instances: Vec<ResourceInstance> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages: u32 = 0;

        loop {
            visited.insert(url.to_string());
            pages = pages.saturating_add(1);

            let bundle = match self.get_json(url).await.and_then(into_bundle) {
                Ok(bundle) => bundle,
                Err(e) => {
                    let failure = FetchFailure::from(e);
                    if pages == 1 {
                        return ResourceSample::failure(resource_type, failure, requested);
                    }
                    return ResourceSample::new(
                        resource_type,
                        instances,
                        FetchOutcome::PartialFailure { failure },
                        requested,
                    );
                }
            };

            let mut ignored = 0usize;
            for resource in bundle.resources() {
                match ResourceInstance::from_resource(resource) {
                    Some(instance) if instance.resource_type == resource_type => instances.push(instance),
                    _ => ignored += 1,
                }
            }
            if ignored > 0 {
                debug!(resource_type = %resource_type, ignored, "Skipped bundle entries of another type");
            }

            if instances.len() >= limit {
                instances.truncate(limit);
                break;
            }

            let Some(link) = bundle.next_link() else {
                break;
            };
            if pages >= self.config.max_pages {
                debug!(resource_type = %resource_type, pages, "Page limit reached, sample truncated");
                break;
            }

            let next = match self.next_page_url(link) {
                Ok(next) => next,
                Err(e) => {
                    return ResourceSample::new(
                        resource_type,
                        instances,
                        FetchOutcome::PartialFailure { failure: e.into() },
                        requested,
                    );
                }
            };
            if visited.contains(next.as_str()) {
                warn!(resource_type = %resource_type, "Server repeated a pagination link, stopping");
                break;
            }
            url = next;
        }

        ResourceSample::success(resource_type, instances, requested)
    }
}

#[async_trait]
impl ResourceFetcher for FhirClient {
    async fn fetch(&self, request: SampleRequest) -> ResourceSample {
        self.fetch_sample(request).await
    }
}

fn into_bundle(value: Value) -> FhirResult<Bundle> {
    let declared = value
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    Bundle::from_value(value)
        .ok_or_else(|| FhirError::InvalidResponse(format!("Expected a Bundle, got {}", declared)))
}
