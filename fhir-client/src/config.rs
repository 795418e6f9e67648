//! Client configuration
use crate::error::{FhirError, FhirResult};
use reqwest::Url;
use secrecy::SecretString;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on pagination links followed by one fetch
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Connection settings for one FHIR server
#[derive(Debug)]
pub struct FhirClientConfig {
    /// Service base URL, always ending in `/`
    pub base_url: Url,
    /// Optional bearer token
    pub auth_token: Option<SecretString>,
    /// Timeout applied to every HTTP request
    pub timeout: Duration,
    /// Maximum number of pages one fetch may read
    pub max_pages: u32,
}

impl FhirClientConfig {
    /// Create a configuration for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Configuration`] when the URL is not an absolute
    /// `http` or `https` URL.
    pub fn new(base_url: &str) -> FhirResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.trim().is_empty() {
            None
        } else {
            Some(SecretString::new(token))
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Base URL without the trailing slash, for display
    pub fn display_base_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

fn normalize_base_url(raw: &str) -> FhirResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FhirError::Configuration("FHIR base URL is empty".to_string()));
    }

    let mut url = Url::parse(trimmed)
        .map_err(|e| FhirError::Configuration(format!("Invalid FHIR base URL '{}': {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FhirError::Configuration(format!(
            "FHIR base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(FhirError::Configuration(format!(
            "FHIR base URL '{}' has no host",
            trimmed
        )));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = FhirClientConfig::new("https://hapi.fhir.org/baseR4").unwrap();
        assert_eq!(config.base_url.as_str(), "https://hapi.fhir.org/baseR4/");
        assert_eq!(config.display_base_url(), "https://hapi.fhir.org/baseR4");
        assert_eq!(
            config.base_url.join("Patient").unwrap().as_str(),
            "https://hapi.fhir.org/baseR4/Patient"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(FhirClientConfig::new(""), Err(FhirError::Configuration(_))));
        assert!(matches!(FhirClientConfig::new("not a url"), Err(FhirError::Configuration(_))));
        assert!(matches!(FhirClientConfig::new("ftp://fhir.example/r4"), Err(FhirError::Configuration(_))));
        assert!(matches!(FhirClientConfig::new("mailto:someone@example.org"), Err(FhirError::Configuration(_))));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let config = FhirClientConfig::new("http://localhost:8080/fhir")
            .unwrap()
            .with_auth_token("   ");
        assert!(config.auth_token.is_none());

        let config = FhirClientConfig::new("http://localhost:8080/fhir")
            .unwrap()
            .with_auth_token("abc123");
        assert_eq!(config.auth_token.unwrap().expose_secret(), "abc123");
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let config = FhirClientConfig::new("http://localhost:8080/fhir")
            .unwrap()
            .with_auth_token("super-secret-token");
        assert!(!format!("{:?}", config).contains("super-secret-token"));
    }
}
