//! Process configuration
//!
//! Every option is a CLI flag with an environment fallback. `.env` files are
//! loaded by the binary before parsing. Configuration is fixed for the
//! lifetime of the process.

use crate::error::BridgeResult;
use clap::{Parser, ValueEnum};
use data_quality::QualityRubric;
use fhir_client::FhirClientConfig;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Public HAPI test server
pub const DEFAULT_BASE_URL: &str = "https://hapi.fhir.org/baseR4";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// FHIR MCP bridge
#[derive(Parser, Clone)]
#[command(name = "fhir-mcp-bridge")]
#[command(about = "MCP server exposing a FHIR R4 server to AI agents over stdio")]
#[command(version)]
pub struct BridgeConfig {
    /// FHIR server base URL
    #[arg(long, env = "FHIR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Bearer token sent with every FHIR request
    #[arg(long, env = "FHIR_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FHIR_TIMEOUT_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Maximum pages followed by one sampling fetch
    #[arg(long, env = "FHIR_MAX_PAGES", default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// YAML file overriding the data-quality rubric
    #[arg(long = "rubric", env = "FHIR_QUALITY_RUBRIC")]
    pub rubric_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log format (logs always go to stderr)
    #[arg(long, env = "FHIR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl BridgeConfig {
    /// FHIR client settings; fails on a malformed base URL
    pub fn client_config(&self) -> BridgeResult<FhirClientConfig> {
        let mut config = FhirClientConfig::new(&self.base_url)?
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_pages(self.max_pages);
        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(token.clone());
        }
        Ok(config)
    }

    /// The rubric file when one is configured, the built-in table otherwise
    pub fn rubric(&self) -> BridgeResult<QualityRubric> {
        let rubric = match &self.rubric_path {
            Some(path) => QualityRubric::from_yaml_file(path)?,
            None => {
                let rubric = QualityRubric::default();
                rubric.validate()?;
                rubric
            }
        };
        Ok(rubric)
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("rubric_path", &self.rubric_path)
            .field("verbose", &self.verbose)
            .field("log_format", &self.log_format)
            .finish()
    }
}
