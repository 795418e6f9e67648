use anyhow::Context;
use clap::Parser;
use fhir_bridge::{build_server, BridgeConfig, LogFormat};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = BridgeConfig::parse();

    init_tracing(config.verbose, config.log_format)?;

    info!("🏥 Starting FHIR MCP bridge");
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION"));
    info!("🌐 FHIR server: {}", config.base_url);
    if config.auth_token.is_some() {
        info!("🔐 Bearer token authentication enabled");
    }
    if let Some(path) = &config.rubric_path {
        info!("📐 Quality rubric: {}", path.display());
    }

    let server = build_server(&config).context("Invalid configuration")?;
    info!("🔧 {} tools registered", server.tools().len());
    info!("🚀 Serving MCP over stdio");

    Arc::new(server)
        .serve(mcp_server::stdio())
        .await
        .context("MCP transport failed")?;

    info!("👋 Client disconnected, shutting down");
    Ok(())
}

/// Logs go to stderr only: stdout carries the JSON-RPC stream.
fn init_tracing(verbose: bool, format: LogFormat) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "fhir_bridge={level},fhir_mcp_bridge={level},fhir_client={level},data_quality={level},mcp_server={level}",
            level = level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    }
    .context("Failed to initialise logging")
}
