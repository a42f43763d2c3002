//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tracing::info;

use crate::auth::api_key::new_key;
use crate::auth::ApiKeyGate;
use crate::config::{ApiKeyEntry, PlaygroundConfig};
use crate::http_server::HttpServer;
use crate::observability::init_logging;
use crate::playground::openapi;
use crate::playground::server::normalize_base_path;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_line, write_pretty};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
        Command::Openapi { config } => print_openapi(&config),
        Command::GenerateKey {
            name,
            expires_in_days,
        } => generate_key(&name, expires_in_days),
    }
}

/// Load the configuration, build the registry and serve until stopped
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = PlaygroundConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    init_logging(&config.logging);

    let registry = Arc::new(config.build_registry()?);
    let gate = ApiKeyGate::new(
        Arc::new(config.build_api_keys()),
        config.server.require_api_key,
    );
    info!(
        config = %config_path.display(),
        models = ?registry.model_names(),
        "configuration loaded"
    );

    let server = HttpServer::new(config.server.clone(), registry, gate);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate the configuration and print the normalized models
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = PlaygroundConfig::load(config_path)?;
    let registry = config.build_registry()?;

    let models: Vec<_> = registry
        .configurations()
        .iter()
        .map(|model| {
            json!({
                "name": model.name,
                "type": model.resource_type(),
                "configuration": &**model,
            })
        })
        .collect();

    write_pretty(&json!({
        "base_path": normalize_base_path(&config.server.base_path),
        "require_api_key": config.server.require_api_key,
        "api_keys": config.api_keys.len(),
        "models": models,
    }))
}

/// Print the OpenAPI document
pub fn print_openapi(config_path: &Path) -> CliResult<()> {
    let config = PlaygroundConfig::load(config_path)?;
    let registry = config.build_registry()?;
    let base_path = normalize_base_path(&config.server.base_path);

    write_pretty(&openapi::document(&registry, &base_path))
}

/// Generate a key. The token goes to stdout once; only the digest belongs in
/// the configuration file.
pub fn generate_key(name: &str, expires_in_days: Option<u32>) -> CliResult<()> {
    let ttl = expires_in_days.map(|days| Duration::days(i64::from(days)));
    let (key, token) = new_key(name, ttl)?;

    write_line(&format!("token: {}", token))?;
    write_line("Add this entry to \"api_keys\" in the configuration file:")?;
    write_pretty(&ApiKeyEntry::from(&key))
}
