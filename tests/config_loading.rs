//! Configuration Loading Tests
//!
//! Loading configuration files from disk and building the runtime pieces:
//! - Defaults for every omitted section
//! - Model declarations normalized into the registry
//! - Seed rows and api keys
//! - Rejection of malformed files

use std::fs;
use std::path::PathBuf;

use playground::auth::{ApiKeyGate, ApiKeyStore, KeyStatus};
use playground::auth::crypto::hash_token;
use playground::config::{ConfigError, PlaygroundConfig};
use playground::observability::LogFormat;
use playground::playground::registry::WritePolicy;
use playground::playground::{Dispatcher, ListParams};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("playground.json");
    fs::write(&path, content).unwrap();
    path
}

fn full_config(digest: &str) -> String {
    json!({
        "server": {"port": 8080, "base_path": "/api", "require_api_key": true},
        "logging": {"format": "json"},
        "models": {
            "recipe": {
                "attributes": ["title", {"details": ["body", "servings"]}],
                "relationships": ["ingredients"],
                "requests": {"create": {"fields": ["title", "body"]}, "update": true, "delete": true},
                "filters": [{"field": "title", "type": "partial"}],
                "pagination": {"page_size": 500},
                "validations": {"required": ["title"], "timestamps": true},
                "seed": [
                    {"title": "Soup", "body": "Hot", "ingredients": ["1"]},
                    {"title": "Salad", "body": "Cold"}
                ]
            },
            "ingredient": {
                "attributes": ["name"],
                "pagination": {"enabled": false}
            }
        },
        "api_keys": [{"name": "ci", "token_digest": digest}]
    })
    .to_string()
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &full_config("digest"));

    let config = PlaygroundConfig::load(&path).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.base_path, "/api");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.models.len(), 2);
    assert_eq!(config.models["recipe"].seed.len(), 2);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = PlaygroundConfig::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{\"models\": ");
    assert!(matches!(
        PlaygroundConfig::load(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_unknown_filter_type_is_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"models": {"recipe": {"filters": [{"field": "title", "type": "regex"}]}}}"#,
    );
    assert!(matches!(
        PlaygroundConfig::load(&path),
        Err(ConfigError::Parse(_))
    ));
}

// =============================================================================
// Building
// =============================================================================

#[test]
fn test_registry_is_normalized() {
    let dir = TempDir::new().unwrap();
    let config = PlaygroundConfig::load(&write_config(&dir, &full_config("digest"))).unwrap();
    let registry = config.build_registry().unwrap();

    assert_eq!(registry.model_names(), vec!["ingredient", "recipe"]);

    let recipe = registry.configuration("recipe").unwrap();
    assert_eq!(recipe.pagination.page_size, 50);
    assert_eq!(
        recipe.requests.update,
        WritePolicy::Enabled {
            fields: vec![
                "title".to_string(),
                "body".to_string(),
                "servings".to_string()
            ]
        }
    );
    assert_eq!(
        recipe.attributes_json(),
        json!({"ungrouped": ["title"], "details": ["body", "servings"]})
    );

    let ingredient = registry.configuration("ingredient").unwrap();
    assert!(!ingredient.pagination.enabled);
    assert!(!ingredient.requests.create.is_enabled());
}

#[test]
fn test_seed_rows_are_served() {
    let dir = TempDir::new().unwrap();
    let config = PlaygroundConfig::load(&write_config(&dir, &full_config("digest"))).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(config.build_registry().unwrap()));

    let doc = dispatcher.list("recipes", &ListParams::default()).unwrap();
    assert_eq!(doc.meta.total_count, Some(2));

    let first = serde_json::to_value(&doc.data[0]).unwrap();
    assert_eq!(first["attributes"]["title"], "Soup");
    assert_eq!(first["attributes"]["details"]["body"], "Hot");
    assert_eq!(
        first["relationships"]["ingredients"]["data"],
        json!([{"id": "1", "type": "ingredients"}])
    );

    // The second row has no links and no servings
    let second = serde_json::to_value(&doc.data[1]).unwrap();
    assert_eq!(second["attributes"]["title"], "Salad");
    assert_eq!(second["attributes"]["details"]["servings"], Value::Null);
    assert!(second["attributes"].get("_errors").is_none());
    assert_eq!(second["relationships"]["ingredients"]["data"], json!([]));
}

#[test]
fn test_api_keys_from_digest() {
    let token = "raw-token-value";
    let dir = TempDir::new().unwrap();
    let config = PlaygroundConfig::load(&write_config(&dir, &full_config(&hash_token(token)))).unwrap();

    let keys = config.build_api_keys();
    assert_eq!(keys.list().unwrap().len(), 1);

    let gate = ApiKeyGate::new(Arc::new(keys), config.server.require_api_key);
    assert!(matches!(gate.validate(token).unwrap(), KeyStatus::Valid(_)));
    assert!(matches!(gate.validate("other").unwrap(), KeyStatus::Unknown));
}
