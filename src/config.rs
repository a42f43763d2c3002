//! # Configuration File
//!
//! JSON configuration: server settings, logging, model declarations and
//! API keys. Every section and field is optional.
//!
//! ```json
//! {
//!   "server": {"port": 54321, "base_path": "/playground", "require_api_key": true},
//!   "logging": {"format": "json"},
//!   "models": {
//!     "recipe": {
//!       "attributes": ["title", {"details": ["body", "servings"]}],
//!       "requests": {"create": {"fields": ["title", "body"]}, "update": true, "delete": true},
//!       "filters": [{"field": "title", "type": "partial"}],
//!       "validations": {"required": ["title"]},
//!       "seed": [{"title": "Soup", "body": "Hot"}]
//!     }
//!   },
//!   "api_keys": [{"name": "ci", "token_digest": "..."}]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{ApiKey, MemoryApiKeyStore};
use crate::http_server::HttpServerConfig;
use crate::observability::LoggingConfig;
use crate::playground::inflection::singularize;
use crate::playground::{
    MemoryStore, ModelConfiguration, ModelOptions, Registry, Relation, StoreError,
};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid JSON, or a value of the wrong shape
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed but inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// A seed row was rejected by the model's store
    #[error("Seed data for '{model}' rejected: {source}")]
    Seed {
        model: String,
        #[source]
        source: StoreError,
    },
}

/// Store-side rules for a configured model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validations {
    /// Fields that must be present and non-blank
    #[serde(default)]
    pub required: Vec<String>,

    /// Stamp `created_at` / `updated_at`
    #[serde(default)]
    pub timestamps: bool,
}

/// One entry of `models`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(flatten)]
    pub options: ModelOptions,

    #[serde(default)]
    pub validations: Validations,

    /// Rows loaded into the store at startup
    #[serde(default)]
    pub seed: Vec<Map<String, Value>>,
}

/// One entry of `api_keys`; only the token digest is ever configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub name: String,
    pub token_digest: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKey> for ApiKeyEntry {
    fn from(key: &ApiKey) -> Self {
        Self {
            name: key.name.clone(),
            token_digest: key.token_digest.clone(),
            expires_at: key.expires_at,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,

    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

impl PlaygroundConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content)?;
        debug!(path = %path.display(), models = config.models.len(), "config loaded");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: PlaygroundConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        for name in self.models.keys() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("model names must not be empty".to_string()));
            }
            // Requests singularize the path segment before lookup
            if singularize(name) != *name {
                return Err(ConfigError::Invalid(format!(
                    "model name '{}' must be singular (did you mean '{}'?)",
                    name,
                    singularize(name)
                )));
            }
        }

        if self.server.require_api_key && self.api_keys.is_empty() {
            return Err(ConfigError::Invalid(
                "require_api_key is set but no api_keys are configured".to_string(),
            ));
        }

        for key in &self.api_keys {
            if key.name.trim().is_empty() || key.token_digest.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "api_keys entries need a name and a token_digest".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Register every model with a fresh in-memory store and load its seed
    /// rows. Each store's columns are the model's exposed attributes.
    pub fn build_registry(&self) -> ConfigResult<Registry> {
        let registry = Registry::new();

        for (name, model) in &self.models {
            let config = ModelConfiguration::normalize(name.clone(), model.options.clone());
            let mut store = MemoryStore::for_model(&config)
                .require(model.validations.required.iter().cloned());
            if model.validations.timestamps {
                store = store.with_timestamps();
            }

            for row in &model.seed {
                seed_row(&store, &config.relationships, row).map_err(|source| {
                    ConfigError::Seed {
                        model: name.clone(),
                        source,
                    }
                })?;
            }

            registry.bind(name.clone(), Arc::new(store));
            registry.replace(config);
            info!(model = %name, seeded = model.seed.len(), "model registered");
        }

        Ok(registry)
    }

    /// Key store holding the configured digests
    pub fn build_api_keys(&self) -> MemoryApiKeyStore {
        MemoryApiKeyStore::with_keys(
            self.api_keys
                .iter()
                .map(|entry| ApiKey::from_digest(&entry.name, &entry.token_digest, entry.expires_at))
                .collect(),
        )
    }
}

/// Store one seed row. Members named after a declared relationship become
/// links rather than fields.
fn seed_row(
    store: &MemoryStore,
    relationships: &[String],
    row: &Map<String, Value>,
) -> Result<(), StoreError> {
    let mut fields = row.clone();
    let links: Vec<(String, Relation)> = relationships
        .iter()
        .filter_map(|name| fields.remove(name).map(|value| (name.clone(), relation(&value))))
        .collect();

    let record = store.seed(&fields)?;
    for (name, relation) in links {
        store.link(record.id(), &name, relation)?;
    }
    Ok(())
}

fn relation(value: &Value) -> Relation {
    let id = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    match value {
        Value::Array(items) => Relation::Many(items.iter().filter_map(id).collect()),
        other => Relation::One(id(other)),
    }
}
