//! # Configuration Registry
//!
//! Holds one normalized [`ModelConfiguration`] per model name together with
//! the store that backs it. Declarations are shaped to the nearest valid
//! configuration; registering never fails.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::filter::FilterDef;
use super::inflection::{pluralize, singularize};
use super::pagination::{clamp_page_size, PaginationConfig, DEFAULT_PAGE_SIZE};
use super::store::RecordStore;

/// Group whose attributes are emitted flat in `attributes`
pub const UNGROUPED: &str = "ungrouped";

// ==================
// Declarations
// ==================

/// One entry of an `attributes` declaration: a field, or a map of group
/// name to fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeDecl {
    Field(String),
    Group(Map<String, Value>),
}

/// `create` / `update` declaration: a plain toggle or a field whitelist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WriteDecl {
    Toggle(bool),
    Spec {
        #[serde(default)]
        fields: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsDecl {
    pub create: Option<WriteDecl>,
    pub update: Option<WriteDecl>,
    pub delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationDecl {
    pub enabled: Option<bool>,
    pub page_size: Option<i64>,
    pub total_count: Option<bool>,
}

/// Declarative options for one model, as written in code or config files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub attributes: Vec<AttributeDecl>,
    pub relationships: Vec<String>,
    pub requests: RequestsDecl,
    pub filters: Vec<FilterDef>,
    pub pagination: PaginationDecl,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose fields flat in `attributes`
    pub fn attributes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .extend(fields.into_iter().map(|f| AttributeDecl::Field(f.into())));
        self
    }

    /// Expose fields nested under `name`
    pub fn group<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<Value> = fields
            .into_iter()
            .map(|f| Value::String(f.into()))
            .collect();
        let mut group = Map::new();
        group.insert(name.into(), Value::Array(fields));
        self.attributes.push(AttributeDecl::Group(group));
        self
    }

    pub fn relationships<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.extend(names.into_iter().map(Into::into));
        self
    }

    /// Allow create, accepting only `fields`
    pub fn create<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requests.create = Some(WriteDecl::Spec {
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Allow update, accepting only `fields`
    pub fn update<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requests.update = Some(WriteDecl::Spec {
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn delete(mut self, allowed: bool) -> Self {
        self.requests.delete = allowed;
        self
    }

    pub fn filter(mut self, filter: FilterDef) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn page_size(mut self, size: i64) -> Self {
        self.pagination.page_size = Some(size);
        self
    }

    pub fn without_pagination(mut self) -> Self {
        self.pagination.enabled = Some(false);
        self
    }

    pub fn without_total_count(mut self) -> Self {
        self.pagination.total_count = Some(false);
        self
    }
}

// ==================
// Normalized configuration
// ==================

/// Ordered fields emitted under one group name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeGroup {
    pub name: String,
    pub fields: Vec<String>,
}

impl AttributeGroup {
    pub fn is_ungrouped(&self) -> bool {
        self.name == UNGROUPED
    }
}

/// Whether a write operation is allowed, and which fields it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WritePolicy {
    Disabled,
    Enabled { fields: Vec<String> },
}

impl WritePolicy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, WritePolicy::Enabled { .. })
    }

    /// Whitelisted fields, `None` when the operation is disabled
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            WritePolicy::Enabled { fields } => Some(fields),
            WritePolicy::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestPolicy {
    pub create: WritePolicy,
    pub update: WritePolicy,
    pub delete: bool,
}

/// The normalized declaration of one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfiguration {
    pub name: String,
    /// Always starts with the (possibly empty) ungrouped group
    pub attributes: Vec<AttributeGroup>,
    pub relationships: Vec<String>,
    pub requests: RequestPolicy,
    pub filters: Vec<FilterDef>,
    pub pagination: PaginationConfig,
}

impl ModelConfiguration {
    /// Normalize a declaration
    pub fn normalize(name: impl Into<String>, options: ModelOptions) -> Self {
        let name = name.into();
        let attributes = normalize_attributes(&options.attributes);
        let exposed: Vec<String> = attributes
            .iter()
            .flat_map(|g| g.fields.iter().cloned())
            .collect();

        let requests = RequestPolicy {
            create: normalize_write(options.requests.create, &exposed),
            update: normalize_write(options.requests.update, &exposed),
            delete: options.requests.delete,
        };

        let defaults = PaginationConfig::default();
        let pagination = PaginationConfig {
            enabled: options.pagination.enabled.unwrap_or(defaults.enabled),
            page_size: clamp_page_size(options.pagination.page_size.unwrap_or(DEFAULT_PAGE_SIZE)),
            total_count: options.pagination.total_count.unwrap_or(defaults.total_count),
        };

        Self {
            name,
            attributes,
            relationships: options.relationships,
            requests,
            filters: options.filters,
            pagination,
        }
    }

    /// JSON:API resource type
    pub fn resource_type(&self) -> String {
        pluralize(&self.name)
    }

    /// Every exposed field, in output order
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .flat_map(|g| g.fields.iter().map(String::as_str))
            .collect()
    }

    /// Whether a relationship is a collection. Relationships named in the
    /// plural (`ingredients`) are to-many, singular names (`author`) to-one.
    pub fn is_to_many(&self, relationship: &str) -> bool {
        singularize(relationship) != relationship
    }

    /// Declared to-many relationships, in declaration order
    pub fn to_many_relationships(&self) -> Vec<&str> {
        self.relationships
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_to_many(name))
            .collect()
    }

    /// Group → fields map, as advertised in `meta.available_attributes`
    pub fn attributes_json(&self) -> Value {
        let mut map = Map::new();
        for group in &self.attributes {
            map.insert(
                group.name.clone(),
                Value::Array(group.fields.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(map)
    }
}

fn value_to_fields(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Fold declarations into disjoint groups; a field keeps its first group.
fn normalize_attributes(decls: &[AttributeDecl]) -> Vec<AttributeGroup> {
    let mut groups = vec![AttributeGroup {
        name: UNGROUPED.to_string(),
        fields: Vec::new(),
    }];
    let mut seen = HashSet::new();

    let mut place = |groups: &mut Vec<AttributeGroup>, group: &str, field: String| {
        if !seen.insert(field.clone()) {
            debug!(field = %field, group, "attribute already exposed, skipping");
            return;
        }
        match groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.fields.push(field),
            None => groups.push(AttributeGroup {
                name: group.to_string(),
                fields: vec![field],
            }),
        }
    };

    for decl in decls {
        match decl {
            AttributeDecl::Field(field) => place(&mut groups, UNGROUPED, field.clone()),
            AttributeDecl::Group(map) => {
                for (group, value) in map {
                    for field in value_to_fields(value) {
                        place(&mut groups, group, field);
                    }
                }
            }
        }
    }

    groups
}

/// `true` allows every exposed field, a field list allows only those fields
fn normalize_write(decl: Option<WriteDecl>, exposed: &[String]) -> WritePolicy {
    match decl {
        None | Some(WriteDecl::Toggle(false)) => WritePolicy::Disabled,
        Some(WriteDecl::Toggle(true)) => WritePolicy::Enabled {
            fields: exposed.to_vec(),
        },
        Some(WriteDecl::Spec { fields }) => WritePolicy::Enabled { fields },
    }
}

// ==================
// Registry
// ==================

/// A resolved model: its configuration and its backing store
#[derive(Clone)]
pub struct ModelEntry {
    pub config: Arc<ModelConfiguration>,
    pub store: Arc<dyn RecordStore>,
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Model registry shared by the dispatcher and the documentation generator.
///
/// Configurations and store bindings are kept apart so a declaration can be
/// replaced without touching its data. Writes are administrative; they are
/// not isolated from concurrent reads beyond the lock itself.
#[derive(Default)]
pub struct Registry {
    models: RwLock<HashMap<String, Arc<ModelConfiguration>>>,
    stores: RwLock<HashMap<String, Arc<dyn RecordStore>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.model_names())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a model and bind its store. Re-registering a name replaces
    /// both.
    pub fn register(
        &self,
        name: impl Into<String>,
        options: ModelOptions,
        store: Arc<dyn RecordStore>,
    ) -> Arc<ModelConfiguration> {
        let name = name.into();
        self.bind(name.clone(), store);
        self.declare(name, options)
    }

    /// Declare or re-declare a model (last write wins)
    pub fn declare(&self, name: impl Into<String>, options: ModelOptions) -> Arc<ModelConfiguration> {
        let config = ModelConfiguration::normalize(name, options);
        self.replace(config)
    }

    /// Swap in an already normalized configuration
    pub fn replace(&self, config: ModelConfiguration) -> Arc<ModelConfiguration> {
        let config = Arc::new(config);
        debug!(model = %config.name, "model declared");
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.name.clone(), Arc::clone(&config));
        config
    }

    /// Bind the store backing a model
    pub fn bind(&self, name: impl Into<String>, store: Arc<dyn RecordStore>) {
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), store);
    }

    /// Resolve a model. Declared models without a bound store resolve to
    /// nothing, like undeclared ones.
    pub fn lookup(&self, name: &str) -> Option<ModelEntry> {
        let config = self.configuration(name)?;
        let store = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        Some(ModelEntry { config, store })
    }

    pub fn configuration(&self, name: &str) -> Option<Arc<ModelConfiguration>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Declared model names, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Declared configurations, sorted by name
    pub fn configurations(&self) -> Vec<Arc<ModelConfiguration>> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        let mut configs: Vec<_> = models.values().cloned().collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }
}
