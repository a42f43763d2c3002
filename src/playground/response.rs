//! # Response Documents
//!
//! JSON:API success documents produced by the dispatcher.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::filter::FilterDef;

/// `{id, type}` pointer to a related resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Relationship linkage: an array, a single identifier, or `null`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub data: Linkage,
}

/// Named relationships, serialized as an object in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships(pub Vec<(String, Relationship)>);

impl Relationships {
    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

impl Serialize for Relationships {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, relationship) in &self.0 {
            map.serialize_entry(name, relationship)?;
        }
        map.end()
    }
}

/// One serialized record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Relationships>,
}

/// `meta.pagination` of a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub current_page: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListMeta {
    pub available_attributes: Value,
    pub available_filters: Vec<FilterDef>,
    pub available_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// List response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListDocument {
    pub data: Vec<Resource>,
    pub meta: ListMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowMeta {
    pub available_attributes: Value,
    pub available_models: Vec<String>,
}

/// Show response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowDocument {
    pub data: Resource,
    pub meta: ShowMeta,
}

/// Create/update response: bare data, no meta
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDocument {
    pub data: Resource,
}

/// HTTP-shaped result of a dispatched operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    List(ListDocument),
    Show(ShowDocument),
    Created(DataDocument),
    Updated(DataDocument),
    Deleted,
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::List(_) | Outcome::Show(_) | Outcome::Updated(_) => 200,
            Outcome::Created(_) => 201,
            Outcome::Deleted => 204,
        }
    }
}
