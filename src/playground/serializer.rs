//! # Resource Serializer
//!
//! Shapes a [`Record`] into a JSON:API resource following the model's
//! attribute groups and relationship list.

use serde_json::{json, Map, Value};
use tracing::warn;

use super::record::{Record, Relation};
use super::registry::ModelConfiguration;
use super::response::{Linkage, Relationship, Relationships, Resource, ResourceIdentifier};

/// Key of the field-read failure list inside `attributes`
pub const ERRORS_KEY: &str = "_errors";

/// Serialize one record.
///
/// Fields the record does not expose are reported under `attributes._errors`
/// instead of failing the whole resource.
pub fn serialize(record: &Record, config: &ModelConfiguration) -> Resource {
    let mut attributes = Map::new();
    let mut failures = Vec::new();

    for group in &config.attributes {
        if group.is_ungrouped() {
            read_fields(record, &group.fields, &mut attributes, &mut failures);
            continue;
        }

        let mut nested = Map::new();
        read_fields(record, &group.fields, &mut nested, &mut failures);
        if !nested.is_empty() {
            attributes.insert(group.name.clone(), Value::Object(nested));
        }
    }

    if !failures.is_empty() {
        warn!(
            model = %config.name,
            id = record.id(),
            failed = failures.len(),
            "attributes could not be read"
        );
        attributes.insert(ERRORS_KEY.to_string(), Value::Array(failures));
    }

    let relationships = if config.relationships.is_empty() {
        None
    } else {
        Some(Relationships(
            config
                .relationships
                .iter()
                .map(|name| {
                    let to_many = config.is_to_many(name);
                    (name.clone(), relationship(record, name, to_many))
                })
                .collect(),
        ))
    };

    Resource {
        id: record.id().to_string(),
        kind: config.resource_type(),
        attributes,
        relationships,
    }
}

fn read_fields(
    record: &Record,
    fields: &[String],
    target: &mut Map<String, Value>,
    failures: &mut Vec<Value>,
) {
    for field in fields {
        match record.read(field) {
            Some(value) => {
                target.insert(field.clone(), value.to_json());
            }
            None => failures.push(json!({
                "attribute": field,
                "message": format!("attribute '{}' is not available on this record", field),
            })),
        }
    }
}

/// An association the record never linked is `[]` for collections and
/// `null` otherwise
fn relationship(record: &Record, name: &str, to_many: bool) -> Relationship {
    let identifier = |id: &String| ResourceIdentifier {
        id: id.clone(),
        kind: name.to_string(),
    };

    let data = match record.relation(name) {
        Some(Relation::Many(ids)) => Linkage::Many(ids.iter().map(identifier).collect()),
        Some(Relation::One(Some(id))) => Linkage::One(identifier(id)),
        None if to_many => Linkage::Many(Vec::new()),
        Some(Relation::One(None)) | None => Linkage::Empty,
    };

    Relationship { data }
}
