//! # OpenAPI Projection
//!
//! Builds an OpenAPI 3.0 JSON document from the registry. The document is a
//! pure function of the declared configurations: no store is consulted, and
//! output is deterministic because models are visited in sorted order and
//! `serde_json` keeps insertion order.

use serde_json::{json, Map, Value};

use super::filter::FilterType;
use super::pagination::MAX_PAGE_SIZE;
use super::registry::{ModelConfiguration, Registry};

const ERROR_SCHEMA: &str = "#/components/schemas/ErrorEnvelope";

/// Build the OpenAPI document for every registered model
pub fn document(registry: &Registry, base_path: &str) -> Value {
    let base = base_path.trim_end_matches('/');
    let mut paths = Map::new();
    let mut schemas = Map::new();

    for config in registry.configurations() {
        let resource = schema_name(&config.name);
        let collection_path = format!("{}/{}", base, config.resource_type());
        let member_path = format!("{}/{{id}}", collection_path);

        paths.insert(collection_path, collection_item(&config, &resource));
        paths.insert(member_path, member_item(&config, &resource));

        schemas.insert(resource.clone(), resource_schema(&config));
        if let Some(body) = request_schema(&config) {
            schemas.insert(format!("{}Input", resource), body);
        }
    }

    schemas.insert("ErrorEnvelope".to_string(), error_schema());

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Playground API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "JSON:API CRUD endpoints for the registered models."
        },
        "paths": paths,
        "components": {"schemas": schemas}
    })
}

/// `recipe_step` → `RecipeStep`
fn schema_name(model: &str) -> String {
    model
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn schema_ref(name: &str) -> Value {
    json!({"$ref": format!("#/components/schemas/{}", name)})
}

fn json_content(schema: Value) -> Value {
    json!({"application/json": {"schema": schema}})
}

fn error_response(description: &str) -> Value {
    json!({"description": description, "content": json_content(json!({"$ref": ERROR_SCHEMA}))})
}

fn tag(config: &ModelConfiguration) -> Value {
    json!([config.resource_type()])
}

fn collection_item(config: &ModelConfiguration, resource: &str) -> Value {
    let mut item = Map::new();

    let mut parameters: Vec<Value> = config
        .filters
        .iter()
        .map(|filter| {
            let description = match filter.filter_type {
                FilterType::Exact => format!("Exact match on {}", filter.field),
                FilterType::Partial => format!("Case-insensitive substring match on {}", filter.field),
            };
            json!({
                "name": format!("filters[{}]", filter.field),
                "in": "query",
                "required": false,
                "description": description,
                "schema": {"type": "string"}
            })
        })
        .collect();

    if config.pagination.enabled {
        parameters.push(json!({
            "name": "page[number]",
            "in": "query",
            "required": false,
            "schema": {"type": "integer", "minimum": 1, "default": 1}
        }));
        parameters.push(json!({
            "name": "page[size]",
            "in": "query",
            "required": false,
            "schema": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_PAGE_SIZE,
                "default": config.pagination.page_size
            }
        }));
    }

    item.insert(
        "get".to_string(),
        json!({
            "operationId": format!("list{}", resource),
            "tags": tag(config),
            "parameters": parameters,
            "responses": {
                "200": {
                    "description": "OK",
                    "content": json_content(json!({
                        "type": "object",
                        "properties": {
                            "data": {"type": "array", "items": schema_ref(resource)},
                            "meta": {"type": "object"}
                        }
                    }))
                },
                "404": error_response("Model not found")
            }
        }),
    );

    if config.requests.create.is_enabled() {
        item.insert(
            "post".to_string(),
            json!({
                "operationId": format!("create{}", resource),
                "tags": tag(config),
                "requestBody": request_body(resource),
                "responses": {
                    "201": data_response("Created", resource),
                    "400": error_response("Parameter missing"),
                    "404": error_response("Model not found"),
                    "422": error_response("Validation error")
                }
            }),
        );
    }

    Value::Object(item)
}

fn member_item(config: &ModelConfiguration, resource: &str) -> Value {
    let mut item = Map::new();
    item.insert(
        "parameters".to_string(),
        json!([{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}]),
    );

    item.insert(
        "get".to_string(),
        json!({
            "operationId": format!("show{}", resource),
            "tags": tag(config),
            "responses": {
                "200": data_response("OK", resource),
                "404": error_response("Model or record not found")
            }
        }),
    );

    if config.requests.update.is_enabled() {
        item.insert(
            "patch".to_string(),
            json!({
                "operationId": format!("update{}", resource),
                "tags": tag(config),
                "requestBody": request_body(resource),
                "responses": {
                    "200": data_response("OK", resource),
                    "400": error_response("Parameter missing"),
                    "404": error_response("Model or record not found"),
                    "422": error_response("Validation error")
                }
            }),
        );
    }

    if config.requests.delete {
        item.insert(
            "delete".to_string(),
            json!({
                "operationId": format!("delete{}", resource),
                "tags": tag(config),
                "responses": {
                    "204": {"description": "Deleted"},
                    "404": error_response("Model or record not found"),
                    "422": error_response("Deletion refused")
                }
            }),
        );
    }

    Value::Object(item)
}

fn data_response(description: &str, resource: &str) -> Value {
    json!({
        "description": description,
        "content": json_content(json!({
            "type": "object",
            "properties": {"data": schema_ref(resource)}
        }))
    })
}

fn request_body(resource: &str) -> Value {
    json!({
        "required": true,
        "content": json_content(schema_ref(&format!("{}Input", resource)))
    })
}

fn field_map<'a>(fields: impl Iterator<Item = &'a String>) -> Map<String, Value> {
    fields
        .map(|field| (field.clone(), json!({"nullable": true})))
        .collect()
}

fn resource_schema(config: &ModelConfiguration) -> Value {
    let mut attributes = Map::new();
    for group in &config.attributes {
        if group.is_ungrouped() {
            attributes.extend(field_map(group.fields.iter()));
        } else {
            attributes.insert(
                group.name.clone(),
                json!({"type": "object", "properties": field_map(group.fields.iter())}),
            );
        }
    }

    let mut properties = Map::new();
    properties.insert("id".to_string(), json!({"type": "string"}));
    properties.insert(
        "type".to_string(),
        json!({"type": "string", "enum": [config.resource_type()]}),
    );
    properties.insert(
        "attributes".to_string(),
        json!({"type": "object", "properties": attributes}),
    );

    if !config.relationships.is_empty() {
        let relationships: Map<String, Value> = config
            .relationships
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    json!({"type": "object", "properties": {"data": {"nullable": true}}}),
                )
            })
            .collect();
        properties.insert(
            "relationships".to_string(),
            json!({"type": "object", "properties": relationships}),
        );
    }

    json!({"type": "object", "required": ["id", "type", "attributes"], "properties": properties})
}

/// Union of the create and update whitelists, `None` for read-only models
fn request_schema(config: &ModelConfiguration) -> Option<Value> {
    if !config.requests.create.is_enabled() && !config.requests.update.is_enabled() {
        return None;
    }

    let mut fields: Vec<&String> = Vec::new();
    for allowed in [config.requests.create.fields(), config.requests.update.fields()]
        .into_iter()
        .flatten()
    {
        for field in allowed {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }

    Some(json!({
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": {
                "type": "object",
                "required": ["attributes"],
                "properties": {
                    "type": {"type": "string"},
                    "attributes": {"type": "object", "properties": field_map(fields.into_iter())}
                }
            }
        }
    }))
}

fn error_schema() -> Value {
    json!({
        "type": "object",
        "required": ["errors"],
        "properties": {
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["status", "title", "detail"],
                    "properties": {
                        "status": {"type": "string"},
                        "title": {"type": "string"},
                        "detail": {"type": "string"},
                        "source": {
                            "type": "object",
                            "properties": {"pointer": {"type": "string"}}
                        },
                        "available_models": {"type": "array", "items": {"type": "string"}}
                    }
                }
            }
        }
    })
}
