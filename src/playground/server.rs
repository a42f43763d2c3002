//! # Playground HTTP Routes
//!
//! Axum router exposing the dispatcher:
//!
//! - `GET    {base}/{model}`      list
//! - `POST   {base}/{model}`      create
//! - `GET    {base}/{model}/{id}` show
//! - `PATCH  {base}/{model}/{id}` update
//! - `DELETE {base}/{model}/{id}` delete
//! - `GET    /openapi.json`       generated API description
//!
//! The record routes sit behind the API-key middleware; the description
//! route does not.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::{error, warn};

use crate::auth::{extract_token, ApiKeyGate, AuthError};

use super::dispatcher::{Dispatcher, Operation};
use super::errors::{ErrorEnvelope, ErrorObject, PlaygroundResult};
use super::openapi;
use super::parser::ListParams;
use super::registry::Registry;
use super::response::Outcome;

/// Shared state of the playground routes
#[derive(Debug, Clone)]
pub struct PlaygroundState {
    pub dispatcher: Dispatcher,
    pub gate: ApiKeyGate,
    pub base_path: String,
}

impl PlaygroundState {
    pub fn new(registry: Arc<Registry>, gate: ApiKeyGate, base_path: &str) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
            gate,
            base_path: normalize_base_path(base_path),
        }
    }
}

/// `"playground/"` → `"/playground"`, `"/"` → `""`
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

type ServerState = Arc<PlaygroundState>;

/// Build the playground router
pub fn router(state: PlaygroundState) -> Router {
    let state = Arc::new(state);
    let collection = format!("{}/{{model}}", state.base_path);
    let member = format!("{}/{{model}}/{{id}}", state.base_path);

    let records = Router::new()
        .route(&collection, get(list_handler).post(create_handler))
        .route(
            &member,
            get(show_handler).patch(update_handler).delete(delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_api_key,
        ));

    Router::new()
        .route("/openapi.json", get(openapi_handler))
        .merge(records)
        .with_state(state)
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::List(doc) => Json(doc).into_response(),
            Outcome::Show(doc) => Json(doc).into_response(),
            Outcome::Created(doc) => (StatusCode::CREATED, Json(doc)).into_response(),
            Outcome::Updated(doc) => Json(doc).into_response(),
            Outcome::Deleted => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn respond(result: PlaygroundResult<Outcome>) -> Response {
    match result {
        Ok(outcome) => outcome.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Unparseable or empty bodies read as `null` so they surface as a missing
/// `data` member.
fn body_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

async fn require_api_key(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let decision = state.gate.authorize(extract_token(request.headers()));
    match decision {
        Ok(_) => next.run(request).await,
        Err(err) => auth_failure(err),
    }
}

fn auth_failure(err: AuthError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let object = if err.is_client_error() {
        warn!(error = %err, "request rejected by api key gate");
        ErrorObject::new(status.as_u16().to_string(), "Unauthorized", err.to_string())
    } else {
        error!(error = %err, "api key lookup failed");
        ErrorObject::new(
            status.as_u16().to_string(),
            "Internal Server Error",
            "The request could not be completed",
        )
    };

    (status, Json(ErrorEnvelope::single(object))).into_response()
}

async fn list_handler(
    State(state): State<ServerState>,
    Path(model): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let params = ListParams::parse(&query);
    respond(state.dispatcher.dispatch(&model, Operation::List(params)))
}

async fn show_handler(
    State(state): State<ServerState>,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    respond(state.dispatcher.dispatch(&model, Operation::Show { id }))
}

async fn create_handler(
    State(state): State<ServerState>,
    Path(model): Path<String>,
    body: Bytes,
) -> Response {
    let body = body_json(&body);
    respond(state.dispatcher.dispatch(&model, Operation::Create { body }))
}

async fn update_handler(
    State(state): State<ServerState>,
    Path((model, id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let body = body_json(&body);
    respond(state.dispatcher.dispatch(&model, Operation::Update { id, body }))
}

async fn delete_handler(
    State(state): State<ServerState>,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    respond(state.dispatcher.dispatch(&model, Operation::Delete { id }))
}

async fn openapi_handler(State(state): State<ServerState>) -> Json<Value> {
    Json(openapi::document(
        state.dispatcher.registry(),
        &state.base_path,
    ))
}
