//! # Playground Errors
//!
//! Error taxonomy of the dispatcher and the JSON:API error envelope each
//! domain error renders to. Storage faults are carried through untouched so
//! the HTTP boundary can tell "bad request" from "broken system".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::inflection::{humanize, pluralize};
use super::store::{StoreError, ValidationErrors};

/// Result type for playground operations
pub type PlaygroundResult<T> = Result<T, PlaygroundError>;

/// JSON pointer cited by missing-parameter errors
pub const ATTRIBUTES_POINTER: &str = "/data/attributes";

/// Operations that can be switched off per model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    Update,
    Delete,
}

impl WriteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOperation::Create => "create",
            WriteOperation::Update => "update",
            WriteOperation::Delete => "delete",
        }
    }
}

/// Playground errors
#[derive(Debug, Clone, Error)]
pub enum PlaygroundError {
    // ==================
    // Domain errors (4xx)
    // ==================
    /// Model name is not registered
    #[error("The requested model '{name}' is not available in the playground")]
    ModelNotFound {
        name: String,
        available_models: Vec<String>,
    },

    /// No record with the requested id
    #[error("Could not find {model} with id '{id}'")]
    RecordNotFound { model: String, id: String },

    /// Operation disabled for the model
    #[error("The model '{}' does not support {} operations", pluralize(.model), .operation.as_str())]
    RequestNotSupported {
        model: String,
        operation: WriteOperation,
    },

    /// Request body lacks a required member
    #[error("Required parameter missing: {0}")]
    ParameterMissing(String),

    /// The store rejected the attributes
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The store refused to remove the record
    #[error("The resource could not be deleted")]
    Deletion { model: String, id: String },

    // ==================
    // Infrastructure (5xx)
    // ==================
    /// Storage fault, never converted to a domain error
    #[error("{0}")]
    Storage(StoreError),
}

impl PlaygroundError {
    pub fn model_not_found(name: impl Into<String>, available_models: Vec<String>) -> Self {
        PlaygroundError::ModelNotFound {
            name: name.into(),
            available_models,
        }
    }

    pub fn record_not_found(model: impl Into<String>, id: impl Into<String>) -> Self {
        PlaygroundError::RecordNotFound {
            model: model.into(),
            id: id.into(),
        }
    }

    pub fn not_supported(model: impl Into<String>, operation: WriteOperation) -> Self {
        PlaygroundError::RequestNotSupported {
            model: model.into(),
            operation,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlaygroundError::ParameterMissing(_) => StatusCode::BAD_REQUEST,
            PlaygroundError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            PlaygroundError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            PlaygroundError::RequestNotSupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
            PlaygroundError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlaygroundError::Deletion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PlaygroundError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error describes the request rather than the system
    pub fn is_domain(&self) -> bool {
        !matches!(self, PlaygroundError::Storage(_))
    }

    /// Render as a JSON:API error envelope
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let status = self.status_code().as_u16().to_string();
        let object = |title: &str| ErrorObject::new(status.clone(), title, self.to_string());

        let errors = match self {
            PlaygroundError::ModelNotFound {
                available_models, ..
            } => {
                let mut error = object("Model not found");
                error.available_models = Some(available_models.clone());
                vec![error]
            }
            PlaygroundError::RecordNotFound { .. } => vec![object("Record not found")],
            PlaygroundError::RequestNotSupported { .. } => vec![object("Request not supported")],
            PlaygroundError::ParameterMissing(_) => {
                vec![object("Parameter missing").with_pointer(ATTRIBUTES_POINTER)]
            }
            PlaygroundError::Validation(errors) => errors
                .iter()
                .map(|e| {
                    ErrorObject::new(
                        status.clone(),
                        "Validation Error",
                        format!("{} {}", humanize(&e.field), e.message),
                    )
                    .with_pointer(format!("{}/{}", ATTRIBUTES_POINTER, e.field))
                })
                .collect(),
            PlaygroundError::Deletion { model, id } => {
                vec![object("Deletion Error").with_pointer(format!("/data/{}/{}", model, id))]
            }
            PlaygroundError::Storage(_) => vec![ErrorObject::new(
                status.clone(),
                "Internal Server Error",
                "The request could not be completed",
            )],
        };

        ErrorEnvelope { errors }
    }
}

impl From<StoreError> for PlaygroundError {
    fn from(err: StoreError) -> Self {
        PlaygroundError::Storage(err)
    }
}

/// `{pointer}` naming the offending part of the request document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    pub pointer: String,
}

/// One JSON:API error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// HTTP status as a string
    pub status: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
}

impl ErrorObject {
    pub fn new(status: impl Into<String>, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            title: title.into(),
            detail: detail.into(),
            source: None,
            available_models: None,
        }
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: pointer.into(),
        });
        self
    }
}

/// `{"errors": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorObject>,
}

impl ErrorEnvelope {
    pub fn single(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoResponse for PlaygroundError {
    fn into_response(self) -> Response {
        if let PlaygroundError::Storage(ref cause) = self {
            error!(error = %cause, "storage failure");
        }
        let status = self.status_code();
        (status, Json(self.to_envelope())).into_response()
    }
}
